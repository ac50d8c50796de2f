// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::scheduling::Appointment;

// ==============================================================================
// BOOKING
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub slot_id: Option<Uuid>,
    #[serde(default)]
    pub notes: String,
}

/// Body of a booking call. The patient is always the authenticated caller.
#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub slot_id: Option<Uuid>,
    pub notes: Option<String>,
}

impl BookAppointmentRequest {
    pub fn for_patient(self, patient_id: Uuid) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            patient_id,
            doctor_id: self.doctor_id,
            start_time: self.start_time,
            end_time: self.end_time,
            slot_id: self.slot_id,
            notes: self.notes.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub conflicting_appointments: Vec<Appointment>,
}

// ==============================================================================
// LIFECYCLE
// ==============================================================================

/// Requested status change. `notes: None` keeps the stored notes and
/// `Some("")` clears them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub status: String,
    pub notes: Option<String>,
}

impl TransitionRequest {
    pub fn to(status: &str) -> Self {
        Self {
            status: status.to_string(),
            notes: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AppointmentListResponse {
    pub appointments: Vec<Appointment>,
    pub count: usize,
}

impl From<Vec<Appointment>> for AppointmentListResponse {
    fn from(appointments: Vec<Appointment>) -> Self {
        Self {
            count: appointments.len(),
            appointments,
        }
    }
}
