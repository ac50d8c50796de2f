use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// CHAT
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub sender_user_id: Uuid,
    pub body: String,
    pub attachment_url: Option<String>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }
}

// ==============================================================================
// PRESCRIPTIONS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrescriptionItem {
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    #[serde(default)]
    pub instructions: String,
}

impl PrescriptionItem {
    pub fn new(
        medication_name: &str,
        dosage: &str,
        frequency: &str,
        duration: &str,
        instructions: &str,
    ) -> Self {
        Self {
            medication_name: medication_name.to_string(),
            dosage: dosage.to_string(),
            frequency: frequency.to_string(),
            duration: duration.to_string(),
            instructions: instructions.to_string(),
        }
    }
}

/// Prescription as the services hand it out, with the item list decoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prescription {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub items: Vec<PrescriptionItem>,
    pub notes: String,
    pub created_by_doctor_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Prescription row as persisted: the item list is an encoded, versioned document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionRecord {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub items_document: String,
    pub notes: String,
    pub created_by_doctor_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==============================================================================
// VIDEO SESSIONS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoSession {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub room_id: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoSession {
    /// Started and not yet ended.
    pub fn is_live(&self) -> bool {
        self.started_at.is_some() && self.ended_at.is_none()
    }

    pub fn has_ended(&self) -> bool {
        self.ended_at.is_some()
    }
}
