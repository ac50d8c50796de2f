use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::AppointmentRepository;
use shared_models::error::ServiceError;
use shared_models::scheduling::{Appointment, AppointmentStatus, TimeRange};

use crate::models::ConflictCheckResponse;

pub struct ConflictDetectionService {
    appointments: Arc<dyn AppointmentRepository>,
}

impl ConflictDetectionService {
    pub fn new(appointments: Arc<dyn AppointmentRepository>) -> Self {
        Self { appointments }
    }

    /// Appointments of the doctor that the requested range would collide with.
    pub async fn check_conflicts(
        &self,
        doctor_id: Uuid,
        requested: TimeRange,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<ConflictCheckResponse, ServiceError> {
        debug!(
            "Checking conflicts for doctor {} from {} to {}",
            doctor_id, requested.start, requested.end
        );

        let conflicting_appointments: Vec<Appointment> = self
            .appointments
            .list_by_doctor(doctor_id)
            .await?
            .into_iter()
            .filter(|a| Some(a.id) != exclude_appointment_id)
            .filter(|a| blocks_timeline(a.status))
            .filter(|a| a.range().overlaps(&requested))
            .collect();

        let has_conflict = !conflicting_appointments.is_empty();
        if has_conflict {
            warn!(
                "Conflict detected for doctor {} - {} conflicting appointments",
                doctor_id,
                conflicting_appointments.len()
            );
        }

        Ok(ConflictCheckResponse {
            has_conflict,
            conflicting_appointments,
        })
    }
}

/// Everything except cancelled keeps its range reserved, completed included.
pub fn blocks_timeline(status: AppointmentStatus) -> bool {
    status != AppointmentStatus::Cancelled
}
