use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use shared_database::AppointmentRepository;
use shared_models::error::ServiceError;
use shared_models::scheduling::Appointment;

/// Gatekeeper for everything hanging off an appointment.
pub struct AccessGuard {
    appointments: Arc<dyn AppointmentRepository>,
}

impl AccessGuard {
    pub fn new(appointments: Arc<dyn AppointmentRepository>) -> Self {
        Self { appointments }
    }

    /// Returns the appointment when `actor_id` is its patient or its doctor.
    pub async fn authorize(&self, appointment_id: Uuid, actor_id: Uuid) -> Result<Appointment, ServiceError> {
        let appointment = self
            .appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("appointment"))?;

        if !appointment.is_participant(actor_id) {
            debug!("User {} is not a participant of appointment {}", actor_id, appointment_id);
            return Err(ServiceError::forbidden("not a participant of this appointment"));
        }

        Ok(appointment)
    }

    /// Same check, restricted to the appointment's doctor.
    pub async fn authorize_doctor(&self, appointment_id: Uuid, actor_id: Uuid) -> Result<Appointment, ServiceError> {
        let appointment = self.authorize(appointment_id, actor_id).await?;
        if appointment.doctor_id != actor_id {
            return Err(ServiceError::forbidden("only the appointment's doctor may do this"));
        }
        Ok(appointment)
    }
}
