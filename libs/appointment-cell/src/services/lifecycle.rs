// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use audit_cell::models::{actions, AuditEvent};
use audit_cell::services::AuditSink;
use shared_database::{AppointmentRepository, Repositories};
use shared_models::auth::UserRole;
use shared_models::error::ServiceError;
use shared_models::scheduling::{Appointment, AppointmentStatus};
use shared_utils::clock::Clock;

use crate::models::TransitionRequest;
use crate::services::consistency::SchedulingLocks;

/// Roles allowed to move an appointment from `from` to `to`, or `None` when
/// the pair is not a legal transition at all.
pub fn allowed_roles(from: AppointmentStatus, to: AppointmentStatus) -> Option<&'static [UserRole]> {
    use AppointmentStatus::*;

    match (from, to) {
        (Pending, Confirmed) => Some(&[UserRole::Doctor]),
        (Pending, Cancelled) => Some(&[UserRole::Patient, UserRole::Doctor]),
        (Confirmed, Cancelled) => Some(&[UserRole::Patient, UserRole::Doctor]),
        (Confirmed, Completed) => Some(&[UserRole::Doctor]),
        _ => None,
    }
}

pub fn get_valid_transitions(current: AppointmentStatus) -> Vec<AppointmentStatus> {
    AppointmentStatus::ALL
        .into_iter()
        .filter(|to| allowed_roles(current, *to).is_some())
        .collect()
}

pub struct AppointmentLifecycleService {
    appointments: Arc<dyn AppointmentRepository>,
    locks: Arc<SchedulingLocks>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl AppointmentLifecycleService {
    pub fn new(
        repos: &Repositories,
        locks: Arc<SchedulingLocks>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            appointments: repos.appointments.clone(),
            locks,
            audit,
            clock,
        }
    }

    /// Applies a status change for a participant.
    ///
    /// Checks run in order: existence, participation, terminal source,
    /// legality of the pair, then the participant's role.
    #[instrument(skip(self, request), fields(target = %request.status))]
    pub async fn transition(
        &self,
        appointment_id: Uuid,
        actor_id: Uuid,
        request: TransitionRequest,
    ) -> Result<Appointment, ServiceError> {
        let _guard = self.locks.appointment(appointment_id).await;

        let mut appointment = self
            .appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("appointment"))?;

        let role = participant_role(&appointment, actor_id)
            .ok_or_else(|| ServiceError::forbidden("not a participant of this appointment"))?;

        let target: AppointmentStatus = request.status.parse()?;
        let from = appointment.status;

        let invalid = || ServiceError::InvalidTransition {
            from: from.to_string(),
            to: target.to_string(),
        };

        if from.is_terminal() {
            warn!("Transition attempted on terminal appointment {}: {} -> {}", appointment_id, from, target);
            return Err(invalid());
        }

        let roles = allowed_roles(from, target).ok_or_else(invalid)?;
        if !roles.contains(&role) {
            return Err(ServiceError::forbidden(format!(
                "a {} may not move an appointment from {} to {}",
                role, from, target
            )));
        }

        appointment.status = target;
        if let Some(notes) = request.notes {
            appointment.notes = notes;
        }
        appointment.updated_at = self.clock.now();

        let appointment = self.appointments.update(appointment).await?;

        info!("Appointment {} moved from {} to {} by {}", appointment_id, from, target, role);
        self.audit.record(
            AuditEvent::new(actions::APPOINTMENT_STATUS_CHANGE, "appointment", appointment_id)
                .by(actor_id)
                .with("from", from.to_string())
                .with("to", target.to_string()),
        );

        Ok(appointment)
    }

    pub async fn cancel(&self, appointment_id: Uuid, actor_id: Uuid) -> Result<Appointment, ServiceError> {
        debug!("Cancelling appointment {}", appointment_id);
        self.transition(
            appointment_id,
            actor_id,
            TransitionRequest::to(&AppointmentStatus::Cancelled.to_string()),
        )
        .await
    }
}

/// The participant's role is positional: the stored doctor acts as doctor
/// and the stored patient as patient.
fn participant_role(appointment: &Appointment, actor_id: Uuid) -> Option<UserRole> {
    if actor_id == appointment.doctor_id {
        Some(UserRole::Doctor)
    } else if actor_id == appointment.patient_id {
        Some(UserRole::Patient)
    } else {
        None
    }
}
