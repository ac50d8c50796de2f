// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use audit_cell::models::{actions, AuditEvent};
use audit_cell::services::AuditSink;
use shared_database::{AppointmentRepository, Repositories, SlotRepository, UserDirectory};
use shared_models::auth::UserRole;
use shared_models::error::ServiceError;
use shared_models::scheduling::{Appointment, AppointmentStatus, TimeRange};
use shared_utils::clock::Clock;

use crate::models::CreateAppointmentRequest;
use crate::services::access::AccessGuard;
use crate::services::conflict::ConflictDetectionService;
use crate::services::consistency::SchedulingLocks;

/// Turns booking requests into pending appointments.
///
/// The doctor's scheduling lock is held from the conflict check through the
/// insert, so of several concurrent overlapping requests exactly one wins.
pub struct AppointmentBookingService {
    appointments: Arc<dyn AppointmentRepository>,
    slots: Arc<dyn SlotRepository>,
    users: Arc<dyn UserDirectory>,
    conflicts: ConflictDetectionService,
    guard: AccessGuard,
    locks: Arc<SchedulingLocks>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl AppointmentBookingService {
    pub fn new(
        repos: &Repositories,
        locks: Arc<SchedulingLocks>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            appointments: repos.appointments.clone(),
            slots: repos.slots.clone(),
            users: repos.users.clone(),
            conflicts: ConflictDetectionService::new(repos.appointments.clone()),
            guard: AccessGuard::new(repos.appointments.clone()),
            locks,
            audit,
            clock,
        }
    }

    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id, patient_id = %request.patient_id))]
    pub async fn create_appointment(&self, request: CreateAppointmentRequest) -> Result<Appointment, ServiceError> {
        self.require_role(request.doctor_id, UserRole::Doctor, "doctor").await?;
        self.require_role(request.patient_id, UserRole::Patient, "patient").await?;

        let range = TimeRange::new(request.start_time, request.end_time)?;
        if range.start < self.clock.now() {
            return Err(ServiceError::validation("start time cannot be in the past"));
        }

        let _guard = self.locks.doctor(request.doctor_id).await;
        debug!("Scheduling lock acquired for doctor {}", request.doctor_id);

        if let Some(slot_id) = request.slot_id {
            self.check_slot(slot_id, request.doctor_id, &range).await?;
        }

        let conflicts = self
            .conflicts
            .check_conflicts(request.doctor_id, range, None)
            .await?;
        if conflicts.has_conflict {
            return Err(ServiceError::conflict("slot already booked"));
        }

        let now = self.clock.now();
        let appointment = self
            .appointments
            .insert(Appointment {
                id: Uuid::new_v4(),
                patient_id: request.patient_id,
                doctor_id: request.doctor_id,
                slot_id: request.slot_id,
                status: AppointmentStatus::Pending,
                notes: request.notes,
                start_time: range.start,
                end_time: range.end,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(
            "Appointment {} booked for patient {} with doctor {}",
            appointment.id, appointment.patient_id, appointment.doctor_id
        );
        self.audit.record(
            AuditEvent::new(actions::APPOINTMENT_CREATE, "appointment", appointment.id)
                .by(appointment.patient_id)
                .with("doctor_id", appointment.doctor_id.to_string())
                .with("start_time", appointment.start_time.to_rfc3339())
                .with("end_time", appointment.end_time.to_rfc3339()),
        );

        Ok(appointment)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid, actor_id: Uuid) -> Result<Appointment, ServiceError> {
        self.guard.authorize(appointment_id, actor_id).await
    }

    pub async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, ServiceError> {
        Ok(self.appointments.list_by_patient(patient_id).await?)
    }

    pub async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, ServiceError> {
        Ok(self.appointments.list_by_doctor(doctor_id).await?)
    }

    /// Active appointments that have not started yet, soonest first.
    pub async fn upcoming_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, ServiceError> {
        let now = self.clock.now();
        let mut upcoming: Vec<Appointment> = self
            .appointments
            .list_by_patient(patient_id)
            .await?
            .into_iter()
            .filter(|a| a.status.is_active() && a.start_time > now)
            .collect();
        upcoming.sort_by_key(|a| a.start_time);
        Ok(upcoming)
    }

    async fn require_role(&self, user_id: Uuid, role: UserRole, what: &str) -> Result<(), ServiceError> {
        match self.users.find_by_id(user_id).await? {
            Some(account) if account.has_role(role) => Ok(()),
            _ => Err(ServiceError::not_found(what)),
        }
    }

    async fn check_slot(&self, slot_id: Uuid, doctor_id: Uuid, range: &TimeRange) -> Result<(), ServiceError> {
        let slot = self
            .slots
            .find_by_id(slot_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("slot"))?;

        if slot.doctor_id != doctor_id {
            return Err(ServiceError::validation("slot belongs to another doctor"));
        }
        if !slot.is_open() {
            warn!("Booking attempted on blocked slot {}", slot_id);
            return Err(ServiceError::conflict("slot is not open for booking"));
        }
        if !slot.range().contains(range) {
            return Err(ServiceError::validation("requested time is outside the slot"));
        }

        let attached = self.appointments.list_by_slot(slot_id).await?;
        if attached.iter().any(|a| a.status.is_active()) {
            return Err(ServiceError::conflict("slot already booked"));
        }

        Ok(())
    }
}
