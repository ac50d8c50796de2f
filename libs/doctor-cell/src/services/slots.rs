use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use audit_cell::models::{actions, AuditEvent};
use audit_cell::services::AuditSink;
use shared_database::{AppointmentRepository, Repositories, SlotRepository, UserDirectory};
use shared_models::auth::UserRole;
use shared_models::error::ServiceError;
use shared_models::scheduling::{Slot, SlotStatus, TimeRange};
use shared_utils::clock::Clock;
use shared_utils::locks::KeyedLocks;

use crate::models::{CreateSlotRequest, UpdateSlotRequest};

/// Doctor-owned availability slots.
///
/// Mutations of an existing slot run under the owning doctor's scheduling
/// lock, the same lock the booking engine holds while attaching an
/// appointment to a slot.
pub struct SlotService {
    slots: Arc<dyn SlotRepository>,
    appointments: Arc<dyn AppointmentRepository>,
    users: Arc<dyn UserDirectory>,
    doctor_locks: Arc<KeyedLocks>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl SlotService {
    pub fn new(
        repos: &Repositories,
        doctor_locks: Arc<KeyedLocks>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            slots: repos.slots.clone(),
            appointments: repos.appointments.clone(),
            users: repos.users.clone(),
            doctor_locks,
            audit,
            clock,
        }
    }

    #[instrument(skip(self, request))]
    pub async fn create(&self, doctor_id: Uuid, request: CreateSlotRequest) -> Result<Slot, ServiceError> {
        let range = TimeRange::new(request.start_time, request.end_time)?;
        let now = self.clock.now();
        if range.start < now {
            return Err(ServiceError::validation("start time cannot be in the past"));
        }

        let is_doctor = self
            .users
            .find_by_id(doctor_id)
            .await?
            .map(|account| account.has_role(UserRole::Doctor))
            .unwrap_or(false);
        if !is_doctor {
            return Err(ServiceError::not_found("doctor"));
        }

        let slot = self
            .slots
            .insert(Slot {
                id: Uuid::new_v4(),
                doctor_id,
                start_time: range.start,
                end_time: range.end,
                status: SlotStatus::Open,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!("Slot {} created for doctor {}", slot.id, doctor_id);
        self.audit.record(
            AuditEvent::new(actions::SLOT_CREATE, "slot", slot.id)
                .by(doctor_id)
                .with("start_time", slot.start_time.to_rfc3339())
                .with("end_time", slot.end_time.to_rfc3339()),
        );

        Ok(slot)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        slot_id: Uuid,
        actor_id: Uuid,
        request: UpdateSlotRequest,
    ) -> Result<Slot, ServiceError> {
        let owner = self.owned_slot(slot_id, actor_id).await?;
        let _guard = self.doctor_locks.lock(owner.doctor_id).await;
        let mut slot = self.owned_slot(slot_id, actor_id).await?;

        let Some(status) = request.status else {
            debug!("Empty update for slot {}", slot_id);
            return Ok(slot);
        };

        slot.status = status;
        slot.updated_at = self.clock.now();
        let slot = self.slots.update(slot).await?;

        self.audit.record(
            AuditEvent::new(actions::SLOT_UPDATE, "slot", slot.id)
                .by(actor_id)
                .with("status", slot.status.to_string()),
        );

        Ok(slot)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, slot_id: Uuid, actor_id: Uuid) -> Result<(), ServiceError> {
        let owner = self.owned_slot(slot_id, actor_id).await?;
        let _guard = self.doctor_locks.lock(owner.doctor_id).await;
        let slot = self.owned_slot(slot_id, actor_id).await?;

        if !self.appointments.list_by_slot(slot.id).await?.is_empty() {
            return Err(ServiceError::conflict("cannot delete slot with existing appointment"));
        }

        if !self.slots.delete(slot.id).await? {
            return Err(ServiceError::not_found("slot"));
        }

        info!("Slot {} deleted by doctor {}", slot.id, actor_id);
        self.audit
            .record(AuditEvent::new(actions::SLOT_DELETE, "slot", slot.id).by(actor_id));

        Ok(())
    }

    pub async fn get(&self, slot_id: Uuid) -> Result<Slot, ServiceError> {
        self.slots
            .find_by_id(slot_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("slot"))
    }

    pub async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Slot>, ServiceError> {
        Ok(self.slots.list_by_doctor(doctor_id).await?)
    }

    /// Open slots on the given UTC date that start in the future and have no
    /// active appointment attached.
    #[instrument(skip(self))]
    pub async fn available_slots(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<Slot>, ServiceError> {
        let now = self.clock.now();

        let taken: HashSet<Uuid> = self
            .appointments
            .list_by_doctor(doctor_id)
            .await?
            .into_iter()
            .filter(|a| a.status.is_active())
            .filter_map(|a| a.slot_id)
            .collect();

        let slots: Vec<Slot> = self
            .slots
            .list_by_doctor(doctor_id)
            .await?
            .into_iter()
            .filter(|s| s.start_time.date_naive() == date)
            .filter(|s| s.is_open() && s.start_time > now)
            .filter(|s| !taken.contains(&s.id))
            .collect();

        debug!("{} available slots for doctor {} on {}", slots.len(), doctor_id, date);
        Ok(slots)
    }

    async fn owned_slot(&self, slot_id: Uuid, actor_id: Uuid) -> Result<Slot, ServiceError> {
        let slot = self.get(slot_id).await?;
        if slot.doctor_id != actor_id {
            return Err(ServiceError::forbidden("only the owning doctor may modify this slot"));
        }
        Ok(slot)
    }
}
