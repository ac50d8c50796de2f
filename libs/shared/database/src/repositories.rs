// libs/shared/database/src/repositories.rs
//
// One repository interface per entity. Implementations are constructed once
// at process start and handed to each service explicitly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared_models::audit::{AuditFilter, AuditRecord};
use shared_models::auth::UserAccount;
use shared_models::consultation::{Message, PrescriptionRecord, VideoSession};
use shared_models::scheduling::{Appointment, Slot};

use crate::error::StorageResult;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<UserAccount>>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<UserAccount>>;
}

#[async_trait]
pub trait SlotRepository: Send + Sync {
    async fn insert(&self, slot: Slot) -> StorageResult<Slot>;

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<Slot>>;

    /// Ordered by start time.
    async fn list_by_doctor(&self, doctor_id: Uuid) -> StorageResult<Vec<Slot>>;

    async fn update(&self, slot: Slot) -> StorageResult<Slot>;

    /// Returns `false` when no row was removed.
    async fn delete(&self, id: Uuid) -> StorageResult<bool>;
}

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn insert(&self, appointment: Appointment) -> StorageResult<Appointment>;

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<Appointment>>;

    /// Newest first.
    async fn list_by_doctor(&self, doctor_id: Uuid) -> StorageResult<Vec<Appointment>>;

    /// Newest first.
    async fn list_by_patient(&self, patient_id: Uuid) -> StorageResult<Vec<Appointment>>;

    /// Every appointment that references the slot, whatever its status.
    async fn list_by_slot(&self, slot_id: Uuid) -> StorageResult<Vec<Appointment>>;

    async fn update(&self, appointment: Appointment) -> StorageResult<Appointment>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert(&self, message: Message) -> StorageResult<Message>;

    /// Newest first.
    async fn list_by_appointment(
        &self,
        appointment_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> StorageResult<Vec<Message>>;

    /// Sets `read_at` on every unread message of the appointment sent by
    /// `sender_id`. Returns the number of messages flipped.
    async fn mark_read_from_sender(
        &self,
        appointment_id: Uuid,
        sender_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> StorageResult<usize>;

    async fn count_unread_from_sender(
        &self,
        appointment_id: Uuid,
        sender_id: Uuid,
    ) -> StorageResult<usize>;
}

#[async_trait]
pub trait PrescriptionRepository: Send + Sync {
    async fn insert(&self, record: PrescriptionRecord) -> StorageResult<PrescriptionRecord>;

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<PrescriptionRecord>>;

    /// Oldest first.
    async fn list_by_appointment(&self, appointment_id: Uuid) -> StorageResult<Vec<PrescriptionRecord>>;

    async fn update(&self, record: PrescriptionRecord) -> StorageResult<PrescriptionRecord>;

    async fn delete(&self, id: Uuid) -> StorageResult<bool>;
}

#[async_trait]
pub trait VideoSessionRepository: Send + Sync {
    async fn insert(&self, session: VideoSession) -> StorageResult<VideoSession>;

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<VideoSession>>;

    /// Oldest first.
    async fn list_by_appointment(&self, appointment_id: Uuid) -> StorageResult<Vec<VideoSession>>;

    async fn update(&self, session: VideoSession) -> StorageResult<VideoSession>;
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, record: AuditRecord) -> StorageResult<()>;

    /// Newest first, with the filter's limit/offset applied.
    async fn query(&self, filter: &AuditFilter) -> StorageResult<Vec<AuditRecord>>;
}
