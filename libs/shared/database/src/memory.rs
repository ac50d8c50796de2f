// libs/shared/database/src/memory.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::audit::{AuditFilter, AuditRecord};
use shared_models::auth::UserAccount;
use shared_models::consultation::{Message, PrescriptionRecord, VideoSession};
use shared_models::scheduling::{Appointment, Slot};

use crate::error::{StorageError, StorageResult};
use crate::repositories::{
    AppointmentRepository, AuditRepository, MessageRepository, PrescriptionRepository,
    SlotRepository, UserDirectory, VideoSessionRepository,
};

/// Process-local storage backing every repository interface.
///
/// Each table sits behind its own lock, so operations on different entities
/// never contend. `set_unavailable` makes every call fail, which lets tests
/// exercise the storage-failure paths of the services.
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<Uuid, UserAccount>>,
    slots: RwLock<HashMap<Uuid, Slot>>,
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    messages: RwLock<Vec<Message>>,
    prescriptions: RwLock<HashMap<Uuid, PrescriptionRecord>>,
    video_sessions: RwLock<HashMap<Uuid, VideoSession>>,
    audit_log: RwLock<Vec<AuditRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: UserAccount) -> StorageResult<UserAccount> {
        self.check_available()?;
        let mut users = self.users.write().await;
        let email = user.email.to_lowercase();
        if users.values().any(|u| u.email.to_lowercase() == email) {
            return Err(StorageError::Duplicate(format!("user email {}", user.email)));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("in-memory store switched off".to_string()));
        }
        Ok(())
    }
}

fn newest_first<T, F>(mut rows: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    rows
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<UserAccount>> {
        self.check_available()?;
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StorageResult<Option<UserAccount>> {
        self.check_available()?;
        let email = email.trim().to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }
}

#[async_trait]
impl SlotRepository for InMemoryStore {
    async fn insert(&self, slot: Slot) -> StorageResult<Slot> {
        self.check_available()?;
        let mut slots = self.slots.write().await;
        if slots.contains_key(&slot.id) {
            return Err(StorageError::Duplicate(format!("slot {}", slot.id)));
        }
        slots.insert(slot.id, slot.clone());
        Ok(slot)
    }

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<Slot>> {
        self.check_available()?;
        Ok(self.slots.read().await.get(&id).cloned())
    }

    async fn list_by_doctor(&self, doctor_id: Uuid) -> StorageResult<Vec<Slot>> {
        self.check_available()?;
        let mut slots: Vec<Slot> = self
            .slots
            .read()
            .await
            .values()
            .filter(|s| s.doctor_id == doctor_id)
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.start_time);
        Ok(slots)
    }

    async fn update(&self, slot: Slot) -> StorageResult<Slot> {
        self.check_available()?;
        let mut slots = self.slots.write().await;
        match slots.get_mut(&slot.id) {
            Some(existing) => {
                *existing = slot.clone();
                Ok(slot)
            }
            None => Err(StorageError::Missing(format!("slot {}", slot.id))),
        }
    }

    async fn delete(&self, id: Uuid) -> StorageResult<bool> {
        self.check_available()?;
        Ok(self.slots.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryStore {
    async fn insert(&self, appointment: Appointment) -> StorageResult<Appointment> {
        self.check_available()?;
        let mut appointments = self.appointments.write().await;
        if appointments.contains_key(&appointment.id) {
            return Err(StorageError::Duplicate(format!("appointment {}", appointment.id)));
        }
        debug!("Storing appointment {}", appointment.id);
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<Appointment>> {
        self.check_available()?;
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn list_by_doctor(&self, doctor_id: Uuid) -> StorageResult<Vec<Appointment>> {
        self.check_available()?;
        let rows = self
            .appointments
            .read()
            .await
            .values()
            .filter(|a| a.doctor_id == doctor_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |a: &Appointment| a.created_at))
    }

    async fn list_by_patient(&self, patient_id: Uuid) -> StorageResult<Vec<Appointment>> {
        self.check_available()?;
        let rows = self
            .appointments
            .read()
            .await
            .values()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |a: &Appointment| a.created_at))
    }

    async fn list_by_slot(&self, slot_id: Uuid) -> StorageResult<Vec<Appointment>> {
        self.check_available()?;
        Ok(self
            .appointments
            .read()
            .await
            .values()
            .filter(|a| a.slot_id == Some(slot_id))
            .cloned()
            .collect())
    }

    async fn update(&self, appointment: Appointment) -> StorageResult<Appointment> {
        self.check_available()?;
        let mut appointments = self.appointments.write().await;
        match appointments.get_mut(&appointment.id) {
            Some(existing) => {
                *existing = appointment.clone();
                Ok(appointment)
            }
            None => Err(StorageError::Missing(format!("appointment {}", appointment.id))),
        }
    }
}

#[async_trait]
impl MessageRepository for InMemoryStore {
    async fn insert(&self, message: Message) -> StorageResult<Message> {
        self.check_available()?;
        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    async fn list_by_appointment(
        &self,
        appointment_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> StorageResult<Vec<Message>> {
        self.check_available()?;
        let messages = self.messages.read().await;
        // Insertion order is chronological; walk it backwards for newest first.
        Ok(messages
            .iter()
            .rev()
            .filter(|m| m.appointment_id == appointment_id)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_read_from_sender(
        &self,
        appointment_id: Uuid,
        sender_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> StorageResult<usize> {
        self.check_available()?;
        let mut messages = self.messages.write().await;
        let mut flipped = 0;
        for message in messages.iter_mut().filter(|m| {
            m.appointment_id == appointment_id && m.sender_user_id == sender_id && m.is_unread()
        }) {
            message.read_at = Some(read_at);
            flipped += 1;
        }
        Ok(flipped)
    }

    async fn count_unread_from_sender(
        &self,
        appointment_id: Uuid,
        sender_id: Uuid,
    ) -> StorageResult<usize> {
        self.check_available()?;
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| {
                m.appointment_id == appointment_id && m.sender_user_id == sender_id && m.is_unread()
            })
            .count())
    }
}

#[async_trait]
impl PrescriptionRepository for InMemoryStore {
    async fn insert(&self, record: PrescriptionRecord) -> StorageResult<PrescriptionRecord> {
        self.check_available()?;
        let mut prescriptions = self.prescriptions.write().await;
        if prescriptions.contains_key(&record.id) {
            return Err(StorageError::Duplicate(format!("prescription {}", record.id)));
        }
        prescriptions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<PrescriptionRecord>> {
        self.check_available()?;
        Ok(self.prescriptions.read().await.get(&id).cloned())
    }

    async fn list_by_appointment(&self, appointment_id: Uuid) -> StorageResult<Vec<PrescriptionRecord>> {
        self.check_available()?;
        let mut rows: Vec<PrescriptionRecord> = self
            .prescriptions
            .read()
            .await
            .values()
            .filter(|p| p.appointment_id == appointment_id)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.created_at);
        Ok(rows)
    }

    async fn update(&self, record: PrescriptionRecord) -> StorageResult<PrescriptionRecord> {
        self.check_available()?;
        let mut prescriptions = self.prescriptions.write().await;
        match prescriptions.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(record)
            }
            None => Err(StorageError::Missing(format!("prescription {}", record.id))),
        }
    }

    async fn delete(&self, id: Uuid) -> StorageResult<bool> {
        self.check_available()?;
        Ok(self.prescriptions.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl VideoSessionRepository for InMemoryStore {
    async fn insert(&self, session: VideoSession) -> StorageResult<VideoSession> {
        self.check_available()?;
        let mut sessions = self.video_sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(StorageError::Duplicate(format!("video session {}", session.id)));
        }
        sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<VideoSession>> {
        self.check_available()?;
        Ok(self.video_sessions.read().await.get(&id).cloned())
    }

    async fn list_by_appointment(&self, appointment_id: Uuid) -> StorageResult<Vec<VideoSession>> {
        self.check_available()?;
        let mut rows: Vec<VideoSession> = self
            .video_sessions
            .read()
            .await
            .values()
            .filter(|s| s.appointment_id == appointment_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.created_at);
        Ok(rows)
    }

    async fn update(&self, session: VideoSession) -> StorageResult<VideoSession> {
        self.check_available()?;
        let mut sessions = self.video_sessions.write().await;
        match sessions.get_mut(&session.id) {
            Some(existing) => {
                *existing = session.clone();
                Ok(session)
            }
            None => Err(StorageError::Missing(format!("video session {}", session.id))),
        }
    }
}

#[async_trait]
impl AuditRepository for InMemoryStore {
    async fn append(&self, record: AuditRecord) -> StorageResult<()> {
        self.check_available()?;
        self.audit_log.write().await.push(record);
        Ok(())
    }

    async fn query(&self, filter: &AuditFilter) -> StorageResult<Vec<AuditRecord>> {
        self.check_available()?;
        let log = self.audit_log.read().await;
        let matching: Vec<AuditRecord> = log.iter().filter(|r| filter.matches(r)).cloned().collect();
        Ok(newest_first(matching, |r: &AuditRecord| r.at)
            .into_iter()
            .skip(filter.offset.unwrap_or(0))
            .take(filter.limit.unwrap_or(100))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;
    use shared_models::auth::UserRole;

    fn message(appointment_id: Uuid, sender: Uuid, minutes: i64) -> Message {
        Message {
            id: Uuid::new_v4(),
            appointment_id,
            sender_user_id: sender,
            body: format!("message {}", minutes),
            attachment_url: None,
            read_at: None,
            created_at: Utc::now() + Duration::minutes(minutes),
        }
    }

    #[tokio::test]
    async fn email_lookup_is_case_insensitive() {
        let store = InMemoryStore::new();
        let user = store
            .insert_user(UserAccount::new("Doc@Clinic.test", "Dr Who", UserRole::Doctor))
            .await
            .unwrap();

        let found = store.find_by_email("doc@clinic.TEST").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryStore::new();
        store
            .insert_user(UserAccount::new("a@b.test", "A", UserRole::Patient))
            .await
            .unwrap();
        let err = store
            .insert_user(UserAccount::new("A@B.test", "B", UserRole::Patient))
            .await
            .unwrap_err();
        assert_matches!(err, StorageError::Duplicate(_));
    }

    #[tokio::test]
    async fn messages_page_newest_first_and_mark_read_only_touches_sender() {
        let store = InMemoryStore::new();
        let appointment_id = Uuid::new_v4();
        let patient = Uuid::new_v4();
        let doctor = Uuid::new_v4();

        for minutes in 0..3 {
            MessageRepository::insert(&store, message(appointment_id, doctor, minutes)).await.unwrap();
        }
        MessageRepository::insert(&store, message(appointment_id, patient, 3)).await.unwrap();

        let page = MessageRepository::list_by_appointment(&store, appointment_id, 2, 0)
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].sender_user_id, patient);

        let flipped = store
            .mark_read_from_sender(appointment_id, doctor, Utc::now())
            .await
            .unwrap();
        assert_eq!(flipped, 3);
        assert_eq!(store.count_unread_from_sender(appointment_id, doctor).await.unwrap(), 0);
        assert_eq!(store.count_unread_from_sender(appointment_id, patient).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);
        let err = UserDirectory::find_by_id(&store, Uuid::new_v4()).await.unwrap_err();
        assert_matches!(err, StorageError::Unavailable(_));
    }
}
