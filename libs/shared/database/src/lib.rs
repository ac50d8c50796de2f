pub mod error;
pub mod memory;
pub mod repositories;

use std::sync::Arc;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStore;
pub use repositories::{
    AppointmentRepository, AuditRepository, MessageRepository, PrescriptionRepository,
    SlotRepository, UserDirectory, VideoSessionRepository,
};

/// Handles to every repository, cloned into each service at startup.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserDirectory>,
    pub slots: Arc<dyn SlotRepository>,
    pub appointments: Arc<dyn AppointmentRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub prescriptions: Arc<dyn PrescriptionRepository>,
    pub video_sessions: Arc<dyn VideoSessionRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

impl Repositories {
    /// Every repository served by the same in-memory store.
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            users: store.clone(),
            slots: store.clone(),
            appointments: store.clone(),
            messages: store.clone(),
            prescriptions: store.clone(),
            video_sessions: store.clone(),
            audit: store,
        }
    }
}
