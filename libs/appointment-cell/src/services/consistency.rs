use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use shared_utils::locks::KeyedLocks;

/// Serialization boundaries for scheduling writes.
///
/// Booking holds the doctor's lock across "conflict check, insert". Every
/// operation on one appointment (status changes, video session changes)
/// holds that appointment's lock across "read, validate, write".
#[derive(Debug, Default)]
pub struct SchedulingLocks {
    doctors: Arc<KeyedLocks>,
    appointments: KeyedLocks,
}

impl SchedulingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shares an existing doctor lock map, e.g. the one slot mutations use.
    pub fn with_doctor_locks(doctors: Arc<KeyedLocks>) -> Self {
        Self {
            doctors,
            appointments: KeyedLocks::new(),
        }
    }

    pub fn doctor_locks(&self) -> Arc<KeyedLocks> {
        self.doctors.clone()
    }

    pub async fn doctor(&self, doctor_id: Uuid) -> OwnedMutexGuard<()> {
        self.doctors.lock(doctor_id).await
    }

    pub async fn appointment(&self, appointment_id: Uuid) -> OwnedMutexGuard<()> {
        self.appointments.lock(appointment_id).await
    }
}
