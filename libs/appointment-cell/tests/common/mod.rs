#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use appointment_cell::models::CreateAppointmentRequest;
use appointment_cell::services::{AppointmentBookingService, AppointmentLifecycleService, SchedulingLocks};
use audit_cell::services::RecordingAuditSink;
use doctor_cell::services::SlotService;
use shared_database::Repositories;
use shared_models::auth::UserAccount;
use shared_models::scheduling::{Appointment, AppointmentStatus};
use shared_utils::clock::Clock;
use shared_utils::test_utils::Fixture;

pub struct Harness {
    pub fixture: Fixture,
    pub audit: Arc<RecordingAuditSink>,
    pub locks: Arc<SchedulingLocks>,
    pub booking: Arc<AppointmentBookingService>,
    pub lifecycle: Arc<AppointmentLifecycleService>,
    pub slots: Arc<SlotService>,
}

impl Harness {
    pub async fn new() -> Self {
        let fixture = Fixture::new().await;
        let repos = fixture.repos.clone();
        Self::with_repos(fixture, repos)
    }

    pub fn with_repos(fixture: Fixture, repos: Repositories) -> Self {
        let audit = Arc::new(RecordingAuditSink::new());
        let locks = Arc::new(SchedulingLocks::with_doctor_locks(fixture.doctor_locks.clone()));

        let booking = Arc::new(AppointmentBookingService::new(
            &repos,
            locks.clone(),
            audit.clone(),
            fixture.clock.clone(),
        ));
        let lifecycle = Arc::new(AppointmentLifecycleService::new(
            &repos,
            locks.clone(),
            audit.clone(),
            fixture.clock.clone(),
        ));
        let slots = Arc::new(SlotService::new(
            &repos,
            locks.doctor_locks(),
            audit.clone(),
            fixture.clock.clone(),
        ));

        Self {
            fixture,
            audit,
            locks,
            booking,
            lifecycle,
            slots,
        }
    }

    pub fn request(
        &self,
        patient: &UserAccount,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            patient_id: patient.id,
            doctor_id: self.fixture.doctor.id,
            start_time: start,
            end_time: end,
            slot_id: None,
            notes: String::new(),
        }
    }

    /// Stores an appointment in the given state, bypassing the booking rules.
    pub async fn seed_appointment(&self, status: AppointmentStatus) -> Appointment {
        let now = self.fixture.clock.now();
        self.fixture
            .repos
            .appointments
            .insert(Appointment {
                id: Uuid::new_v4(),
                patient_id: self.fixture.patient.id,
                doctor_id: self.fixture.doctor.id,
                slot_id: None,
                status,
                notes: "seeded".to_string(),
                start_time: Fixture::at(15, 0),
                end_time: Fixture::at(15, 30),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap()
    }
}
