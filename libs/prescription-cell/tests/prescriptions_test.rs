use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::services::{AppointmentLifecycleService, SchedulingLocks};
use audit_cell::models::actions;
use audit_cell::services::RecordingAuditSink;
use prescription_cell::handlers::PrescriptionState;
use prescription_cell::models::{CreatePrescriptionRequest, UpdatePrescriptionRequest};
use prescription_cell::router::prescription_routes;
use prescription_cell::services::PrescriptionService;
use shared_database::{
    AppointmentRepository, InMemoryStore, PrescriptionRepository, Repositories, StorageResult,
};
use shared_models::consultation::{PrescriptionItem, PrescriptionRecord};
use shared_models::error::ServiceError;
use shared_models::scheduling::{Appointment, AppointmentStatus};
use shared_utils::test_utils::Fixture;

struct Harness {
    fixture: Fixture,
    audit: Arc<RecordingAuditSink>,
    prescriptions: Arc<PrescriptionService>,
    lifecycle: Arc<AppointmentLifecycleService>,
    appointment: Appointment,
}

async fn harness(status: AppointmentStatus) -> Harness {
    let fixture = Fixture::new().await;
    let repos = fixture.repos.clone();
    harness_with_repos(fixture, repos, status).await
}

async fn harness_with_repos(fixture: Fixture, repos: Repositories, status: AppointmentStatus) -> Harness {
    let audit = Arc::new(RecordingAuditSink::new());
    let locks = Arc::new(SchedulingLocks::with_doctor_locks(fixture.doctor_locks.clone()));
    let prescriptions = Arc::new(PrescriptionService::new(
        &repos,
        locks.clone(),
        audit.clone(),
        fixture.clock.clone(),
    ));
    let lifecycle = Arc::new(AppointmentLifecycleService::new(
        &repos,
        locks,
        audit.clone(),
        fixture.clock.clone(),
    ));

    let appointment = fixture
        .repos
        .appointments
        .insert(Appointment {
            id: Uuid::new_v4(),
            patient_id: fixture.patient.id,
            doctor_id: fixture.doctor.id,
            slot_id: None,
            status,
            notes: String::new(),
            start_time: Fixture::at(10, 0),
            end_time: Fixture::at(10, 30),
            created_at: Fixture::at(8, 0),
            updated_at: Fixture::at(8, 0),
        })
        .await
        .unwrap();

    Harness {
        fixture,
        audit,
        prescriptions,
        lifecycle,
        appointment,
    }
}

fn amoxicillin() -> PrescriptionItem {
    PrescriptionItem::new("Amoxicillin", "500mg", "3x daily", "7 days", "Take with food")
}

fn create_request(items: Vec<PrescriptionItem>) -> CreatePrescriptionRequest {
    CreatePrescriptionRequest {
        items,
        notes: "Follow up in a week".to_string(),
    }
}

#[tokio::test]
async fn updated_item_list_replaces_the_original() {
    let h = harness(AppointmentStatus::Confirmed).await;
    let doctor = h.fixture.doctor.id;

    let created = h
        .prescriptions
        .create(h.appointment.id, doctor, create_request(vec![amoxicillin()]))
        .await
        .unwrap();
    assert_eq!(created.items, vec![amoxicillin()]);
    assert_eq!(created.created_by_doctor_id, doctor);

    let replacement = vec![
        PrescriptionItem::new("Ibuprofen", "200mg", "as needed", "5 days", ""),
        PrescriptionItem::new("Cetirizine", "10mg", "once daily", "14 days", "At night"),
    ];
    h.fixture.clock.advance(chrono::Duration::minutes(5));
    let updated = h
        .prescriptions
        .update(
            created.id,
            doctor,
            UpdatePrescriptionRequest {
                items: Some(replacement.clone()),
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.notes, "Follow up in a week");
    assert!(updated.updated_at > created.updated_at);

    let read_back = h
        .prescriptions
        .get(created.id, h.fixture.patient.id)
        .await
        .unwrap();
    assert_eq!(read_back.items, replacement);

    assert_eq!(
        h.audit.actions(),
        vec![actions::PRESCRIPTION_CREATE, actions::PRESCRIPTION_UPDATE]
    );
}

#[tokio::test]
async fn only_the_appointment_doctor_writes() {
    let h = harness(AppointmentStatus::Confirmed).await;

    let result = h
        .prescriptions
        .create(h.appointment.id, h.fixture.patient.id, create_request(vec![amoxicillin()]))
        .await;
    assert_matches!(result, Err(ServiceError::Forbidden(_)));

    let result = h
        .prescriptions
        .create(h.appointment.id, h.fixture.other_doctor.id, create_request(vec![amoxicillin()]))
        .await;
    assert_matches!(result, Err(ServiceError::Forbidden(_)));

    let created = h
        .prescriptions
        .create(h.appointment.id, h.fixture.doctor.id, create_request(vec![amoxicillin()]))
        .await
        .unwrap();

    let result = h.prescriptions.delete(created.id, h.fixture.patient.id).await;
    assert_matches!(result, Err(ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn non_participants_cannot_read() {
    let h = harness(AppointmentStatus::Confirmed).await;
    let created = h
        .prescriptions
        .create(h.appointment.id, h.fixture.doctor.id, create_request(vec![amoxicillin()]))
        .await
        .unwrap();

    let result = h.prescriptions.get(created.id, h.fixture.other_patient.id).await;
    assert_matches!(result, Err(ServiceError::Forbidden(_)));

    let result = h
        .prescriptions
        .list_for_appointment(h.appointment.id, h.fixture.other_patient.id)
        .await;
    assert_matches!(result, Err(ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn cancelled_appointments_reject_prescriptions() {
    let h = harness(AppointmentStatus::Cancelled).await;

    let result = h
        .prescriptions
        .create(h.appointment.id, h.fixture.doctor.id, create_request(vec![amoxicillin()]))
        .await;
    assert_matches!(result, Err(ServiceError::Conflict(_)));
    assert!(h.audit.events().is_empty());
}

#[tokio::test]
async fn incomplete_items_are_rejected() {
    let h = harness(AppointmentStatus::Confirmed).await;
    let doctor = h.fixture.doctor.id;

    let result = h
        .prescriptions
        .create(h.appointment.id, doctor, create_request(Vec::new()))
        .await;
    assert_matches!(result, Err(ServiceError::Validation(_)));

    let mut missing_dosage = amoxicillin();
    missing_dosage.dosage = "  ".to_string();
    let result = h
        .prescriptions
        .create(h.appointment.id, doctor, create_request(vec![missing_dosage]))
        .await;
    assert_matches!(result, Err(ServiceError::Validation(msg)) if msg.contains("dosage"));
}

#[tokio::test]
async fn deleted_prescriptions_disappear_from_the_listing() {
    let h = harness(AppointmentStatus::Completed).await;
    let doctor = h.fixture.doctor.id;

    let first = h
        .prescriptions
        .create(h.appointment.id, doctor, create_request(vec![amoxicillin()]))
        .await
        .unwrap();
    h.fixture.clock.advance(chrono::Duration::minutes(1));
    let second = h
        .prescriptions
        .create(h.appointment.id, doctor, create_request(vec![amoxicillin()]))
        .await
        .unwrap();

    let listed = h
        .prescriptions
        .list_for_appointment(h.appointment.id, h.fixture.patient.id)
        .await
        .unwrap();
    assert_eq!(
        listed.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![first.id, second.id]
    );

    h.prescriptions.delete(first.id, doctor).await.unwrap();
    let result = h.prescriptions.get(first.id, doctor).await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));

    let listed = h
        .prescriptions
        .list_for_appointment(h.appointment.id, doctor)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn http_round_trip() {
    let h = harness(AppointmentStatus::Confirmed).await;
    let state = Arc::new(PrescriptionState {
        config: h.fixture.config.clone(),
        prescriptions: h.prescriptions.clone(),
    });

    let body = serde_json::json!({
        "items": [amoxicillin()],
        "notes": "Finish the course"
    });
    let response = prescription_routes(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/appointments/{}/prescriptions", h.appointment.id))
                .header("Authorization", format!("Bearer {}", h.fixture.token(&h.fixture.doctor)))
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = prescription_routes(state.clone())
        .oneshot(
            Request::builder()
                .uri(format!("/appointments/{}/prescriptions", h.appointment.id))
                .header("Authorization", format!("Bearer {}", h.fixture.token(&h.fixture.patient)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["count"], 1);
    assert_eq!(json["prescriptions"][0]["items"][0]["medication_name"], "Amoxicillin");

    let response = prescription_routes(state)
        .oneshot(
            Request::builder()
                .uri(format!("/appointments/{}/prescriptions", h.appointment.id))
                .header(
                    "Authorization",
                    format!("Bearer {}", h.fixture.token(&h.fixture.other_patient)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Prescription storage that pauses before each insert and records the
/// appointment's status at the moment the row is written.
struct SlowPrescriptions {
    inner: Arc<InMemoryStore>,
    delay: Duration,
    status_at_insert: Mutex<Vec<AppointmentStatus>>,
}

#[async_trait]
impl PrescriptionRepository for SlowPrescriptions {
    async fn insert(&self, record: PrescriptionRecord) -> StorageResult<PrescriptionRecord> {
        tokio::time::sleep(self.delay).await;
        let appointment = AppointmentRepository::find_by_id(self.inner.as_ref(), record.appointment_id).await?;
        if let Some(appointment) = appointment {
            self.status_at_insert.lock().unwrap().push(appointment.status);
        }
        PrescriptionRepository::insert(self.inner.as_ref(), record).await
    }

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<PrescriptionRecord>> {
        PrescriptionRepository::find_by_id(self.inner.as_ref(), id).await
    }

    async fn list_by_appointment(&self, appointment_id: Uuid) -> StorageResult<Vec<PrescriptionRecord>> {
        PrescriptionRepository::list_by_appointment(self.inner.as_ref(), appointment_id).await
    }

    async fn update(&self, record: PrescriptionRecord) -> StorageResult<PrescriptionRecord> {
        PrescriptionRepository::update(self.inner.as_ref(), record).await
    }

    async fn delete(&self, id: Uuid) -> StorageResult<bool> {
        PrescriptionRepository::delete(self.inner.as_ref(), id).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_during_a_slow_create_waits_for_it() {
    let fixture = Fixture::new().await;
    let slow = Arc::new(SlowPrescriptions {
        inner: fixture.store.clone(),
        delay: Duration::from_millis(50),
        status_at_insert: Mutex::new(Vec::new()),
    });
    let mut repos = fixture.repos.clone();
    repos.prescriptions = slow.clone();
    let h = harness_with_repos(fixture, repos, AppointmentStatus::Confirmed).await;
    let appointment_id = h.appointment.id;

    let create = {
        let prescriptions = h.prescriptions.clone();
        let doctor = h.fixture.doctor.id;
        tokio::spawn(async move {
            prescriptions
                .create(appointment_id, doctor, create_request(vec![amoxicillin()]))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let cancelled = h.lifecycle.cancel(appointment_id, h.fixture.patient.id).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    let created = create.await.unwrap();
    assert!(created.is_ok());
    assert_eq!(
        *slow.status_at_insert.lock().unwrap(),
        vec![AppointmentStatus::Confirmed]
    );
    assert_eq!(
        h.audit.actions(),
        vec![actions::PRESCRIPTION_CREATE, actions::APPOINTMENT_STATUS_CHANGE]
    );

    let result = h
        .prescriptions
        .create(appointment_id, h.fixture.doctor.id, create_request(vec![amoxicillin()]))
        .await;
    assert_matches!(result, Err(ServiceError::Conflict(_)));
    assert_eq!(slow.status_at_insert.lock().unwrap().len(), 1);
}
