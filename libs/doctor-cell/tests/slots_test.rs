use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use audit_cell::models::actions;
use audit_cell::services::RecordingAuditSink;
use doctor_cell::handlers::SlotState;
use doctor_cell::models::{CreateSlotRequest, UpdateSlotRequest};
use doctor_cell::router::slot_routes;
use doctor_cell::services::SlotService;
use shared_models::error::ServiceError;
use shared_models::scheduling::{Appointment, AppointmentStatus, SlotStatus};
use shared_utils::test_utils::Fixture;

struct Harness {
    fixture: Fixture,
    audit: Arc<RecordingAuditSink>,
    service: SlotService,
}

async fn harness() -> Harness {
    let fixture = Fixture::new().await;
    let audit = Arc::new(RecordingAuditSink::new());
    let service = SlotService::new(
        &fixture.repos,
        fixture.doctor_locks.clone(),
        audit.clone(),
        fixture.clock.clone(),
    );
    Harness { fixture, audit, service }
}

fn slot_request(start: (u32, u32), end: (u32, u32)) -> CreateSlotRequest {
    CreateSlotRequest {
        start_time: Fixture::at(start.0, start.1),
        end_time: Fixture::at(end.0, end.1),
    }
}

fn appointment_on_slot(h: &Harness, slot_id: Uuid, status: AppointmentStatus) -> Appointment {
    let now = Fixture::at(8, 0);
    Appointment {
        id: Uuid::new_v4(),
        patient_id: h.fixture.patient.id,
        doctor_id: h.fixture.doctor.id,
        slot_id: Some(slot_id),
        status,
        notes: String::new(),
        start_time: Fixture::at(10, 0),
        end_time: Fixture::at(10, 30),
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn doctor_creates_open_slot() {
    let h = harness().await;

    let slot = h
        .service
        .create(h.fixture.doctor.id, slot_request((10, 0), (10, 30)))
        .await
        .unwrap();

    assert_eq!(slot.status, SlotStatus::Open);
    assert_eq!(slot.doctor_id, h.fixture.doctor.id);
    assert_eq!(h.audit.actions(), vec![actions::SLOT_CREATE]);
}

#[tokio::test]
async fn create_rejects_bad_ranges_and_non_doctors() {
    let h = harness().await;
    let doctor = h.fixture.doctor.id;

    let err = h.service.create(doctor, slot_request((10, 30), (10, 0))).await.unwrap_err();
    assert_matches!(err, ServiceError::Validation(_));

    let err = h.service.create(doctor, slot_request((10, 0), (10, 0))).await.unwrap_err();
    assert_matches!(err, ServiceError::Validation(_));

    let err = h.service.create(doctor, slot_request((7, 0), (7, 30))).await.unwrap_err();
    assert_matches!(err, ServiceError::Validation(_));

    let err = h
        .service
        .create(h.fixture.patient.id, slot_request((10, 0), (10, 30)))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    assert!(h.audit.events().is_empty());
}

#[tokio::test]
async fn only_owner_updates_and_absent_status_is_a_no_op() {
    let h = harness().await;
    let slot = h
        .service
        .create(h.fixture.doctor.id, slot_request((10, 0), (10, 30)))
        .await
        .unwrap();

    let err = h
        .service
        .update(slot.id, h.fixture.other_doctor.id, UpdateSlotRequest { status: Some(SlotStatus::Blocked) })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));

    let unchanged = h
        .service
        .update(slot.id, h.fixture.doctor.id, UpdateSlotRequest::default())
        .await
        .unwrap();
    assert_eq!(unchanged, slot);

    let blocked = h
        .service
        .update(slot.id, h.fixture.doctor.id, UpdateSlotRequest { status: Some(SlotStatus::Blocked) })
        .await
        .unwrap();
    assert_eq!(blocked.status, SlotStatus::Blocked);

    let err = h
        .service
        .update(Uuid::new_v4(), h.fixture.doctor.id, UpdateSlotRequest::default())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn delete_conflicts_while_an_appointment_references_the_slot() {
    let h = harness().await;
    let slot = h
        .service
        .create(h.fixture.doctor.id, slot_request((10, 0), (10, 30)))
        .await
        .unwrap();
    h.fixture
        .repos
        .appointments
        .insert(appointment_on_slot(&h, slot.id, AppointmentStatus::Pending))
        .await
        .unwrap();

    let err = h.service.delete(slot.id, h.fixture.doctor.id).await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    let err = h.service.delete(slot.id, h.fixture.other_doctor.id).await.unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));

    assert!(h.service.get(slot.id).await.is_ok());
}

#[tokio::test]
async fn delete_free_slot() {
    let h = harness().await;
    let slot = h
        .service
        .create(h.fixture.doctor.id, slot_request((11, 0), (11, 30)))
        .await
        .unwrap();

    h.service.delete(slot.id, h.fixture.doctor.id).await.unwrap();

    assert_matches!(h.service.get(slot.id).await, Err(ServiceError::NotFound(_)));
    assert_eq!(h.audit.actions(), vec![actions::SLOT_CREATE, actions::SLOT_DELETE]);
}

#[tokio::test]
async fn available_slots_skip_blocked_past_and_taken() {
    let h = harness().await;
    let doctor = h.fixture.doctor.id;

    let free = h.service.create(doctor, slot_request((9, 0), (9, 30))).await.unwrap();
    let taken = h.service.create(doctor, slot_request((10, 0), (10, 30))).await.unwrap();
    let blocked = h.service.create(doctor, slot_request((11, 0), (11, 30))).await.unwrap();
    let soon_past = h.service.create(doctor, slot_request((8, 15), (8, 45))).await.unwrap();
    let freed = h.service.create(doctor, slot_request((12, 0), (12, 30))).await.unwrap();

    h.service
        .update(blocked.id, doctor, UpdateSlotRequest { status: Some(SlotStatus::Blocked) })
        .await
        .unwrap();
    h.fixture
        .repos
        .appointments
        .insert(appointment_on_slot(&h, taken.id, AppointmentStatus::Confirmed))
        .await
        .unwrap();
    h.fixture
        .repos
        .appointments
        .insert(appointment_on_slot(&h, freed.id, AppointmentStatus::Cancelled))
        .await
        .unwrap();

    h.fixture.clock.advance(Duration::minutes(30));

    let available = h.service.available_slots(doctor, Fixture::day()).await.unwrap();
    let ids: Vec<Uuid> = available.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![free.id, freed.id]);
    assert!(!ids.contains(&soon_past.id));

    let next_day = Fixture::day().succ_opt().unwrap();
    assert!(h.service.available_slots(doctor, next_day).await.unwrap().is_empty());
}

#[tokio::test]
async fn slot_routes_require_auth_except_availability() {
    let h = harness().await;
    let doctor = h.fixture.doctor.clone();
    let token = h.fixture.token(&doctor);
    let state = Arc::new(SlotState {
        config: h.fixture.config.clone(),
        slots: Arc::new(h.service),
    });

    let response = slot_routes(state.clone())
        .oneshot(Request::builder().uri("/slots").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = slot_routes(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/slots")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "start_time": Fixture::at(14, 0),
                        "end_time": Fixture::at(14, 30),
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = slot_routes(state)
        .oneshot(
            Request::builder()
                .uri(format!("/doctors/{}/available-slots?date={}", doctor.id, Fixture::day()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["count"], 1);
}
