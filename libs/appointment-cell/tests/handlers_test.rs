mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use appointment_cell::handlers::AppointmentState;
use appointment_cell::router::appointment_routes;
use shared_utils::test_utils::{Fixture, JwtTestUtils, TestUser};

use common::Harness;

fn app(h: &Harness) -> Router {
    appointment_routes(Arc::new(AppointmentState {
        config: h.fixture.config.clone(),
        booking: h.booking.clone(),
        lifecycle: h.lifecycle.clone(),
    }))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn booking_and_status_flow_over_http() {
    let h = Harness::new().await;
    let patient_token = h.fixture.token(&h.fixture.patient);
    let doctor_token = h.fixture.token(&h.fixture.doctor);

    let (status, created) = send(
        app(&h),
        json_request(
            "POST",
            "/",
            &patient_token,
            json!({
                "doctor_id": h.fixture.doctor.id,
                "start_time": Fixture::at(10, 0),
                "end_time": Fixture::at(10, 30),
                "notes": "persistent cough"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["status"], "pending");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        app(&h),
        json_request(
            "POST",
            "/",
            &patient_token,
            json!({
                "doctor_id": h.fixture.doctor.id,
                "start_time": Fixture::at(10, 15),
                "end_time": Fixture::at(10, 45)
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("slot already booked"));

    let (status, _) = send(
        app(&h),
        json_request("PATCH", &format!("/{}/status", id), &patient_token, json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        app(&h),
        json_request("PATCH", &format!("/{}/status", id), &doctor_token, json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "confirmed");

    let (status, body) = send(
        app(&h),
        Request::builder()
            .uri("/")
            .header("Authorization", format!("Bearer {}", doctor_token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn invalid_transition_maps_to_conflict() {
    let h = Harness::new().await;
    let appointment = h
        .seed_appointment(shared_models::scheduling::AppointmentStatus::Completed)
        .await;
    let token = h.fixture.token(&h.fixture.patient);

    let (status, body) = send(
        app(&h),
        json_request("POST", &format!("/{}/cancel", appointment.id), &token, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("completed"));
}

#[tokio::test]
async fn outsiders_and_bad_tokens_are_rejected() {
    let h = Harness::new().await;
    let appointment = h
        .seed_appointment(shared_models::scheduling::AppointmentStatus::Pending)
        .await;

    let outsider = h.fixture.token(&h.fixture.other_patient);
    let (status, _) = send(
        app(&h),
        Request::builder()
            .uri(format!("/{}", appointment.id))
            .header("Authorization", format!("Bearer {}", outsider))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let expired = JwtTestUtils::create_expired_token(
        &TestUser::from_account(&h.fixture.patient),
        &h.fixture.config.jwt_secret,
    );
    let (status, body) = send(
        app(&h),
        Request::builder()
            .uri(format!("/{}", appointment.id))
            .header("Authorization", format!("Bearer {}", expired))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("Token expired"));
}
