use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use appointment_cell::services::{AccessGuard, SchedulingLocks};
use audit_cell::models::{actions, AuditEvent};
use audit_cell::services::AuditSink;
use shared_database::{Repositories, VideoSessionRepository};
use shared_models::consultation::VideoSession;
use shared_models::error::ServiceError;
use shared_models::scheduling::AppointmentStatus;
use shared_utils::clock::Clock;

use crate::models::{IceServer, SignalingInfo};
use crate::services::signaling::SignalingTokenIssuer;

const ROOM_ID_BYTES: usize = 18;

/// Video session lifecycle: created, then started, then ended.
///
/// Every mutation holds the appointment's lock, so at most one session per
/// appointment is ever unended.
pub struct VideoSessionService {
    sessions: Arc<dyn VideoSessionRepository>,
    guard: AccessGuard,
    locks: Arc<SchedulingLocks>,
    issuer: Arc<dyn SignalingTokenIssuer>,
    ice_servers: Vec<IceServer>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl VideoSessionService {
    pub fn new(
        repos: &Repositories,
        locks: Arc<SchedulingLocks>,
        issuer: Arc<dyn SignalingTokenIssuer>,
        ice_servers: Vec<IceServer>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions: repos.video_sessions.clone(),
            guard: AccessGuard::new(repos.appointments.clone()),
            locks,
            issuer,
            ice_servers,
            audit,
            clock,
        }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, appointment_id: Uuid, actor_id: Uuid) -> Result<VideoSession, ServiceError> {
        let _guard = self.locks.appointment(appointment_id).await;

        let appointment = self.guard.authorize(appointment_id, actor_id).await?;
        if matches!(
            appointment.status,
            AppointmentStatus::Cancelled | AppointmentStatus::Completed
        ) {
            return Err(ServiceError::conflict(format!(
                "appointment is {}",
                appointment.status
            )));
        }

        let existing = self.sessions.list_by_appointment(appointment_id).await?;
        if let Some(open) = existing.iter().find(|s| !s.has_ended()) {
            warn!("Appointment {} already has open session {}", appointment_id, open.id);
            return Err(ServiceError::conflict("appointment already has an open video session"));
        }

        let now = self.clock.now();
        let session = self
            .sessions
            .insert(VideoSession {
                id: Uuid::new_v4(),
                appointment_id,
                room_id: generate_room_id(),
                started_at: None,
                ended_at: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!("Video session {} created for appointment {}", session.id, appointment_id);
        self.audit.record(
            AuditEvent::new(actions::VIDEO_SESSION_CREATE, "video_session", session.id)
                .by(actor_id)
                .with("appointment_id", appointment_id.to_string()),
        );

        Ok(session)
    }

    #[instrument(skip(self))]
    pub async fn start(&self, session_id: Uuid, actor_id: Uuid) -> Result<VideoSession, ServiceError> {
        let appointment_id = self.find(session_id).await?.appointment_id;
        let _guard = self.locks.appointment(appointment_id).await;

        let mut session = self.find(session_id).await?;
        self.guard.authorize(appointment_id, actor_id).await?;

        if session.has_ended() {
            return Err(ServiceError::conflict("video session has already ended"));
        }
        if session.started_at.is_some() {
            return Err(ServiceError::conflict("video session has already started"));
        }

        let now = self.clock.now();
        session.started_at = Some(now);
        session.updated_at = now;
        let session = self.sessions.update(session).await?;

        info!("Video session {} started", session_id);
        self.audit.record(
            AuditEvent::new(actions::VIDEO_SESSION_START, "video_session", session_id)
                .by(actor_id)
                .with("appointment_id", appointment_id.to_string()),
        );

        Ok(session)
    }

    /// Ending a session that never started closes it as well.
    #[instrument(skip(self))]
    pub async fn end(&self, session_id: Uuid, actor_id: Uuid) -> Result<VideoSession, ServiceError> {
        let appointment_id = self.find(session_id).await?.appointment_id;
        let _guard = self.locks.appointment(appointment_id).await;

        let mut session = self.find(session_id).await?;
        self.guard.authorize(appointment_id, actor_id).await?;

        if session.has_ended() {
            return Err(ServiceError::conflict("video session has already ended"));
        }

        let now = self.clock.now();
        session.ended_at = Some(now);
        session.updated_at = now;
        let session = self.sessions.update(session).await?;

        let duration_seconds = session
            .started_at
            .map(|started| (now - started).num_seconds())
            .unwrap_or(0);
        info!("Video session {} ended after {}s", session_id, duration_seconds);
        self.audit.record(
            AuditEvent::new(actions::VIDEO_SESSION_END, "video_session", session_id)
                .by(actor_id)
                .with("appointment_id", appointment_id.to_string())
                .with("duration_seconds", duration_seconds),
        );

        Ok(session)
    }

    pub async fn get(&self, session_id: Uuid, actor_id: Uuid) -> Result<VideoSession, ServiceError> {
        let session = self.find(session_id).await?;
        self.guard.authorize(session.appointment_id, actor_id).await?;
        Ok(session)
    }

    /// Oldest first.
    pub async fn list_for_appointment(
        &self,
        appointment_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Vec<VideoSession>, ServiceError> {
        self.guard.authorize(appointment_id, actor_id).await?;
        Ok(self.sessions.list_by_appointment(appointment_id).await?)
    }

    #[instrument(skip(self))]
    pub async fn signaling_info(&self, session_id: Uuid, actor_id: Uuid) -> Result<SignalingInfo, ServiceError> {
        let session = self.get(session_id, actor_id).await?;
        if session.has_ended() {
            return Err(ServiceError::conflict("video session has already ended"));
        }

        let token = self.issuer.issue_token(&session.room_id, actor_id).await?;

        Ok(SignalingInfo {
            session_id: session.id,
            room_id: session.room_id,
            ice_servers: self.ice_servers.clone(),
            token: token.token,
            expires_at: token.expires_at,
        })
    }

    async fn find(&self, session_id: Uuid) -> Result<VideoSession, ServiceError> {
        self.sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("video session"))
    }
}

fn generate_room_id() -> String {
    let mut bytes = [0u8; ROOM_ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
