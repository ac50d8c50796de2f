use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::consultation::VideoSession;
use shared_models::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServer {
    pub fn stun(url: &str) -> Self {
        Self {
            urls: vec![url.to_string()],
            username: None,
            credential: None,
        }
    }

    /// One STUN entry per configured server.
    pub fn from_config(config: &AppConfig) -> Vec<Self> {
        config.stun_servers.iter().map(|url| Self::stun(url)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalingToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Everything a participant needs to join the room.
#[derive(Debug, Clone, Serialize)]
pub struct SignalingInfo {
    pub session_id: Uuid,
    pub room_id: String,
    pub ice_servers: Vec<IceServer>,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct VideoSessionListResponse {
    pub sessions: Vec<VideoSession>,
    pub count: usize,
}

impl From<Vec<VideoSession>> for VideoSessionListResponse {
    fn from(sessions: Vec<VideoSession>) -> Self {
        Self {
            count: sessions.len(),
            sessions,
        }
    }
}

#[derive(Error, Debug)]
pub enum SignalingError {
    #[error("Signaling is not configured: {0}")]
    NotConfigured(String),

    #[error("Signaling issuer request failed: {0}")]
    Request(String),

    #[error("Signaling issuer returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Signaling issuer response unreadable: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for SignalingError {
    fn from(err: reqwest::Error) -> Self {
        SignalingError::Request(err.to_string())
    }
}

impl From<SignalingError> for ServiceError {
    fn from(err: SignalingError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}
