use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_utils::clock::Clock;

use crate::models::{SignalingError, SignalingToken};

type HmacSha256 = Hmac<Sha256>;

/// Issues short-lived tokens that admit one user to one signaling room.
#[async_trait]
pub trait SignalingTokenIssuer: Send + Sync {
    async fn issue_token(&self, room_id: &str, actor_id: Uuid) -> Result<SignalingToken, SignalingError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomClaims {
    pub room: String,
    pub sub: Uuid,
    pub exp: i64,
}

/// Signs `base64url(claims).base64url(hmac_sha256(claims_segment))` locally.
pub struct HmacTokenIssuer {
    secret: String,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for HmacTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacTokenIssuer")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl HmacTokenIssuer {
    pub fn new(secret: &str, ttl_seconds: i64, clock: Arc<dyn Clock>) -> Result<Self, SignalingError> {
        if secret.is_empty() {
            return Err(SignalingError::NotConfigured(
                "SIGNALING_TOKEN_SECRET is empty".to_string(),
            ));
        }
        if ttl_seconds <= 0 {
            return Err(SignalingError::NotConfigured(format!(
                "token lifetime must be positive, got {}",
                ttl_seconds
            )));
        }

        Ok(Self {
            secret: secret.to_string(),
            ttl: Duration::seconds(ttl_seconds),
            clock,
        })
    }

    pub fn from_config(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self, SignalingError> {
        Self::new(
            &config.signaling_token_secret,
            config.signaling_token_ttl_seconds,
            clock,
        )
    }

    /// Checks the signature and expiry of a token this issuer produced.
    pub fn verify(&self, token: &str) -> Result<RoomClaims, SignalingError> {
        let (claims_b64, signature_b64) = token
            .split_once('.')
            .ok_or_else(|| SignalingError::InvalidResponse("malformed room token".to_string()))?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| SignalingError::InvalidResponse("invalid signature encoding".to_string()))?;
        self.mac()?
            .chain_update(claims_b64.as_bytes())
            .verify_slice(&signature)
            .map_err(|_| SignalingError::InvalidResponse("invalid room token signature".to_string()))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| SignalingError::InvalidResponse("invalid claims encoding".to_string()))?;
        let claims: RoomClaims = serde_json::from_slice(&bytes)
            .map_err(|e| SignalingError::InvalidResponse(e.to_string()))?;

        if claims.exp < self.clock.now().timestamp() {
            return Err(SignalingError::InvalidResponse("room token expired".to_string()));
        }
        Ok(claims)
    }

    fn mac(&self) -> Result<HmacSha256, SignalingError> {
        HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| SignalingError::NotConfigured(e.to_string()))
    }
}

#[async_trait]
impl SignalingTokenIssuer for HmacTokenIssuer {
    async fn issue_token(&self, room_id: &str, actor_id: Uuid) -> Result<SignalingToken, SignalingError> {
        let expires_at = self.clock.now() + self.ttl;
        let claims = RoomClaims {
            room: room_id.to_string(),
            sub: actor_id,
            exp: expires_at.timestamp(),
        };

        let payload = serde_json::to_vec(&claims)
            .map_err(|e| SignalingError::InvalidResponse(e.to_string()))?;
        let claims_b64 = URL_SAFE_NO_PAD.encode(payload);
        let signature = self.mac()?.chain_update(claims_b64.as_bytes()).finalize().into_bytes();

        // Whole seconds, matching the `exp` claim.
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or(expires_at);

        Ok(SignalingToken {
            token: format!("{}.{}", claims_b64, URL_SAFE_NO_PAD.encode(signature)),
            expires_at,
        })
    }
}

/// Delegates token issuing to an external signaling service.
///
/// Sends `POST {url}` with `{"room_id", "user_id", "ttl_seconds"}` and expects
/// `{"token", "expires_at"}` back.
pub struct RemoteTokenIssuer {
    client: Client,
    url: String,
    api_key: String,
    ttl_seconds: i64,
}

impl std::fmt::Debug for RemoteTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTokenIssuer")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl RemoteTokenIssuer {
    pub fn new(url: &str, api_key: &str, ttl_seconds: i64) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
            api_key: api_key.to_string(),
            ttl_seconds,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, SignalingError> {
        let url = config.signaling_issuer_url.as_deref().ok_or_else(|| {
            SignalingError::NotConfigured("SIGNALING_ISSUER_URL is not set".to_string())
        })?;

        Ok(Self::new(
            url,
            &config.signaling_token_secret,
            config.signaling_token_ttl_seconds,
        ))
    }
}

#[async_trait]
impl SignalingTokenIssuer for RemoteTokenIssuer {
    async fn issue_token(&self, room_id: &str, actor_id: Uuid) -> Result<SignalingToken, SignalingError> {
        debug!("Requesting room token from {}", self.url);

        let mut request = self.client.post(&self.url).json(&json!({
            "room_id": room_id,
            "user_id": actor_id,
            "ttl_seconds": self.ttl_seconds,
        }));
        if !self.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("Signaling issuer rejected token request: {} - {}", status, body);
            return Err(SignalingError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse signaling issuer response: {}", e);
            SignalingError::InvalidResponse(e.to_string())
        })
    }
}

/// Picks the remote issuer when `SIGNALING_ISSUER_URL` is set.
pub fn issuer_from_config(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn SignalingTokenIssuer>, SignalingError> {
    if config.uses_remote_signaling() {
        Ok(Arc::new(RemoteTokenIssuer::from_config(config)?))
    } else {
        Ok(Arc::new(HmacTokenIssuer::from_config(config, clock)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_utils::clock::FixedClock;

    fn issuer(clock: Arc<FixedClock>) -> HmacTokenIssuer {
        HmacTokenIssuer::new("room-secret", 600, clock).unwrap()
    }

    #[tokio::test]
    async fn issued_tokens_verify_until_expiry() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2030, 3, 4, 9, 0, 0).unwrap()));
        let issuer = issuer(clock.clone());
        let actor = Uuid::new_v4();

        let token = issuer.issue_token("room-1", actor).await.unwrap();
        assert_eq!(token.expires_at, clock.now() + Duration::seconds(600));

        let claims = issuer.verify(&token.token).unwrap();
        assert_eq!(claims.room, "room-1");
        assert_eq!(claims.sub, actor);

        clock.advance(Duration::seconds(601));
        assert_matches!(issuer.verify(&token.token), Err(SignalingError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn tokens_from_another_secret_are_rejected() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let ours = issuer(clock.clone());
        let theirs = HmacTokenIssuer::new("other-secret", 600, clock).unwrap();

        let token = theirs.issue_token("room-1", Uuid::new_v4()).await.unwrap();
        assert_matches!(ours.verify(&token.token), Err(SignalingError::InvalidResponse(_)));
    }

    #[test]
    fn empty_secret_is_not_configured() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        assert_matches!(
            HmacTokenIssuer::new("", 600, clock),
            Err(SignalingError::NotConfigured(_))
        );
    }
}
