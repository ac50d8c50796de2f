use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub upload_dir: String,
    pub stun_servers: Vec<String>,
    pub signaling_token_secret: String,
    pub signaling_token_ttl_seconds: i64,
    pub signaling_issuer_url: Option<String>,
    pub audit_queue_capacity: usize,
    pub audit_workers: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            jwt_secret: String::new(),
            upload_dir: "./uploads".to_string(),
            stun_servers: vec![
                "stun:stun.l.google.com:19302".to_string(),
                "stun:stun1.l.google.com:19302".to_string(),
            ],
            signaling_token_secret: String::new(),
            signaling_token_ttl_seconds: 3600,
            signaling_issuer_url: None,
            audit_queue_capacity: 1024,
            audit_workers: 2,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| {
                warn!("SERVER_HOST not set, using default");
                defaults.server_host.clone()
            }),
            server_port: parse_or("SERVER_PORT", defaults.server_port),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                warn!("JWT_SECRET not set, using empty value");
                String::new()
            }),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| {
                warn!("UPLOAD_DIR not set, using default");
                defaults.upload_dir.clone()
            }),
            stun_servers: env::var("STUN_SERVERS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_else(|_| defaults.stun_servers.clone()),
            signaling_token_secret: env::var("SIGNALING_TOKEN_SECRET").unwrap_or_else(|_| {
                warn!("SIGNALING_TOKEN_SECRET not set, using empty value");
                String::new()
            }),
            signaling_token_ttl_seconds: parse_or(
                "SIGNALING_TOKEN_TTL_SECONDS",
                defaults.signaling_token_ttl_seconds,
            ),
            signaling_issuer_url: env::var("SIGNALING_ISSUER_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            audit_queue_capacity: parse_or("AUDIT_QUEUE_CAPACITY", defaults.audit_queue_capacity),
            audit_workers: parse_or("AUDIT_WORKERS", defaults.audit_workers),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.jwt_secret.is_empty() && !self.signaling_token_secret.is_empty()
    }

    pub fn uses_remote_signaling(&self) -> bool {
        self.signaling_issuer_url.is_some()
    }
}

fn parse_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
