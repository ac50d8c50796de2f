use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{InMemoryStore, Repositories};
use shared_models::auth::{User, UserAccount, UserRole};

use crate::clock::FixedClock;
use crate::locks::KeyedLocks;

pub struct TestConfig {
    pub jwt_secret: String,
    pub signaling_token_secret: String,
    pub upload_dir: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            signaling_token_secret: "test-signaling-secret".to_string(),
            upload_dir: std::env::temp_dir()
                .join("consultation-uploads")
                .to_string_lossy()
                .into_owned(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            jwt_secret: self.jwt_secret.clone(),
            signaling_token_secret: self.signaling_token_secret.clone(),
            upload_dir: self.upload_dir.clone(),
            audit_workers: 1,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", "patient")
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn from_account(account: &UserAccount) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            role: account.role.to_string(),
        }
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id.to_string(),
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Seeded in-memory world: two patients, two doctors, one admin and a clock
/// frozen at 08:00 UTC on the fixture day.
pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub repos: Repositories,
    pub clock: Arc<FixedClock>,
    pub doctor_locks: Arc<KeyedLocks>,
    pub config: Arc<AppConfig>,
    pub patient: UserAccount,
    pub other_patient: UserAccount,
    pub doctor: UserAccount,
    pub other_doctor: UserAccount,
    pub admin: UserAccount,
}

impl Fixture {
    pub fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 3, 4).expect("valid fixture date")
    }

    pub async fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());

        let patient = UserAccount::new("patient@clinic.test", "Pat Patient", UserRole::Patient);
        let other_patient = UserAccount::new("other.patient@clinic.test", "Olive Other", UserRole::Patient);
        let doctor = UserAccount::new("doctor@clinic.test", "Dana Doctor", UserRole::Doctor);
        let other_doctor = UserAccount::new("other.doctor@clinic.test", "Omar Other", UserRole::Doctor);
        let admin = UserAccount::new("admin@clinic.test", "Ada Admin", UserRole::Admin);

        for account in [&patient, &other_patient, &doctor, &other_doctor, &admin] {
            store
                .insert_user(account.clone())
                .await
                .expect("seed user");
        }

        Self {
            repos: Repositories::in_memory(store.clone()),
            store,
            clock: Arc::new(FixedClock::new(Self::at(8, 0))),
            doctor_locks: Arc::new(KeyedLocks::new()),
            config: TestConfig::default().to_arc(),
            patient,
            other_patient,
            doctor,
            other_doctor,
            admin,
        }
    }

    /// Instant on the fixture day.
    pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        let naive = Self::day()
            .and_hms_opt(hour, minute, 0)
            .expect("valid fixture time");
        Utc.from_utc_datetime(&naive)
    }

    pub fn user(account: &UserAccount) -> User {
        TestUser::from_account(account).to_user()
    }

    pub fn token(&self, account: &UserAccount) -> String {
        JwtTestUtils::create_test_token(&TestUser::from_account(account), &self.config.jwt_secret, Some(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_database::UserDirectory;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default().to_app_config();

        assert!(!config.jwt_secret.is_empty());
        assert!(config.is_configured());
        assert_eq!(config.audit_workers, 1);
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("doc@example.com");
        assert_eq!(user.email, "doc@example.com");
        assert_eq!(user.role, "doctor");

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.role, Some(user.role.clone()));
        assert_eq!(user_model.id, user.id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_test_token(&user, "test-secret", Some(1));

        assert_eq!(token.split('.').count(), 3);
    }

    #[tokio::test]
    async fn fixture_seeds_directory() {
        let fixture = Fixture::new().await;
        let found = fixture
            .repos
            .users
            .find_by_email("DOCTOR@clinic.test")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, fixture.doctor.id);
        assert_eq!(Fixture::at(10, 0).to_rfc3339(), "2030-03-04T10:00:00+00:00");
    }
}
