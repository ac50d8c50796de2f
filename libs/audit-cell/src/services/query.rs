use std::sync::Arc;

use tracing::{debug, instrument};
use uuid::Uuid;

use shared_database::{AuditRepository, UserDirectory};
use shared_models::audit::{AuditFilter, AuditRecord};
use shared_models::auth::UserRole;
use shared_models::error::ServiceError;

pub struct AuditQueryService {
    audit: Arc<dyn AuditRepository>,
    users: Arc<dyn UserDirectory>,
}

impl AuditQueryService {
    pub fn new(audit: Arc<dyn AuditRepository>, users: Arc<dyn UserDirectory>) -> Self {
        Self { audit, users }
    }

    /// Whole log. Admins only.
    #[instrument(skip(self, filter))]
    pub async fn list(&self, filter: AuditFilter, actor_id: Uuid) -> Result<Vec<AuditRecord>, ServiceError> {
        self.require_admin(actor_id).await?;
        Ok(self.audit.query(&filter).await?)
    }

    /// Records performed by `target_id`. Allowed for that user and for admins.
    #[instrument(skip(self, filter))]
    pub async fn list_for_user(
        &self,
        target_id: Uuid,
        filter: AuditFilter,
        actor_id: Uuid,
    ) -> Result<Vec<AuditRecord>, ServiceError> {
        if target_id != actor_id {
            self.require_admin(actor_id).await?;
        }

        let filter = AuditFilter {
            actor_id: Some(target_id),
            ..filter
        };
        Ok(self.audit.query(&filter).await?)
    }

    #[instrument(skip(self))]
    pub async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
        actor_id: Uuid,
    ) -> Result<Vec<AuditRecord>, ServiceError> {
        self.require_admin(actor_id).await?;

        let filter = AuditFilter {
            entity_type: Some(entity_type.to_string()),
            entity_id: Some(entity_id.to_string()),
            ..AuditFilter::default()
        };
        Ok(self.audit.query(&filter).await?)
    }

    async fn require_admin(&self, actor_id: Uuid) -> Result<(), ServiceError> {
        let is_admin = self
            .users
            .find_by_id(actor_id)
            .await?
            .map(|account| account.has_role(UserRole::Admin))
            .unwrap_or(false);

        if !is_admin {
            debug!("User {} denied access to the audit log", actor_id);
            return Err(ServiceError::forbidden("audit log is restricted to administrators"));
        }
        Ok(())
    }
}
