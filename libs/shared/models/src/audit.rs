use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditRecord {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub metadata: serde_json::Value,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditFilter {
    pub actor_id: Option<Uuid>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub action: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AuditFilter {
    pub fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(actor_id) = self.actor_id {
            if record.actor_id != Some(actor_id) {
                return false;
            }
        }
        if let Some(entity_type) = &self.entity_type {
            if &record.entity_type != entity_type {
                return false;
            }
        }
        if let Some(entity_id) = &self.entity_id {
            if &record.entity_id != entity_id {
                return false;
            }
        }
        if let Some(action) = &self.action {
            if &record.action != action {
                return false;
            }
        }
        if let Some(from) = self.from {
            if record.at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if record.at > to {
                return false;
            }
        }
        true
    }
}
