use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use shared_models::audit::{AuditFilter, AuditRecord};

/// A mutation worth remembering, before it is stamped and queued.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub metadata: Map<String, Value>,
}

impl AuditEvent {
    pub fn new(action: &str, entity_type: &str, entity_id: impl ToString) -> Self {
        Self {
            actor_id: None,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            metadata: Map::new(),
        }
    }

    pub fn by(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn into_record(self, at: DateTime<Utc>) -> AuditRecord {
        AuditRecord {
            id: Uuid::new_v4(),
            actor_id: self.actor_id,
            action: self.action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            metadata: Value::Object(self.metadata),
            at,
        }
    }
}

/// Query-string form of an audit filter.
#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub action: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl From<AuditLogQuery> for AuditFilter {
    fn from(query: AuditLogQuery) -> Self {
        AuditFilter {
            actor_id: None,
            entity_type: query.entity_type,
            entity_id: query.entity_id,
            action: query.action,
            from: query.from,
            to: query.to,
            limit: query.limit,
            offset: query.offset,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuditLogPage {
    pub records: Vec<AuditRecord>,
    pub count: usize,
}

pub mod actions {
    pub const APPOINTMENT_CREATE: &str = "appointment.create";
    pub const APPOINTMENT_STATUS_CHANGE: &str = "appointment.status_change";
    pub const SLOT_CREATE: &str = "slot.create";
    pub const SLOT_UPDATE: &str = "slot.update";
    pub const SLOT_DELETE: &str = "slot.delete";
    pub const MESSAGE_SEND: &str = "message.send";
    pub const MESSAGE_MARK_READ: &str = "message.mark_read";
    pub const PRESCRIPTION_CREATE: &str = "prescription.create";
    pub const PRESCRIPTION_UPDATE: &str = "prescription.update";
    pub const PRESCRIPTION_DELETE: &str = "prescription.delete";
    pub const VIDEO_SESSION_CREATE: &str = "video_session.create";
    pub const VIDEO_SESSION_START: &str = "video_session.start";
    pub const VIDEO_SESSION_END: &str = "video_session.end";
}
