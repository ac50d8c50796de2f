use serde::{Deserialize, Serialize};
use tracing::error;

use shared_models::consultation::PrescriptionItem;
use shared_models::error::ServiceError;

/// Persisted form of a prescription's item list:
/// `{"version":1,"items":[...]}`.
pub struct PrescriptionItemsCodec;

#[derive(Serialize, Deserialize)]
struct ItemsEnvelope {
    version: u32,
    items: Vec<PrescriptionItem>,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

impl PrescriptionItemsCodec {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn encode(items: &[PrescriptionItem]) -> Result<String, ServiceError> {
        serde_json::to_string(&ItemsEnvelope {
            version: Self::CURRENT_VERSION,
            items: items.to_vec(),
        })
        .map_err(|e| ServiceError::Internal(format!("failed to encode prescription items: {}", e)))
    }

    pub fn decode(document: &str) -> Result<Vec<PrescriptionItem>, ServiceError> {
        let header: VersionHeader = serde_json::from_str(document).map_err(|e| {
            error!("Unreadable prescription items document: {}", e);
            ServiceError::Internal("invalid prescription items format".to_string())
        })?;

        if header.version != Self::CURRENT_VERSION {
            return Err(ServiceError::Internal(format!(
                "unsupported prescription items version {}",
                header.version
            )));
        }

        let envelope: ItemsEnvelope = serde_json::from_str(document).map_err(|e| {
            error!("Malformed version {} prescription items: {}", header.version, e);
            ServiceError::Internal("invalid prescription items format".to_string())
        })?;
        Ok(envelope.items)
    }
}
