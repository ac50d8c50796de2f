use serde::{Deserialize, Serialize};

use shared_models::consultation::{Prescription, PrescriptionItem};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub items: Vec<PrescriptionItem>,
    #[serde(default)]
    pub notes: String,
}

/// `items`, when present, replaces the whole list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePrescriptionRequest {
    pub items: Option<Vec<PrescriptionItem>>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PrescriptionListResponse {
    pub prescriptions: Vec<Prescription>,
    pub count: usize,
}
