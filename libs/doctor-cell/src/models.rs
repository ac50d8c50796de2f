use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shared_models::scheduling::{Slot, SlotStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlotRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Absent fields leave the slot unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSlotRequest {
    pub status: Option<SlotStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AvailableSlotsQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct SlotListResponse {
    pub slots: Vec<Slot>,
    pub count: usize,
}

impl From<Vec<Slot>> for SlotListResponse {
    fn from(slots: Vec<Slot>) -> Self {
        Self {
            count: slots.len(),
            slots,
        }
    }
}
