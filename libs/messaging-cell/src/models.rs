use serde::{Deserialize, Serialize};

use shared_models::consultation::Message;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;

pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;
pub const ALLOWED_ATTACHMENT_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "application/pdf"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub body: String,
    pub attachment_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListMessagesQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<Message>,
    pub count: usize,
    pub limit: usize,
    pub offset: usize,
}
