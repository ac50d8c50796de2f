pub mod attachments;
pub mod chat;

pub use attachments::{AttachmentStore, LocalAttachmentStore};
pub use chat::ChatService;
