use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use appointment_cell::services::AccessGuard;
use audit_cell::models::{actions, AuditEvent};
use audit_cell::services::AuditSink;
use shared_database::{MessageRepository, Repositories};
use shared_models::consultation::Message;
use shared_models::error::ServiceError;
use shared_utils::clock::Clock;

use crate::models::{
    SendMessageRequest, ALLOWED_ATTACHMENT_TYPES, DEFAULT_PAGE_SIZE, MAX_ATTACHMENT_BYTES, MAX_PAGE_SIZE,
};
use crate::services::attachments::AttachmentStore;

pub struct ChatService {
    messages: Arc<dyn MessageRepository>,
    guard: AccessGuard,
    attachments: Arc<dyn AttachmentStore>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl ChatService {
    pub fn new(
        repos: &Repositories,
        attachments: Arc<dyn AttachmentStore>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            messages: repos.messages.clone(),
            guard: AccessGuard::new(repos.appointments.clone()),
            attachments,
            audit,
            clock,
        }
    }

    #[instrument(skip(self, request))]
    pub async fn send_message(
        &self,
        appointment_id: Uuid,
        sender_id: Uuid,
        request: SendMessageRequest,
    ) -> Result<Message, ServiceError> {
        self.guard.authorize(appointment_id, sender_id).await?;

        let attachment_url = request.attachment_url.filter(|url| !url.trim().is_empty());
        if request.body.trim().is_empty() && attachment_url.is_none() {
            return Err(ServiceError::validation("message body cannot be empty"));
        }

        let message = self
            .messages
            .insert(Message {
                id: Uuid::new_v4(),
                appointment_id,
                sender_user_id: sender_id,
                body: request.body,
                attachment_url,
                read_at: None,
                created_at: self.clock.now(),
            })
            .await?;

        debug!("Message {} sent on appointment {}", message.id, appointment_id);
        self.audit.record(
            AuditEvent::new(actions::MESSAGE_SEND, "message", message.id)
                .by(sender_id)
                .with("appointment_id", appointment_id.to_string())
                .with("has_attachment", message.attachment_url.is_some()),
        );

        Ok(message)
    }

    /// Newest first. `limit` defaults to 50 and is capped at 200.
    pub async fn list_messages(
        &self,
        appointment_id: Uuid,
        actor_id: Uuid,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Message>, ServiceError> {
        self.guard.authorize(appointment_id, actor_id).await?;

        let limit = page_size(limit);
        Ok(self
            .messages
            .list_by_appointment(appointment_id, limit, offset.unwrap_or(0))
            .await?)
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_attachment(
        &self,
        appointment_id: Uuid,
        actor_id: Uuid,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, ServiceError> {
        self.guard.authorize(appointment_id, actor_id).await?;

        if bytes.is_empty() {
            return Err(ServiceError::validation("file is required"));
        }
        if bytes.len() > MAX_ATTACHMENT_BYTES {
            return Err(ServiceError::validation("file size must be less than 10MB"));
        }
        if !ALLOWED_ATTACHMENT_TYPES.contains(&content_type) {
            return Err(ServiceError::validation(
                "only JPEG, PNG, GIF images and PDF files are allowed",
            ));
        }

        let prefix = format!("{}_{}", appointment_id, self.clock.now().timestamp());
        let url = self.attachments.save(&prefix, filename, bytes).await?;

        info!("Attachment uploaded for appointment {}: {}", appointment_id, url);
        Ok(url)
    }

    /// Marks every unread message from the other participant as read and
    /// returns how many changed.
    #[instrument(skip(self))]
    pub async fn mark_read(&self, appointment_id: Uuid, actor_id: Uuid) -> Result<usize, ServiceError> {
        let appointment = self.guard.authorize(appointment_id, actor_id).await?;
        let Some(counterpart) = appointment.counterpart_of(actor_id) else {
            return Err(ServiceError::forbidden("not a participant of this appointment"));
        };

        let flipped = self
            .messages
            .mark_read_from_sender(appointment_id, counterpart, self.clock.now())
            .await?;

        if flipped > 0 {
            self.audit.record(
                AuditEvent::new(actions::MESSAGE_MARK_READ, "appointment", appointment_id)
                    .by(actor_id)
                    .with("count", flipped),
            );
        }

        Ok(flipped)
    }

    pub async fn unread_count(&self, appointment_id: Uuid, actor_id: Uuid) -> Result<usize, ServiceError> {
        let appointment = self.guard.authorize(appointment_id, actor_id).await?;
        let Some(counterpart) = appointment.counterpart_of(actor_id) else {
            return Err(ServiceError::forbidden("not a participant of this appointment"));
        };

        Ok(self
            .messages
            .count_unread_from_sender(appointment_id, counterpart)
            .await?)
    }
}

pub fn page_size(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}
