use std::sync::Arc;

use anyhow::Context;

use appointment_cell::handlers::AppointmentState;
use appointment_cell::services::{AppointmentBookingService, AppointmentLifecycleService, SchedulingLocks};
use audit_cell::handlers::AuditState;
use audit_cell::services::{AuditQueryService, AuditSink};
use doctor_cell::handlers::SlotState;
use doctor_cell::services::SlotService;
use messaging_cell::handlers::ChatState;
use messaging_cell::services::{ChatService, LocalAttachmentStore};
use prescription_cell::handlers::PrescriptionState;
use prescription_cell::services::PrescriptionService;
use shared_config::AppConfig;
use shared_database::Repositories;
use shared_utils::clock::Clock;
use video_conferencing_cell::handlers::VideoState;
use video_conferencing_cell::models::IceServer;
use video_conferencing_cell::services::{issuer_from_config, VideoSessionService};

/// Per-cell router state, all wired to the same repositories, locks, audit
/// sink and clock.
pub struct CellStates {
    pub slots: Arc<SlotState>,
    pub appointments: Arc<AppointmentState>,
    pub chat: Arc<ChatState>,
    pub prescriptions: Arc<PrescriptionState>,
    pub video: Arc<VideoState>,
    pub audit: Arc<AuditState>,
}

impl CellStates {
    pub fn build(
        config: Arc<AppConfig>,
        repos: &Repositories,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let locks = Arc::new(SchedulingLocks::new());

        let slots = Arc::new(SlotService::new(
            repos,
            locks.doctor_locks(),
            audit.clone(),
            clock.clone(),
        ));
        let booking = Arc::new(AppointmentBookingService::new(
            repos,
            locks.clone(),
            audit.clone(),
            clock.clone(),
        ));
        let lifecycle = Arc::new(AppointmentLifecycleService::new(
            repos,
            locks.clone(),
            audit.clone(),
            clock.clone(),
        ));

        let attachments = LocalAttachmentStore::new(config.upload_dir.as_str())
            .context("failed to prepare attachment store")?;
        let chat = Arc::new(ChatService::new(
            repos,
            Arc::new(attachments),
            audit.clone(),
            clock.clone(),
        ));

        let prescriptions = Arc::new(PrescriptionService::new(
            repos,
            locks.clone(),
            audit.clone(),
            clock.clone(),
        ));

        let issuer = issuer_from_config(&config, clock.clone())
            .context("failed to configure signaling token issuer")?;
        let video = Arc::new(VideoSessionService::new(
            repos,
            locks,
            issuer,
            IceServer::from_config(&config),
            audit,
            clock,
        ));

        let queries = Arc::new(AuditQueryService::new(repos.audit.clone(), repos.users.clone()));

        Ok(Self {
            slots: Arc::new(SlotState {
                config: config.clone(),
                slots,
            }),
            appointments: Arc::new(AppointmentState {
                config: config.clone(),
                booking,
                lifecycle,
            }),
            chat: Arc::new(ChatState {
                config: config.clone(),
                chat,
            }),
            prescriptions: Arc::new(PrescriptionState {
                config: config.clone(),
                prescriptions,
            }),
            video: Arc::new(VideoState {
                config: config.clone(),
                sessions: video,
            }),
            audit: Arc::new(AuditState { config, queries }),
        })
    }
}
