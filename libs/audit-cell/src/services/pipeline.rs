use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use shared_database::AuditRepository;
use shared_models::audit::AuditRecord;
use shared_utils::clock::Clock;

use crate::models::AuditEvent;
use crate::services::sink::AuditSink;

/// Bounded queue in front of the audit repository.
///
/// Events are stamped with the clock at `record` time, mirrored to tracing and
/// handed to the worker pool. A full queue drops the event.
pub struct AuditPipeline {
    sender: mpsc::Sender<AuditRecord>,
    clock: Arc<dyn Clock>,
}

/// Worker pool draining the pipeline. Workers stop once every
/// `AuditPipeline` handle has been dropped and the queue is empty.
pub struct AuditWorkers {
    handles: Vec<JoinHandle<()>>,
}

impl AuditPipeline {
    pub fn start(
        repository: Arc<dyn AuditRepository>,
        clock: Arc<dyn Clock>,
        capacity: usize,
        workers: usize,
    ) -> (Self, AuditWorkers) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|i| {
                let receiver = receiver.clone();
                let repository = repository.clone();
                tokio::spawn(worker_loop(format!("audit-worker-{}", i), receiver, repository))
            })
            .collect();

        info!("Audit pipeline started with capacity {} and {} workers", capacity, workers.max(1));
        (Self { sender, clock }, AuditWorkers { handles })
    }

    fn log_to_tracing(record: &AuditRecord) {
        info!(
            audit_id = %record.id,
            actor_id = ?record.actor_id,
            entity_type = %record.entity_type,
            entity_id = %record.entity_id,
            metadata = %record.metadata,
            "AUDIT: {}", record.action
        );
    }
}

impl AuditSink for AuditPipeline {
    fn record(&self, event: AuditEvent) {
        let record = event.into_record(self.clock.now());
        Self::log_to_tracing(&record);

        match self.sender.try_send(record) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(record)) => {
                warn!("Audit queue full, dropping event {} ({})", record.id, record.action);
            }
            Err(mpsc::error::TrySendError::Closed(record)) => {
                warn!("Audit workers stopped, dropping event {} ({})", record.id, record.action);
            }
        }
    }
}

impl AuditWorkers {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every worker to drain the queue and exit.
    pub async fn join(self) {
        for result in join_all(self.handles).await {
            if let Err(e) = result {
                warn!("Audit worker terminated abnormally: {}", e);
            }
        }
    }
}

async fn worker_loop(
    worker_name: String,
    receiver: Arc<Mutex<mpsc::Receiver<AuditRecord>>>,
    repository: Arc<dyn AuditRepository>,
) {
    debug!("Worker loop started: {}", worker_name);

    loop {
        let next = receiver.lock().await.recv().await;
        let Some(record) = next else {
            break;
        };

        if let Err(e) = repository.append(record.clone()).await {
            error!(
                "Worker {} failed to persist audit event {} ({}): {}",
                worker_name, record.id, record.action, e
            );
        }
    }

    debug!("Worker loop ended: {}", worker_name);
}
