pub mod pipeline;
pub mod query;
pub mod sink;

pub use pipeline::{AuditPipeline, AuditWorkers};
pub use query::AuditQueryService;
pub use sink::{AuditSink, NoopAuditSink, RecordingAuditSink};
