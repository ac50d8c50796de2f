use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;
mod state;

use audit_cell::services::AuditPipeline;
use shared_config::AppConfig;
use shared_database::{InMemoryStore, Repositories};
use shared_utils::clock::{Clock, SystemClock};

use crate::state::CellStates;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting consultation API server");

    let config = Arc::new(AppConfig::from_env());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let repos = Repositories::in_memory(Arc::new(InMemoryStore::new()));

    let (pipeline, audit_workers) = AuditPipeline::start(
        repos.audit.clone(),
        clock.clone(),
        config.audit_queue_capacity,
        config.audit_workers,
    );
    info!("Audit pipeline running with {} workers", audit_workers.len());

    let states = CellStates::build(config.clone(), &repos, Arc::new(pipeline), clock)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(&states, &config.upload_dir)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // The router owned the remaining pipeline handles; draining lets the
    // workers flush what is queued.
    drop(states);
    audit_workers.join().await;
    info!("Audit pipeline drained, exiting");

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
