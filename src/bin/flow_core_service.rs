//! Flow Core Service Binary
//!
//! Runs Flow Core as an HTTP service:
//! - Structured logging (JSON or pretty)
//! - Per-request metrics logging
//! - Graceful shutdown on Ctrl+C / SIGTERM
//! - Health, liveness, and readiness endpoints
//!
//! ## Configuration
//!
//! Environment variables (see [`flow_core::config::Config::from_env`] for the
//! pipeline-tuning ones):
//! - `PORT`: service port (default: 8080)
//! - `HOST`: service host (default: 0.0.0.0)
//! - `RUST_LOG`: log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! PORT=8080 cargo run --bin flow_core_service --features service
//! ```

use std::net::SocketAddr;

use axum::middleware as axum_middleware;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use flow_core::config::Config;
use flow_core::service::{create_router, metrics_middleware, ServiceState};

fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "flow_core_service=info,tower_http=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_span_events(FmtSpan::CLOSE))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true),
            )
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => info!("received SIGTERM, initiating graceful shutdown"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let version = env!("CARGO_PKG_VERSION");
    info!(version, "starting Flow Core Service");

    let port: u16 = std::env::var("PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(8080);
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

    let config = Config::from_env();
    info!(
        queue_capacity = config.queue.capacity,
        worker_count = config.worker.count,
        trace_ttl_secs = config.trace.ttl.as_secs(),
        "configuration loaded"
    );
    if config.trace.unmerged_hard_bound < config.trace.ttl {
        warn!("trace unmerged_hard_bound is shorter than ttl; unmerged traces will be evicted before merged ones");
    }

    let state = ServiceState::from_env();

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let app = create_router(state)
        .layer(axum_middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!(address = %addr, version, "Flow Core Service listening");

    let listener = TcpListener::bind(addr).await?;

    info!("ready to accept connections");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Flow Core Service shutdown complete");
    Ok(())
}
