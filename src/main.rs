// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admission Gate Service
//!
//! A per-client request admission service: each client key gets a fixed
//! counting window, and requests beyond the configured budget are rejected
//! until the window resets.
//!
//! ## Usage
//!
//! The service provides two modes of operation:
//!
//! 1. **External auth service**: Envoy or another proxy calls `POST /check`
//!    with a client key and reads the verdict from the body.
//!
//! 2. **Inline gate**: requests are sent directly through the service; the
//!    admission layer in front of `POST /submit` answers 429 once a
//!    client's budget is spent.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `MAX_REQUESTS`: Request budget per window per client (default: 20)
//! - `WINDOW_SECS`: Window length in seconds (default: 900)
//! - `REJECTION_MESSAGE`: Body text for denied requests
//! - `UNKNOWN_KEY_POLICY`: `shared_bucket` or `reject` (default: shared_bucket)
//! - `SWEEP_INTERVAL_SECS`: Idle-entry sweep cadence (default: 60)
//! - `IDLE_GRACE_SECS`: Idle age before eviction (default: 2 x window)
//!
//! plus the validation and access-log variables documented in the config
//! module (`VALIDATION_SCHEMA`, `REDACT_FIELDS`, `LOG_TO_FILE`, ...).

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use admission_gate::{
    config::Config,
    handlers::{check, health, metrics_endpoint, submit, AppState},
    limiter::AdmissionEngine,
    metrics::Metrics,
    middleware::{AdmissionLayer, RequestLogLayer},
    validator::SchemaValidator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        max_requests = config.admission.max_requests,
        window_secs = config.admission.window_secs,
        sweep_interval_secs = config.admission.sweep_interval_secs,
        unknown_key_policy = %config.admission.unknown_key_policy,
        "Starting admission gate"
    );

    // Create application state
    let engine = Arc::new(AdmissionEngine::new(config.admission.clone()));
    let metrics = Arc::new(Metrics::new()?);
    let validator = SchemaValidator::new(config.validation.clone());

    let state = Arc::new(AppState {
        engine: engine.clone(),
        validator,
        metrics: metrics.clone(),
    });

    // Spawn sweep task
    let sweep_engine = engine.clone();
    let sweep_metrics = metrics.clone();
    let sweep_interval = config.admission.sweep_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            let removed = sweep_engine.sweep(Instant::now());
            sweep_metrics.swept_entries.inc_by(removed as u64);
            sweep_metrics
                .tracked_keys
                .set(sweep_engine.tracked_keys() as i64);
        }
    });

    // Build router. The admission layer guards only /submit; the access log
    // wraps every route, so denials still produce a record.
    let admission = AdmissionLayer::new(engine.clone()).with_metrics(metrics.clone());
    let request_log =
        RequestLogLayer::new(config.access_log.clone()).with_metrics(metrics.clone());

    let mut app = Router::new()
        .route("/submit", post(submit))
        .route_layer(admission)
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/check", post(check));
    if config.metrics.enabled {
        app = app.route(&config.metrics.path, get(metrics_endpoint));
    }
    let app = app
        .layer(request_log)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Admission gate stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
