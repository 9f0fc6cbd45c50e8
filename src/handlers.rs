// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the admission gate service.
//!
//! `/health` and `/healthz` report liveness, `POST /check` answers
//! external-auth queries from a reverse proxy, `GET /metrics` renders the
//! Prometheus exposition, and `POST /submit` is a guarded intake route that
//! runs the schema validator behind the admission layer.

use crate::limiter::{AdmissionEngine, Verdict};
use crate::metrics::Metrics;
use crate::validator::SchemaValidator;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Shared application state.
pub struct AppState {
    pub engine: Arc<AdmissionEngine>,
    pub validator: SchemaValidator,
    pub metrics: Arc<Metrics>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Admission check request (for external validation).
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub key: Option<String>,
}

/// Admission check response.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Accepted-submission response.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub accepted: bool,
}

/// Failed-validation response body.
#[derive(Debug, Serialize)]
pub struct ValidationFailure {
    pub errors: Vec<String>,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "admission-gate",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Admission verdict for an external caller.
///
/// This endpoint is called by Envoy or another reverse proxy to decide
/// whether a request should be forwarded. It always answers 200 so the
/// proxy can read the body; `allowed` carries the verdict.
pub async fn check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckRequest>,
) -> Json<CheckResponse> {
    let verdict = state
        .engine
        .decide_client(req.key.as_deref(), Instant::now());
    state.metrics.record_decision(&verdict);
    let retry_after_secs = verdict.retry_after_secs();

    match verdict {
        Verdict::Allow { remaining } => {
            debug!(key = ?req.key, remaining, "check allowed");
            Json(CheckResponse {
                allowed: true,
                remaining: Some(remaining),
                retry_after_secs: None,
                message: None,
            })
        }
        Verdict::Deny { message, .. } => {
            info!(key = ?req.key, retry_after_secs, "check denied");
            Json(CheckResponse {
                allowed: false,
                remaining: None,
                retry_after_secs,
                message: Some(message),
            })
        }
    }
}

/// Guarded intake route.
///
/// Admission control runs in the layer mounted in front of this handler;
/// here the body is checked against the configured field schema and either
/// accepted or answered with every violation found. With no schema
/// configured the validation pass is skipped entirely.
pub async fn submit(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> Response {
    if !state.validator.is_vacuous() {
        let errors = state.validator.validate(&body);
        if !errors.is_empty() {
            info!(violations = errors.len(), "submission failed validation");
            return (
                StatusCode::BAD_REQUEST,
                Json(ValidationFailure {
                    errors: errors.iter().map(ToString::to_string).collect(),
                }),
            )
                .into_response();
        }
    }

    (StatusCode::OK, Json(SubmitResponse { accepted: true })).into_response()
}

/// Prometheus text exposition.
pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> Response {
    state
        .metrics
        .tracked_keys
        .set(state.engine.tracked_keys() as i64);

    match state.metrics.render() {
        Ok(text) => text.into_response(),
        Err(err) => {
            warn!(error = %err, "failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
