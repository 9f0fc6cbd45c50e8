// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admission enforcement middleware.
//!
//! Mounts an [`AdmissionEngine`] in front of a route: the client key is
//! derived from request context, the engine is consulted once, and a
//! denial is answered with `429 Too Many Requests` without ever calling
//! the inner service. Allowed responses carry `X-RateLimit-Remaining`.

use crate::limiter::{AdmissionEngine, Verdict, UNKNOWN_KEY};
use crate::metrics::Metrics;
use crate::middleware::client_key;
use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::info;

/// Layer that guards routes with a shared [`AdmissionEngine`].
#[derive(Clone)]
pub struct AdmissionLayer {
    engine: Arc<AdmissionEngine>,
    metrics: Option<Arc<Metrics>>,
}

impl AdmissionLayer {
    pub fn new(engine: Arc<AdmissionEngine>) -> Self {
        Self {
            engine,
            metrics: None,
        }
    }

    /// Count verdicts on the given metrics as a side effect of each
    /// decision.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl<S> Layer<S> for AdmissionLayer {
    type Service = AdmissionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AdmissionService {
            inner,
            engine: self.engine.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

/// Middleware service produced by [`AdmissionLayer`].
#[derive(Clone)]
pub struct AdmissionService<S> {
    inner: S,
    engine: Arc<AdmissionEngine>,
    metrics: Option<Arc<Metrics>>,
}

impl<S> Service<Request<Body>> for AdmissionService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let engine = self.engine.clone();
        let metrics = self.metrics.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let key = client_key(&request);
            let verdict = engine.decide_client(key.as_deref(), Instant::now());
            if let Some(metrics) = &metrics {
                metrics.record_decision(&verdict);
            }
            let retry_after_secs = verdict.retry_after_secs();

            match verdict {
                Verdict::Allow { remaining } => {
                    let mut response = inner.call(request).await?;
                    response.headers_mut().insert(
                        HeaderName::from_static("x-ratelimit-remaining"),
                        HeaderValue::from(remaining),
                    );
                    Ok(response)
                }
                Verdict::Deny { message, .. } => {
                    info!(
                        client = key.as_deref().unwrap_or(UNKNOWN_KEY),
                        "request rejected by admission control"
                    );
                    Ok(too_many_requests(message, retry_after_secs))
                }
            }
        })
    }
}

/// Rejection body for the wire-level 429.
#[derive(Debug, Serialize)]
struct RejectionBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_secs: Option<u64>,
}

fn too_many_requests(message: String, retry_after_secs: Option<u64>) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(RejectionBody {
            error: message,
            retry_after_secs,
        }),
    )
        .into_response();

    if let Some(secs) = retry_after_secs {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(secs));
    }

    response
}
