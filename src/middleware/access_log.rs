// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Access logging middleware.
//!
//! Emits one structured record per request after the inner service has
//! answered: method, path, status, duration, client key and an RFC 3339
//! timestamp. When body capture is enabled, small JSON request bodies are
//! buffered, attached to the record with configured fields masked, and
//! replayed to the inner service unchanged. Records can additionally be
//! appended to a JSON-lines file; sink failures are logged and dropped so
//! observability never fails a request.

use crate::config::AccessLogConfig;
use crate::metrics::Metrics;
use crate::middleware::client_key;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::{error, info, warn};

/// Bodies above this size are passed through without being captured.
const BODY_CAPTURE_LIMIT: usize = 16 * 1024;

/// Layer that wraps routes with per-request access logging.
#[derive(Clone)]
pub struct RequestLogLayer {
    config: Arc<AccessLogConfig>,
    metrics: Option<Arc<Metrics>>,
}

impl RequestLogLayer {
    pub fn new(config: AccessLogConfig) -> Self {
        Self {
            config: Arc::new(config),
            metrics: None,
        }
    }

    /// Record request durations on the given metrics.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogService {
            inner,
            config: self.config.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

/// Middleware service produced by [`RequestLogLayer`].
#[derive(Clone)]
pub struct RequestLogService<S> {
    inner: S,
    config: Arc<AccessLogConfig>,
    metrics: Option<Arc<Metrics>>,
}

impl<S> Service<Request<Body>> for RequestLogService<S>
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
        let config = self.config.clone();
        let metrics = self.metrics.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let start = Instant::now();
            let method = request.method().clone();
            let path = request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_owned())
                .unwrap_or_else(|| request.uri().path().to_owned());
            let client = client_key(&request);

            let (request, body) = if should_capture(&config, &request) {
                capture_json_body(request).await
            } else {
                (request, None)
            };
            let body = body.map(|mut value| {
                redact_fields(&mut value, &config.redact);
                value
            });

            let response = inner.call(request).await?;

            let elapsed = start.elapsed();
            if let Some(metrics) = &metrics {
                metrics.request_duration.observe(elapsed.as_secs_f64());
            }
            let record = AccessRecord {
                method: method.as_str(),
                path: &path,
                status: response.status().as_u16(),
                duration_ms: elapsed.as_millis() as u64,
                client: client.as_deref(),
                body,
                timestamp: Utc::now().to_rfc3339(),
            };
            emit(&record);
            if config.log_to_file {
                append_to_file(&config.log_file_path, &record);
            }

            Ok(response)
        })
    }
}

/// One line of the access log.
#[derive(Debug, Serialize)]
struct AccessRecord<'a> {
    method: &'a str,
    path: &'a str,
    status: u16,
    duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    client: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
    timestamp: String,
}

/// Only bounded JSON bodies are buffered. A body without a declared
/// length, or larger than [`BODY_CAPTURE_LIMIT`], passes through
/// unread.
fn should_capture(config: &AccessLogConfig, request: &Request<Body>) -> bool {
    if !config.capture_request_bodies {
        return false;
    }
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/json"))
        .unwrap_or(false);
    if !is_json {
        return false;
    }
    request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok())
        .map(|length| length <= BODY_CAPTURE_LIMIT)
        .unwrap_or(false)
}

async fn capture_json_body(request: Request<Body>) -> (Request<Body>, Option<Value>) {
    let (parts, body) = request.into_parts();
    match axum::body::to_bytes(body, BODY_CAPTURE_LIMIT).await {
        Ok(bytes) => {
            let value = serde_json::from_slice(&bytes).ok();
            (Request::from_parts(parts, Body::from(bytes)), value)
        }
        Err(err) => {
            warn!(error = %err, "failed to buffer request body for logging");
            (Request::from_parts(parts, Body::empty()), None)
        }
    }
}

/// Replace listed top-level fields with `"***"`. Absent fields and
/// non-object bodies are left as they are.
fn redact_fields(value: &mut Value, keys: &[String]) {
    if let Value::Object(map) = value {
        for key in keys {
            if let Some(slot) = map.get_mut(key) {
                *slot = Value::String("***".to_owned());
            }
        }
    }
}

fn emit(record: &AccessRecord<'_>) {
    if record.status >= 500 {
        error!(
            method = record.method,
            path = record.path,
            status = record.status,
            duration_ms = record.duration_ms,
            client = record.client,
            "request served"
        );
    } else if record.status >= 400 {
        warn!(
            method = record.method,
            path = record.path,
            status = record.status,
            duration_ms = record.duration_ms,
            client = record.client,
            "request served"
        );
    } else {
        info!(
            method = record.method,
            path = record.path,
            status = record.status,
            duration_ms = record.duration_ms,
            client = record.client,
            "request served"
        );
    }
}

fn append_to_file(path: &str, record: &AccessRecord<'_>) {
    let line = match serde_json::to_string(record) {
        Ok(line) => line,
        Err(err) => {
            warn!(error = %err, "failed to serialize access record");
            return;
        }
    };
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| writeln!(file, "{line}"));
    if let Err(err) = result {
        warn!(error = %err, path, "failed to append access record");
    }
}
