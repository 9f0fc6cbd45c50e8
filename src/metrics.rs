// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for the admission gate.
//!
//! All metrics hang off one owned [`Registry`] so embedding applications
//! can run several gates without collisions; nothing registers globally.

use crate::limiter::Verdict;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Registry and instruments for one admission gate instance.
pub struct Metrics {
    registry: Registry,
    /// Admission decisions by verdict (`allow` / `deny`).
    pub decisions: IntCounterVec,
    /// Client keys currently holding a window.
    pub tracked_keys: IntGauge,
    /// Entries evicted by sweeps since startup.
    pub swept_entries: IntCounter,
    /// End-to-end request handling time.
    pub request_duration: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let decisions = IntCounterVec::new(
            Opts::new(
                "admission_decisions_total",
                "Admission decisions by verdict",
            ),
            &["verdict"],
        )?;
        let tracked_keys = IntGauge::new(
            "admission_tracked_keys",
            "Client keys currently holding a counting window",
        )?;
        let swept_entries = IntCounter::new(
            "admission_swept_entries_total",
            "Stale window entries removed by sweeps",
        )?;
        let request_duration = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request handling duration in seconds",
        ))?;

        registry.register(Box::new(decisions.clone()))?;
        registry.register(Box::new(tracked_keys.clone()))?;
        registry.register(Box::new(swept_entries.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self {
            registry,
            decisions,
            tracked_keys,
            swept_entries,
            request_duration,
        })
    }

    /// Count one verdict.
    pub fn record_decision(&self, verdict: &Verdict) {
        let label = if verdict.is_allowed() { "allow" } else { "deny" };
        self.decisions.with_label_values(&[label]).inc();
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
