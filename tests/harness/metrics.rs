// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outcome bookkeeping for flood simulation runs.

use std::collections::HashSet;
use std::time::{Duration, Instant};

/// How the gate answered one simulated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Allowed,
    /// Denied because the window budget is spent (retry hint present).
    DeniedBudget,
    /// Denied outright by the unknown-key policy (no retry hint).
    DeniedPolicy,
    ValidationFailed,
}

/// Tallies verdicts, keys, and decision latencies over one flood run.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    started: Option<Instant>,
    finished: Option<Instant>,
    allowed: usize,
    denied_budget: usize,
    denied_policy: usize,
    validation_failed: usize,
    keys: HashSet<String>,
    latencies_us: Vec<u64>,
}

impl AttackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of a run.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Mark the end of a run.
    pub fn finish(&mut self) {
        self.finished = Some(Instant::now());
    }

    /// Tally one request.
    pub fn record(&mut self, outcome: Outcome, key: &str, latency: Duration) {
        match outcome {
            Outcome::Allowed => self.allowed += 1,
            Outcome::DeniedBudget => self.denied_budget += 1,
            Outcome::DeniedPolicy => self.denied_policy += 1,
            Outcome::ValidationFailed => self.validation_failed += 1,
        }
        if !self.keys.contains(key) {
            self.keys.insert(key.to_string());
        }
        self.latencies_us.push(latency.as_micros() as u64);
    }

    pub fn total_requests(&self) -> usize {
        self.allowed + self.denied_budget + self.denied_policy + self.validation_failed
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Allowed => self.allowed,
            Outcome::DeniedBudget => self.denied_budget,
            Outcome::DeniedPolicy => self.denied_policy,
            Outcome::ValidationFailed => self.validation_failed,
        }
    }

    /// Distinct keys seen across the run.
    pub fn unique_keys(&self) -> usize {
        self.keys.len()
    }

    /// Fraction of requests that did not get through.
    pub fn block_rate(&self) -> f64 {
        match self.total_requests() {
            0 => 0.0,
            total => (total - self.allowed) as f64 / total as f64,
        }
    }

    /// Decision latency at quantile `q` (0.5 for the median, 0.99 for p99),
    /// in microseconds.
    pub fn latency_quantile_us(&self, q: f64) -> u64 {
        if self.latencies_us.is_empty() {
            return 0;
        }
        let mut sorted = self.latencies_us.clone();
        sorted.sort_unstable();
        let idx = ((sorted.len() as f64 * q) as usize).min(sorted.len() - 1);
        sorted[idx]
    }

    /// Wall-clock duration of the run.
    pub fn duration(&self) -> Duration {
        match (self.started, self.finished) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Snapshot the tallies into a printable report.
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            total_requests: self.total_requests(),
            allowed: self.allowed,
            denied_budget: self.denied_budget,
            denied_policy: self.denied_policy,
            validation_failed: self.validation_failed,
            duration_ms: self.duration().as_millis() as u64,
            block_rate: self.block_rate(),
            median_latency_us: self.latency_quantile_us(0.5),
            p99_latency_us: self.latency_quantile_us(0.99),
            unique_keys: self.unique_keys(),
        }
    }
}

/// Summary of one flood run.
#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub total_requests: usize,
    pub allowed: usize,
    pub denied_budget: usize,
    pub denied_policy: usize,
    pub validation_failed: usize,
    pub duration_ms: u64,
    pub block_rate: f64,
    pub median_latency_us: u64,
    pub p99_latency_us: u64,
    pub unique_keys: usize,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "flood summary: {} requests over {} keys in {} ms",
            self.total_requests, self.unique_keys, self.duration_ms
        )?;
        writeln!(
            f,
            "  allowed            {} ({:.1}% blocked)",
            self.allowed,
            self.block_rate * 100.0
        )?;
        writeln!(f, "  denied (budget)    {}", self.denied_budget)?;
        writeln!(f, "  denied (policy)    {}", self.denied_policy)?;
        writeln!(f, "  validation failed  {}", self.validation_failed)?;
        writeln!(
            f,
            "  decision latency   median {} us, p99 {} us",
            self.median_latency_us, self.p99_latency_us
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tallies_by_outcome_and_key() {
        let mut metrics = AttackMetrics::new();
        metrics.start();

        metrics.record(Outcome::Allowed, "10.0.0.1", Duration::from_micros(100));
        metrics.record(Outcome::Allowed, "10.0.0.2", Duration::from_micros(150));
        metrics.record(Outcome::DeniedBudget, "10.0.0.1", Duration::from_micros(50));

        metrics.finish();

        assert_eq!(metrics.total_requests(), 3);
        assert_eq!(metrics.count(Outcome::Allowed), 2);
        assert_eq!(metrics.count(Outcome::DeniedBudget), 1);
        assert_eq!(metrics.unique_keys(), 2);
    }

    #[test]
    fn test_block_rate() {
        let mut metrics = AttackMetrics::new();
        for _ in 0..3 {
            metrics.record(Outcome::Allowed, "10.0.0.1", Duration::ZERO);
        }
        for _ in 0..7 {
            metrics.record(Outcome::DeniedBudget, "10.0.0.1", Duration::ZERO);
        }

        assert!((metrics.block_rate() - 0.7).abs() < 0.01);
    }

    #[test]
    fn test_latency_quantiles() {
        let mut metrics = AttackMetrics::new();
        for us in 1..=100u64 {
            metrics.record(Outcome::Allowed, "k", Duration::from_micros(us));
        }

        assert_eq!(metrics.latency_quantile_us(0.5), 51);
        assert_eq!(metrics.latency_quantile_us(0.99), 100);
        assert_eq!(AttackMetrics::new().latency_quantile_us(0.5), 0);
    }
}
