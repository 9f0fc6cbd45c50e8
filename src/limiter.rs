// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window admission decision engine.
//!
//! Each client key gets a counting window of `window_secs` length holding up
//! to `max_requests` admissions. A window that has fully elapsed is replaced
//! wholesale on the next decision (no decay, no sliding). A client that
//! spends its budget just before the boundary may spend a fresh budget just
//! after it; that is the fixed-window trade-off.
//!
//! Concurrency discipline: the whole read-modify-write of a decision runs
//! under the key's store slot lock ([`WindowStore::checkout`]), so two
//! racing decisions for one key serialize and never over-admit. Decisions
//! for keys on different shards do not contend. The lock is a short
//! in-memory critical section with no timeout, so no fail-open/fail-closed
//! policy is needed.
//!
//! Time is injected: `decide` never reads the clock, callers pass `now`.

use crate::config::{AdmissionConfig, UnknownKeyPolicy};
use crate::store::{WindowState, WindowStore};
use std::time::{Duration, Instant};
use tracing::debug;

/// Bucket key shared by every client whose own key cannot be derived,
/// under [`UnknownKeyPolicy::SharedBucket`].
pub const UNKNOWN_KEY: &str = "unknown";

/// Outcome of an admission decision.
///
/// Both variants are normal results, not errors. The enum is cheap to clone
/// so observers (logging, metrics) can keep a copy without touching the
/// engine again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Request may proceed.
    Allow {
        /// Admissions left in the current window after this one.
        remaining: u32,
    },
    /// Request is rejected.
    Deny {
        /// Configured rejection message, for the wire-level response body.
        message: String,
        /// Time until the client's window resets. `None` when the rejection
        /// is unconditional (unidentified client under the reject policy).
        retry_after: Option<Duration>,
    },
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow { .. })
    }

    /// Seconds until the window resets, rounded up so a client honoring the
    /// hint never retries into the same window. `None` unless this is a
    /// denial with a known reset time.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Verdict::Deny {
                retry_after: Some(wait),
                ..
            } => {
                let secs = wait.as_secs();
                Some(if wait.subsec_nanos() > 0 { secs + 1 } else { secs })
            }
            _ => None,
        }
    }
}

/// Per-client fixed-window admission control.
pub struct AdmissionEngine {
    config: AdmissionConfig,
    store: WindowStore,
}

impl AdmissionEngine {
    /// Create an engine with the given configuration.
    ///
    /// The configuration is trusted as-is; services validate it at startup
    /// via [`crate::config::Config::validate`].
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            config,
            store: WindowStore::new(),
        }
    }

    /// Decide admission for an identified client key at `now`.
    ///
    /// First observation of a key opens a window with this request counted.
    /// A window older than the configured length (strictly) is replaced with
    /// a fresh one. An unexpired window at budget denies without counting
    /// the rejected request, so `count` never exceeds `max_requests`.
    pub fn decide(&self, key: &str, now: Instant) -> Verdict {
        let mut slot = self.store.checkout(key, now);
        let state = slot.value_mut();

        let elapsed = now.saturating_duration_since(state.window_start);
        if elapsed > self.config.window_duration() {
            *state = WindowState {
                count: 1,
                window_start: now,
            };
            return Verdict::Allow {
                remaining: self.config.max_requests - 1,
            };
        }

        if state.count >= self.config.max_requests {
            let reset_at = state.window_start + self.config.window_duration();
            let retry_after = reset_at.saturating_duration_since(now);
            debug!(
                key,
                retry_after_secs = retry_after.as_secs(),
                "admission budget exhausted"
            );
            return Verdict::Deny {
                message: self.config.rejection_message.clone(),
                retry_after: Some(retry_after),
            };
        }

        state.count += 1;
        Verdict::Allow {
            remaining: self.config.max_requests - state.count,
        }
    }

    /// Decide admission for a request whose key may be underivable.
    ///
    /// Absent and blank keys are unidentified; the configured
    /// [`UnknownKeyPolicy`] either counts them against the shared
    /// [`UNKNOWN_KEY`] bucket or denies them outright with no retry hint.
    pub fn decide_client(&self, key: Option<&str>, now: Instant) -> Verdict {
        match key {
            Some(key) if !key.trim().is_empty() => self.decide(key, now),
            _ => match self.config.unknown_key_policy {
                UnknownKeyPolicy::SharedBucket => self.decide(UNKNOWN_KEY, now),
                UnknownKeyPolicy::Reject => {
                    debug!("unidentified client rejected");
                    Verdict::Deny {
                        message: self.config.rejection_message.clone(),
                        retry_after: None,
                    }
                }
            },
        }
    }

    /// Evict windows idle past the configured grace, returning how many
    /// entries were removed.
    ///
    /// The effective grace never drops below one window length, so a window
    /// that could still deny requests is never evicted mid-flight.
    pub fn sweep(&self, now: Instant) -> usize {
        let grace = self.config.idle_grace().max(self.config.window_duration());
        let removed = self.store.sweep(now, grace);
        if removed > 0 {
            debug!(removed, tracked = self.store.len(), "swept stale windows");
        }
        removed
    }

    /// Number of client keys currently holding a window.
    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }

    /// The configured rejection message.
    pub fn message(&self) -> &str {
        &self.config.rejection_message
    }
}
