// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-key window storage.
//!
//! Holds one [`WindowState`] per client key in a concurrent map. Lookups and
//! the decision-time checkout are per-key operations that touch a single
//! shard; `sweep` walks the map and drops entries whose window has been idle
//! past a grace period.

use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Counting state for one client key's current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// Requests admitted in the current window.
    pub count: u32,
    /// When the current window began.
    pub window_start: Instant,
}

/// Concurrency-safe map from client key to [`WindowState`].
///
/// All operations are total: they never fail, and they are safe under
/// concurrent invocation for the same or different keys.
#[derive(Debug, Default)]
pub struct WindowStore {
    entries: DashMap<String, WindowState>,
}

impl WindowStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Snapshot of the entry for `key`, if one exists. No side effects.
    pub fn get(&self, key: &str) -> Option<WindowState> {
        self.entries.get(key).map(|entry| *entry.value())
    }

    /// Insert or overwrite the entry for `key`.
    pub fn put(&self, key: &str, state: WindowState) {
        self.entries.insert(key.to_string(), state);
    }

    /// Exclusive handle to the entry for `key`, creating a zero-count window
    /// at `now` when absent.
    ///
    /// The handle holds the key's shard write lock for its lifetime, which
    /// makes the caller's whole read-modify-write atomic with respect to
    /// other checkouts of the same key. Checkouts of keys on other shards do
    /// not contend.
    pub(crate) fn checkout(&self, key: &str, now: Instant) -> RefMut<'_, String, WindowState> {
        self.entries.entry(key.to_string()).or_insert(WindowState {
            count: 0,
            window_start: now,
        })
    }

    /// Remove entries whose window started more than `max_idle` ago, and
    /// return how many were removed.
    ///
    /// The retain pass takes each shard lock in turn, so it serializes
    /// against in-flight checkouts and never removes an entry mid-decision.
    pub fn sweep(&self, now: Instant, max_idle: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, state| now.saturating_duration_since(state.window_start) <= max_idle);
        before.saturating_sub(self.entries.len())
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
