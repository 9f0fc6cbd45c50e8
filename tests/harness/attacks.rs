// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Flood simulation patterns for security testing.

use std::time::Duration;

/// Flood pattern configuration.
///
/// `interval` is simulated time between consecutive requests; the runner
/// advances a virtual clock by it instead of sleeping, so every pattern
/// has an exact expected outcome.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Number of unique client keys to rotate through
    pub unique_keys: usize,
    /// Send every request without a derivable client key
    pub unidentified: bool,
    /// Simulated time between consecutive requests
    pub interval: Duration,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            unique_keys: 1,
            unidentified: false,
            interval: Duration::ZERO,
        }
    }
}

/// Predefined flood patterns.
impl AttackConfig {
    /// Single key flood - basic DoS from one client, all inside one window.
    pub fn single_key_flood() -> Self {
        Self {
            total_requests: 200,
            unique_keys: 1,
            ..Default::default()
        }
    }

    /// Distributed flood - many keys, each over budget on its own.
    pub fn distributed_flood() -> Self {
        Self {
            total_requests: 500,
            unique_keys: 100,
            ..Default::default()
        }
    }

    /// Flood with no derivable client key.
    pub fn unidentified_flood() -> Self {
        Self {
            total_requests: 100,
            unidentified: true,
            ..Default::default()
        }
    }

    /// Paced sender - spaced so each window stays under budget.
    pub fn paced_sender(interval: Duration) -> Self {
        Self {
            total_requests: 100,
            unique_keys: 1,
            interval,
            ..Default::default()
        }
    }

    /// Requests each key receives over the whole run.
    pub fn per_key_requests(&self) -> usize {
        if self.unique_keys == 0 {
            0
        } else {
            self.total_requests / self.unique_keys
        }
    }

    /// Simulated duration of the whole run.
    pub fn virtual_duration(&self) -> Duration {
        self.interval * self.total_requests as u32
    }
}
