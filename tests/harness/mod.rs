// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for admission gate flood simulation.
//!
//! This module provides utilities for simulating flood patterns against
//! the admission engine to validate that budgets hold. Simulated time is
//! driven explicitly, so runs are deterministic and never sleep.

pub mod attacks;
pub mod generators;
pub mod metrics;
