// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admission Gate
//!
//! Per-client request admission control built on a fixed counting window:
//!
//! - One window per client key (count + window start), swept when idle
//! - Configurable budget, window length, and rejection message
//! - Explicit policy for requests with no derivable client key
//! - `tower` layer translating denials into wire-level 429 responses
//! - External-auth `POST /check` endpoint for reverse proxies
//! - Request access logging with body redaction and a JSON-lines sink
//! - Per-field JSON schema validation collecting every violation
//!
//! The core (`store` + `limiter`) has no HTTP types in its API and takes the
//! current time as an argument, so embedders and tests drive it directly.

pub mod config;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod middleware;
pub mod store;
pub mod validator;

pub use config::{Config, UnknownKeyPolicy};
pub use limiter::{AdmissionEngine, Verdict};
pub use metrics::Metrics;
pub use middleware::{AdmissionLayer, RequestLogLayer};
pub use validator::{SchemaValidator, ValidationError};
