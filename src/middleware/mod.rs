// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Tower middleware for the admission gate.
//!
//! Two independent layers: [`AdmissionLayer`] enforces the per-client
//! budget in front of guarded routes, and [`RequestLogLayer`] records
//! every request after the fact. Both derive the client key the same way.

pub mod access_log;
pub mod admission;

pub use access_log::RequestLogLayer;
pub use admission::AdmissionLayer;

use axum::extract::ConnectInfo;
use axum::http::Request;
use std::net::SocketAddr;

/// Derive the client key from request context: the first hop of
/// `X-Forwarded-For` when present, otherwise the peer address recorded by
/// [`ConnectInfo`].
///
/// A blank first hop falls back to the peer address. `None` means the
/// request is unidentified and subject to the configured unknown-key
/// policy.
pub fn client_key<B>(request: &Request<B>) -> Option<String> {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}
