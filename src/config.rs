// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the admission gate service.
//!
//! Every section has serde defaults so a partial config document works;
//! [`Config::from_env`] applies environment overrides on top of the defaults
//! and rejects malformed values instead of silently replacing them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors surfaced at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    InvalidValue {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Admission control configuration
    #[serde(default)]
    pub admission: AdmissionConfig,

    /// Body schema validation configuration
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Access log configuration
    #[serde(default)]
    pub access_log: AccessLogConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Admission control configuration: one fixed-window budget per client key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Maximum requests per key per window (default: 20)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds (default: 900, i.e. 15 minutes)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Message carried by rejection responses
    #[serde(default = "default_rejection_message")]
    pub rejection_message: String,

    /// Treatment of requests whose client key cannot be derived
    #[serde(default)]
    pub unknown_key_policy: UnknownKeyPolicy,

    /// Background sweep cadence in seconds (default: 60)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Idle age in seconds before sweep evicts an entry.
    /// Defaults to twice the window when unset; the engine never lets the
    /// effective grace drop below one window length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_grace_secs: Option<u64>,
}

/// Policy for requests whose client key cannot be derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKeyPolicy {
    /// Count every unidentified client against one shared bucket.
    #[default]
    SharedBucket,
    /// Deny unidentified clients outright, with no retry hint.
    Reject,
}

impl FromStr for UnknownKeyPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared_bucket" => Ok(Self::SharedBucket),
            "reject" => Ok(Self::Reject),
            _ => Err(ConfigError::InvalidValue {
                var: "UNKNOWN_KEY_POLICY",
                expected: "shared_bucket or reject",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for UnknownKeyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SharedBucket => write!(f, "shared_bucket"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Body schema validation for the guarded submission route.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Field name to rule, applied to the JSON request body.
    /// An empty schema accepts every body.
    #[serde(default)]
    pub schema: BTreeMap<String, FieldRule>,
}

/// Validation rule for a single body field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRule {
    /// Absent, null, and empty-string values fail when required (default: false)
    #[serde(default)]
    pub required: bool,

    /// JSON type the field must have
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Minimum character count for strings, minimum value for numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<f64>,

    /// Maximum character count for strings, maximum value for numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<f64>,
}

/// JSON types a field rule can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

/// Access log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogConfig {
    /// Attach redacted JSON request bodies to access records (default: false)
    #[serde(default)]
    pub capture_request_bodies: bool,

    /// Top-level body fields replaced with "***" in captured bodies
    #[serde(default)]
    pub redact: Vec<String>,

    /// Append each record as one JSON line to `log_file_path` (default: false)
    #[serde(default)]
    pub log_to_file: bool,

    /// Path of the JSON-lines sink (default: requests.log)
    #[serde(default = "default_log_file_path")]
    pub log_file_path: String,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable the Prometheus text endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_requests() -> u32 {
    20
}

fn default_window_secs() -> u64 {
    900 // 15 minutes
}

fn default_rejection_message() -> String {
    "Too many requests, please try again later.".to_string()
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_log_file_path() -> String {
    "requests.log".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            admission: AdmissionConfig::default(),
            validation: ValidationConfig::default(),
            access_log: AccessLogConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            rejection_message: default_rejection_message(),
            unknown_key_policy: UnknownKeyPolicy::default(),
            sweep_interval_secs: default_sweep_interval_secs(),
            idle_grace_secs: None,
        }
    }
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            capture_request_bodies: false,
            redact: Vec::new(),
            log_to_file: false,
            log_file_path: default_log_file_path(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl AdmissionConfig {
    /// Window length as a [`Duration`].
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Sweep cadence as a [`Duration`].
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Idle age beyond which sweep may evict an entry, before clamping.
    pub fn idle_grace(&self) -> Duration {
        match self.idle_grace_secs {
            Some(secs) => Duration::from_secs(secs),
            None => self.window_duration() * 2,
        }
    }
}

impl Config {
    /// Load defaults overridden by environment variables.
    ///
    /// Recognized variables: `BIND_ADDR`, `MAX_REQUESTS`, `WINDOW_SECS`,
    /// `REJECTION_MESSAGE`, `UNKNOWN_KEY_POLICY`, `SWEEP_INTERVAL_SECS`,
    /// `IDLE_GRACE_SECS`, `VALIDATION_SCHEMA`, `CAPTURE_REQUEST_BODIES`,
    /// `REDACT_FIELDS`, `LOG_TO_FILE`, `LOG_FILE_PATH`, `METRICS_ENABLED`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Ok(addr) = std::env::var("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(max) = parse_env("MAX_REQUESTS", "a positive integer")? {
            config.admission.max_requests = max;
        }
        if let Some(secs) = parse_env("WINDOW_SECS", "a positive integer")? {
            config.admission.window_secs = secs;
        }
        if let Ok(message) = std::env::var("REJECTION_MESSAGE") {
            config.admission.rejection_message = message;
        }
        if let Ok(policy) = std::env::var("UNKNOWN_KEY_POLICY") {
            config.admission.unknown_key_policy = policy.parse()?;
        }
        if let Some(secs) = parse_env("SWEEP_INTERVAL_SECS", "a positive integer")? {
            config.admission.sweep_interval_secs = secs;
        }
        if let Some(secs) = parse_env("IDLE_GRACE_SECS", "an integer number of seconds")? {
            config.admission.idle_grace_secs = Some(secs);
        }
        if let Ok(schema) = std::env::var("VALIDATION_SCHEMA") {
            config.validation.schema =
                serde_json::from_str(&schema).map_err(|_| ConfigError::InvalidValue {
                    var: "VALIDATION_SCHEMA",
                    expected: "a JSON object of field rules",
                    value: schema,
                })?;
        }
        if let Some(capture) = parse_env("CAPTURE_REQUEST_BODIES", "true or false")? {
            config.access_log.capture_request_bodies = capture;
        }
        if let Ok(fields) = std::env::var("REDACT_FIELDS") {
            config.access_log.redact = fields
                .split(',')
                .map(|field| field.trim().to_string())
                .filter(|field| !field.is_empty())
                .collect();
        }
        if let Some(enabled) = parse_env("LOG_TO_FILE", "true or false")? {
            config.access_log.log_to_file = enabled;
        }
        if let Ok(path) = std::env::var("LOG_FILE_PATH") {
            config.access_log.log_file_path = path;
        }
        if let Some(enabled) = parse_env("METRICS_ENABLED", "true or false")? {
            config.metrics.enabled = enabled;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants: a zero budget or a zero-length window
    /// makes every decision degenerate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admission.max_requests == 0 {
            return Err(ConfigError::InvalidValue {
                var: "MAX_REQUESTS",
                expected: "at least 1",
                value: self.admission.max_requests.to_string(),
            });
        }
        if self.admission.window_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: "WINDOW_SECS",
                expected: "at least 1",
                value: self.admission.window_secs.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(
    var: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                var,
                expected,
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}
