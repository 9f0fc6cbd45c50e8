// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! JSON body schema validator.
//!
//! Applies per-field rules (required, type, min/max length) to a request
//! body and collects every violation instead of stopping at the first, so
//! a caller can fix a whole submission in one round trip. Fields the schema
//! does not name are ignored.
//!
//! Length rules double as range rules: for strings they compare character
//! count, for numbers they compare the value itself.

use crate::config::{FieldRule, FieldType, ValidationConfig};
use serde_json::Value;
use thiserror::Error;

/// A single rule violation, phrased for end users.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(String),

    #[error("{field} must be of type {expected}")]
    WrongType { field: String, expected: FieldType },

    #[error("{field} must be at least {min} {unit}")]
    TooSmall {
        field: String,
        min: f64,
        unit: &'static str,
    },

    #[error("{field} must be at most {max} {unit}")]
    TooLarge {
        field: String,
        max: f64,
        unit: &'static str,
    },
}

/// Validates JSON bodies against a configured field schema.
pub struct SchemaValidator {
    config: ValidationConfig,
}

impl SchemaValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// True when no rules are configured, i.e. every body passes.
    pub fn is_vacuous(&self) -> bool {
        self.config.schema.is_empty()
    }

    /// Check `body` against the schema, returning every violation found.
    ///
    /// Absent, null, and empty-string values count as missing: an error for
    /// required fields (skipping that field's remaining rules), a silent
    /// skip for optional ones. A type mismatch does not suppress the length
    /// rules; those apply to whatever kind the value actually is.
    pub fn validate(&self, body: &Value) -> Vec<ValidationError> {
        let fields = body.as_object();
        let mut errors = Vec::new();

        for (name, rule) in &self.config.schema {
            let value = fields.and_then(|map| map.get(name));

            if is_missing(value) {
                if rule.required {
                    errors.push(ValidationError::Required(name.clone()));
                }
                continue;
            }
            // Checked by is_missing above.
            let Some(value) = value else { continue };

            if !matches_type(value, rule.field_type) {
                errors.push(ValidationError::WrongType {
                    field: name.clone(),
                    expected: rule.field_type,
                });
            }

            check_bounds(name, rule, value, &mut errors);
        }

        errors
    }
}

/// Absent, null, and "" are all treated as not supplied.
fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn matches_type(value: &Value, expected: FieldType) -> bool {
    match expected {
        FieldType::String => value.is_string(),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
    }
}

/// Apply min/max rules to the value's actual kind: character count for
/// strings, magnitude for numbers, nothing for other kinds.
fn check_bounds(name: &str, rule: &FieldRule, value: &Value, errors: &mut Vec<ValidationError>) {
    let (measure, unit) = match value {
        Value::String(s) => (s.chars().count() as f64, "characters"),
        Value::Number(n) => match n.as_f64() {
            Some(n) => (n, "units"),
            None => return,
        },
        _ => return,
    };

    if let Some(min) = rule.min_length {
        if measure < min {
            errors.push(ValidationError::TooSmall {
                field: name.to_string(),
                min,
                unit,
            });
        }
    }

    if let Some(max) = rule.max_length {
        if measure > max {
            errors.push(ValidationError::TooLarge {
                field: name.to_string(),
                max,
                unit,
            });
        }
    }
}
