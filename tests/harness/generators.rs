// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for flood simulation.

use serde_json::{json, Value};

/// Generate a pool of client keys for testing.
///
/// Keys look like addresses from the 10.x.x.x private range, but the
/// engine treats them as opaque strings.
pub fn generate_keys(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let a = (i >> 16) & 0xFF;
            let b = (i >> 8) & 0xFF;
            let c = i & 0xFF;
            format!("10.{}.{}.{}", a, b, c)
        })
        .collect()
}

/// Key variations that should all count as unidentified.
pub fn generate_blank_keys() -> Vec<Option<&'static str>> {
    vec![None, Some(""), Some("   "), Some("\t")]
}

/// Generate bodies that each violate a `{name: string required min 3}`
/// style schema in a different way.
pub fn generate_invalid_bodies(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| match i % 5 {
            0 => json!({}),
            1 => json!({ "name": null }),
            2 => json!({ "name": "" }),
            3 => json!({ "name": 42 }),
            _ => json!({ "name": "ab" }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_keys() {
        let keys = generate_keys(256);
        assert_eq!(keys.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_invalid_bodies_cycle_through_violations() {
        let bodies = generate_invalid_bodies(5);
        assert_eq!(bodies.len(), 5);
        assert!(bodies[0].as_object().unwrap().is_empty());
        assert!(bodies[1]["name"].is_null());
        assert_eq!(bodies[3]["name"], 42);
    }
}
