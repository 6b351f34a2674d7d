//! Tabular data: frames, labels and CSV loading.

pub mod frame;
pub mod source;

pub use frame::{FeatureRef, Frame, Labels};
pub use source::CsvSource;

use serde_json::Value;
use std::collections::BTreeMap;

/// Compare two cells, treating numbers by value (`1` equals `1.0`).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Stable string key for a label: strings unquoted, everything else as JSON.
pub fn label_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Count rows per label key.
pub fn class_counts(labels: &[Value]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label_key(label)).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_values_equal_numbers() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(!values_equal(&json!(1), &json!("1")));
        assert!(values_equal(&json!("good"), &json!("good")));
    }

    #[test]
    fn test_class_counts() {
        let counts = class_counts(&[json!("good"), json!("bad"), json!("good"), json!(1.0)]);
        assert_eq!(counts["good"], 2);
        assert_eq!(counts["bad"], 1);
        assert_eq!(counts["1"], 1);
    }
}
