//! Best-effort coercion of loosely typed API values.
//!
//! The monitoring service mixes numbers, numeric strings, empty strings and
//! nulls in the same field depending on how a system was registered.

use serde_json::Value;

/// Numeric view of a JSON value: numbers and numeric strings, anything else is `None`.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_f64(s),
        _ => None,
    }
}

/// Parse a trimmed decimal string; empty or malformed input is `None`.
pub fn parse_f64(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

/// Text used for a JSON value in a CSV cell. Nulls become `N/A`.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => "N/A".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_numbers_and_numeric_strings() {
        assert_eq!(as_f64(&json!(12)), Some(12.0));
        assert_eq!(as_f64(&json!("120.5")), Some(120.5));
        assert_eq!(as_f64(&json!(" 7 ")), Some(7.0));
    }

    #[test]
    fn rejects_non_numeric_values() {
        assert_eq!(as_f64(&json!("")), None);
        assert_eq!(as_f64(&json!("n/a")), None);
        assert_eq!(as_f64(&json!(null)), None);
        assert_eq!(as_f64(&json!(true)), None);
        assert_eq!(parse_f64("NaN"), None);
    }

    #[test]
    fn display_uses_na_for_null() {
        assert_eq!(display(&json!(null)), "N/A");
        assert_eq!(display(&json!("Leeds")), "Leeds");
        assert_eq!(display(&json!(1)), "1");
        assert_eq!(display(&json!(2.5)), "2.5");
    }
}
