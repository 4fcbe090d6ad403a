//! Lenient readers for `GeoJSON` feature properties.
//!
//! The accident export is inconsistent about types: the same property may be
//! a JSON string in one release and a number in the next, and booleans are
//! usually the strings `"true"` / `"false"`. Every reader here accepts both
//! shapes and treats `null`, empty strings and `"null"` as missing.

use geojson::JsonObject;
use serde_json::Value;

fn present<'a>(props: &'a JsonObject, key: &str) -> Option<&'a Value> {
    match props.get(key)? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() || s.trim() == "null" => None,
        other => Some(other),
    }
}

/// Reads a property as a trimmed string. Numbers are formatted.
#[must_use]
pub fn string(props: &JsonObject, key: &str) -> Option<String> {
    match present(props, key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Reads a property as an integer. Accepts integral floats (`2021.0`) and
/// numeric strings (`"07"`).
#[must_use]
pub fn integer(props: &JsonObject, key: &str) -> Option<i64> {
    match present(props, key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn integral(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
}

/// Reads a property as a float.
#[must_use]
pub fn float(props: &JsonObject, key: &str) -> Option<f64> {
    let value = match present(props, key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

/// Reads a boolean flag. Missing or unrecognised values read as `false`.
#[must_use]
pub fn flag(props: &JsonObject, key: &str) -> bool {
    match present(props, key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s == "1"
        }
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

/// Renders any property value the way value counts key it: strings
/// verbatim, everything else as compact JSON.
#[must_use]
pub fn canonical(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn props(value: &Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn integers_from_strings_and_numbers() {
        let p = props(&json!({"a": "2021", "b": 7, "c": 2020.0, "d": " 07 ", "e": "x", "f": 1.5}));
        assert_eq!(integer(&p, "a"), Some(2021));
        assert_eq!(integer(&p, "b"), Some(7));
        assert_eq!(integer(&p, "c"), Some(2020));
        assert_eq!(integer(&p, "d"), Some(7));
        assert_eq!(integer(&p, "e"), None);
        assert_eq!(integer(&p, "f"), None);
        assert_eq!(integer(&p, "missing"), None);
    }

    #[test]
    fn blanks_and_nulls_are_missing() {
        let p = props(&json!({"a": "", "b": null, "c": "null", "d": "  ZH "}));
        assert_eq!(string(&p, "a"), None);
        assert_eq!(string(&p, "b"), None);
        assert_eq!(string(&p, "c"), None);
        assert_eq!(string(&p, "d").as_deref(), Some("ZH"));
    }

    #[test]
    fn flags_accept_strings_and_bools() {
        let p = props(&json!({"a": "true", "b": "false", "c": true, "d": "TRUE", "e": 1}));
        assert!(flag(&p, "a"));
        assert!(!flag(&p, "b"));
        assert!(flag(&p, "c"));
        assert!(flag(&p, "d"));
        assert!(flag(&p, "e"));
        assert!(!flag(&p, "missing"));
    }

    #[test]
    fn floats_and_canonical_values() {
        let p = props(&json!({"e": "2683248.5", "n": 1_247_851}));
        assert_eq!(float(&p, "e"), Some(2_683_248.5));
        assert_eq!(float(&p, "n"), Some(1_247_851.0));
        assert_eq!(canonical(&json!("as1")), "as1");
        assert_eq!(canonical(&json!(2021)), "2021");
        assert_eq!(canonical(&json!(null)), "null");
    }
}
