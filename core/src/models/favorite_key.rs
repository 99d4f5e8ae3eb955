//! Identity keys for favorites.
//!
//! A key identifies "the same real-world point in the same category" as
//! `{category}::{id}::{lat}::{lon}`. Coordinates are rendered with exactly
//! eight fractional digits, so values that only differ in floating-point
//! noise below that precision produce the same key.

use serde_json::Value;

pub const KEY_SEPARATOR: &str = "::";

const MISSING_ID: &str = "noid";
const MISSING_CATEGORY: &str = "nocat";
const MISSING_COORDINATE: &str = "na";

/// Coerce a raw JSON value into a finite number.
///
/// `null` and `""` are absent. Strings are parsed after trimming (a
/// whitespace-only string is `0`), booleans are `1`/`0`, and anything
/// non-finite or structured is absent.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => None,
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_number(s),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parse user or upstream text into a finite number
pub fn parse_number(text: &str) -> Option<f64> {
    if text.is_empty() {
        return None;
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Render a raw JSON value as text. Numbers print without a
/// trailing `.0`, so `123` and `123.0` map to the same id.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(|v| v.to_string())
            }
        }
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

pub fn normalize_coordinate(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        None => MISSING_COORDINATE.to_string(),
        // -0.0 would otherwise print with a sign
        Some(v) if v == 0.0 => format!("{:.8}", 0.0_f64),
        Some(v) => format!("{:.8}", v),
    }
}

pub fn normalize_identifier(id: Option<&str>) -> String {
    match id {
        Some(id) if !id.is_empty() => id.trim().to_string(),
        _ => MISSING_ID.to_string(),
    }
}

pub fn normalize_category(category: Option<&str>) -> String {
    match category {
        Some(category) if !category.is_empty() => category.trim().to_string(),
        _ => MISSING_CATEGORY.to_string(),
    }
}

/// Original id implied by a stored `resource_id` when no
/// `original_resource_id` is recorded: the value itself, except a key
/// derived without any id (`{cat}::noid::{lat}::{lon}`), which has none.
/// Reading that key verbatim would nest it one level deeper on every load.
pub fn id_from_resource_id(resource_id: &str) -> Option<&str> {
    let parts: Vec<&str> = resource_id.split(KEY_SEPARATOR).collect();
    if parts.len() == 4 && parts[1] == MISSING_ID {
        return None;
    }
    Some(resource_id).filter(|id| !id.is_empty())
}

/// Derive the canonical favorite key. Total and deterministic.
pub fn favorite_key(
    id: Option<&str>,
    category: Option<&str>,
    lat: Option<f64>,
    lon: Option<f64>,
) -> String {
    [
        normalize_category(category),
        normalize_identifier(id),
        normalize_coordinate(lat),
        normalize_coordinate(lon),
    ]
    .join(KEY_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_key() {
        let key = favorite_key(Some("123"), Some("aed"), Some(33.5902), Some(130.351903));
        assert_eq!(key, "aed::123::33.59020000::130.35190300");
    }

    #[test]
    fn test_deterministic() {
        let a = favorite_key(Some("x-1"), Some("toilet"), Some(35.0001), Some(139.7));
        let b = favorite_key(Some("x-1"), Some("toilet"), Some(35.0001), Some(139.7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_rounding_tolerance() {
        let a = favorite_key(Some("1"), Some("aed"), Some(33.5902), Some(130.351903));
        let b = favorite_key(Some("1"), Some("aed"), Some(33.590200001), Some(130.3519030004));
        assert_eq!(a, b);

        let c = favorite_key(Some("1"), Some("aed"), Some(33.5903), Some(130.351903));
        assert_ne!(a, c);
    }

    #[test]
    fn test_missing_parts() {
        assert_eq!(favorite_key(None, None, None, None), "nocat::noid::na::na");
        assert_eq!(favorite_key(Some(""), Some(""), None, Some(1.0)), "nocat::noid::na::1.00000000");
    }

    #[test]
    fn test_trims_id_and_category() {
        let key = favorite_key(Some("  42 "), Some(" hospital"), Some(1.5), Some(-2.25));
        assert_eq!(key, "hospital::42::1.50000000::-2.25000000");
    }

    #[test]
    fn test_non_finite_coordinates_are_absent() {
        assert_eq!(normalize_coordinate(Some(f64::NAN)), "na");
        assert_eq!(normalize_coordinate(Some(f64::INFINITY)), "na");
    }

    #[test]
    fn test_negative_zero() {
        assert_eq!(normalize_coordinate(Some(-0.0)), "0.00000000");
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&json!(33.1)), Some(33.1));
        assert_eq!(coerce_number(&json!("130.2")), Some(130.2));
        assert_eq!(coerce_number(&json!(" 12 ")), Some(12.0));
        assert_eq!(coerce_number(&json!("")), None);
        assert_eq!(coerce_number(&json!(null)), None);
        assert_eq!(coerce_number(&json!("abc")), None);
        assert_eq!(coerce_number(&json!("Infinity")), None);
        assert_eq!(coerce_number(&json!([1])), None);
        assert_eq!(coerce_number(&json!(true)), Some(1.0));
    }

    #[test]
    fn test_id_from_resource_id() {
        assert_eq!(id_from_resource_id("hospital_42"), Some("hospital_42"));
        assert_eq!(
            id_from_resource_id("aed::123::33.59020000::130.35190300"),
            Some("aed::123::33.59020000::130.35190300")
        );
        assert_eq!(id_from_resource_id("aed::noid::na::na"), None);
        assert_eq!(id_from_resource_id(""), None);
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&json!(123)), Some("123".to_string()));
        assert_eq!(value_to_text(&json!(123.0)), Some("123".to_string()));
        assert_eq!(value_to_text(&json!("abc")), Some("abc".to_string()));
        assert_eq!(value_to_text(&json!(null)), None);
    }
}
