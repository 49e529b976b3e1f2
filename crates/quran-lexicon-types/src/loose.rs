//! Lenient field decoding for loosely-typed backend rows.
//!
//! Backend rows mix strings, numbers and pre-parsed or stringified JSON in the
//! same columns. Every decoder here maps "wrong shape" to `None` instead of an
//! error so a single odd field never discards a whole record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Trimmed, non-empty text from a string, number or boolean.
pub fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Integer from a number or numeric string, truncating fractions.
pub fn number_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Parse a numeric segment such as `"2"`, `" 7 "` or `"3.0"`.
pub fn parse_number(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<i64>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64)
    })
}

/// Decode a value that may arrive pre-parsed or as raw JSON text.
///
/// Strings are parsed as JSON first; anything that fails to parse or does not
/// fit `T` yields `None`.
pub fn parse_if_string<T: DeserializeOwned>(value: &Value) -> Option<T> {
    match value {
        Value::Null => None,
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return None;
            }
            serde_json::from_str(trimmed).ok()
        }
        other => T::deserialize(other).ok(),
    }
}

/// Split a delimited list (`,`, `;`, `|`, Arabic comma, newline) into trimmed items.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split([',', ';', '|', '\u{060C}', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Flatten an array or delimited string into display tokens.
pub fn list_value(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text_value).collect(),
        other => text_value(other).map(|t| split_list(&t)).unwrap_or_default(),
    }
}

/// Serde adapter for [`text_value`].
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(text_value))
}

/// Serde adapter for [`number_value`].
pub fn number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_value))
}

/// Keep any non-null JSON value untouched; decode later through typed accessors.
pub fn raw<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_null()))
}

/// Decode a nested value as `T`, or `None` if it does not fit.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_if_string))
}

/// Decode an array, skipping elements that do not fit `T`.
pub fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| T::deserialize(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Decode a JSON array of rows, skipping rows that are not objects of the right shape.
pub fn records_from_values<T: DeserializeOwned>(values: &[Value]) -> Vec<T> {
    values
        .iter()
        .filter(|v| v.is_object())
        .filter_map(|v| T::deserialize(v).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_accepts_scalars_only() {
        assert_eq!(text_value(&json!("  كتب ")), Some("كتب".into()));
        assert_eq!(text_value(&json!(12)), Some("12".into()));
        assert_eq!(text_value(&json!(true)), Some("true".into()));
        assert_eq!(text_value(&json!("   ")), None);
        assert_eq!(text_value(&json!({"a": 1})), None);
        assert_eq!(text_value(&Value::Null), None);
    }

    #[test]
    fn numbers_truncate_and_tolerate_strings() {
        assert_eq!(number_value(&json!(2)), Some(2));
        assert_eq!(number_value(&json!(2.9)), Some(2));
        assert_eq!(number_value(&json!(" 7 ")), Some(7));
        assert_eq!(number_value(&json!("abc")), None);
        assert_eq!(number_value(&json!("")), None);
        assert_eq!(number_value(&json!([1])), None);
    }

    #[test]
    fn parse_if_string_handles_both_shapes() {
        let from_text: Option<Vec<String>> = parse_if_string(&json!("[\"a\", \"b\"]"));
        assert_eq!(from_text, Some(vec!["a".to_string(), "b".to_string()]));
        let parsed: Option<Vec<String>> = parse_if_string(&json!(["c"]));
        assert_eq!(parsed, Some(vec!["c".to_string()]));
        let broken: Option<Vec<String>> = parse_if_string(&json!("not json"));
        assert_eq!(broken, None);
    }

    #[test]
    fn list_splits_on_every_delimiter() {
        assert_eq!(
            list_value(&json!("write; record | inscribe, pen")),
            vec!["write", "record", "inscribe", "pen"]
        );
        assert_eq!(list_value(&json!(["a", 3, null])), vec!["a", "3"]);
    }
}
