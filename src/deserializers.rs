//! Serde helpers for use with `#[serde(deserialize_with = "...")]`.
//!
//! Call documents come from an ingestion process we don't control, so scalar
//! fields show up as strings, numbers or extended-JSON wrappers
//! (`{"$oid": ..}`, `{"$date": ..}`) depending on who wrote them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// "abc" → Some("abc"), 65 → Some("65"), {"$oid": "..."} → Some("..."), null → None
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_text))
}

/// null → T::default()
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 120 → Some(120.0), "120" → Some(120.0), {"$numberDouble": "1.5"} → Some(1.5),
/// "n/a" → None, NaN and infinities → None
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_number))
}

/// Decodes a list one element at a time, dropping the elements that don't fit
/// `T` with a warning. null or a non-list → empty.
pub fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!("expected a list, found {other}; treating it as empty");
            return Ok(Vec::new());
        }
    };
    let mut decoded = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<T>(item) {
            Ok(value) => decoded.push(value),
            Err(err) => warn!("skipping malformed list element #{index}: {err}"),
        }
    }
    Ok(decoded)
}

fn scalar_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Object(map) => map
            .get("$numberDouble")
            .or_else(|| map.get("$numberDecimal"))
            .or_else(|| map.get("$numberLong"))
            .or_else(|| map.get("$numberInt"))
            .and_then(scalar_number),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Object(map) => map
            .get("$oid")
            .or_else(|| map.get("$date"))
            .or_else(|| map.get("$numberLong"))
            .or_else(|| map.get("$numberInt"))
            .and_then(scalar_text),
        _ => None,
    }
}
