use crate::{ExplorerError, Result};
use serde_json::Value as JsonValue;

const NUMERIC_WRAPPERS: [&str; 4] = ["$numberDecimal", "$numberDouble", "$numberLong", "$numberInt"];

/// Numeric coercion shared by every aggregate and comparison.
///
/// Numbers pass through, strings are parsed after trimming, booleans map to
/// 1/0 and extended-JSON number wrappers are unwrapped. Non-finite results
/// count as not numeric.
pub fn to_f64(value: &JsonValue) -> Option<f64> {
    let v = match value {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) => s.trim().parse::<f64>().ok()?,
        JsonValue::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        JsonValue::Object(map) if map.len() == 1 => {
            let (k, inner) = map.iter().next()?;
            if !NUMERIC_WRAPPERS.contains(&k.as_str()) {
                return None;
            }
            return to_f64(inner);
        }
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// [`to_f64`] with an error naming the offending path, for callers that log
/// the excluded document.
pub fn coerce_f64(path: &str, value: &JsonValue) -> Result<f64> {
    to_f64(value).ok_or_else(|| ExplorerError::CoercionFailure {
        path: path.to_string(),
        value: value.to_string(),
    })
}

pub fn round_to(x: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (x * factor).round() / factor
}

/// JSON number for `x`, or null when `x` is not finite.
pub fn json_f64(x: f64) -> JsonValue {
    serde_json::Number::from_f64(x)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}
