//! JSON form of floating point values.
//!
//! JSON numbers cannot hold NaN or the infinities. Those are stored as the
//! string tokens `"NaN"`, `"Infinity"` and `"-Infinity"`; every finite value
//! is stored as a plain number.

use serde_json::Value as Json;

const NAN: &str = "NaN";
const INFINITY: &str = "Infinity";
const NEG_INFINITY: &str = "-Infinity";

/// Converts `value` to its stored form.
#[must_use]
pub fn to_json(value: f64) -> Json {
    if value.is_nan() {
        Json::from(NAN)
    } else if value == f64::INFINITY {
        Json::from(INFINITY)
    } else if value == f64::NEG_INFINITY {
        Json::from(NEG_INFINITY)
    } else {
        Json::from(value)
    }
}

/// Converts a slice to a stored array.
#[must_use]
pub fn array_to_json(values: &[f64]) -> Json {
    Json::Array(values.iter().copied().map(to_json).collect())
}

/// Reads a value written by [`to_json`]. Returns `None` for any other shape.
#[must_use]
pub fn from_json(json: &Json) -> Option<f64> {
    match json {
        Json::Number(n) => n.as_f64(),
        Json::String(token) => match token.as_str() {
            NAN => Some(f64::NAN),
            INFINITY => Some(f64::INFINITY),
            NEG_INFINITY => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}
