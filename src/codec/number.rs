//! Special double encoding.
//!
//! BiDi carries IEEE doubles as JSON numbers, except for four values JSON
//! cannot express. Those travel as reserved strings:
//!
//! | Value | Wire |
//! |-------|------|
//! | NaN | `"NaN"` |
//! | +∞ | `"Infinity"` |
//! | −∞ | `"-Infinity"` |
//! | −0.0 | `"-0"` |
//!
//! Use as a field adapter:
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct Sample {
//!     #[serde(with = "bidi_webdriver::codec::number")]
//!     value: f64,
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// Constants
// ============================================================================

/// Wire spelling of NaN.
pub const NAN: &str = "NaN";

/// Wire spelling of positive infinity.
pub const INFINITY: &str = "Infinity";

/// Wire spelling of negative infinity.
pub const NEG_INFINITY: &str = "-Infinity";

/// Wire spelling of negative zero.
pub const NEG_ZERO: &str = "-0";

// ============================================================================
// Spelling
// ============================================================================

/// Returns the reserved string for `value`, or `None` for plain numbers.
///
/// Negative zero is detected by bit pattern since `-0.0 == 0.0`.
#[must_use]
pub fn special_spelling(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        Some(NAN)
    } else if value == f64::INFINITY {
        Some(INFINITY)
    } else if value == f64::NEG_INFINITY {
        Some(NEG_INFINITY)
    } else if value.to_bits() == (-0.0f64).to_bits() {
        Some(NEG_ZERO)
    } else {
        None
    }
}

/// Parses one of the four reserved strings.
///
/// Ordinary numeric strings such as `"1.5"` or `"+0"` are rejected.
#[must_use]
pub fn parse_special(text: &str) -> Option<f64> {
    match text {
        NAN => Some(f64::NAN),
        INFINITY => Some(f64::INFINITY),
        NEG_INFINITY => Some(f64::NEG_INFINITY),
        NEG_ZERO => Some(-0.0),
        _ => None,
    }
}

// ============================================================================
// Field Adapter
// ============================================================================

/// Serializes an `f64` with special-value spelling.
pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    match special_spelling(*value) {
        Some(spelling) => serializer.serialize_str(spelling),
        None => serializer.serialize_f64(*value),
    }
}

/// Deserializes an `f64` from a JSON number or a reserved string.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    deserializer.deserialize_any(DoubleVisitor)
}

/// Adapter for `Option<f64>` fields.
pub mod option {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::WireDouble;

    /// Serializes `Some` with special-value spelling, `None` as `null`.
    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_some(&WireDouble(*value)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes an optional special-aware double.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(Option::<WireDouble>::deserialize(deserializer)?.map(|double| double.0))
    }
}

// ============================================================================
// WireDouble
// ============================================================================

/// An `f64` that serializes with special-value spelling.
///
/// Used where a `with` attribute cannot reach, e.g. inside hand-written
/// `Serialize` impls or collections.
#[derive(Debug, Clone, Copy)]
pub struct WireDouble(pub f64);

impl Serialize for WireDouble {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for WireDouble {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize(deserializer).map(WireDouble)
    }
}

struct DoubleVisitor;

impl Visitor<'_> for DoubleVisitor {
    type Value = f64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or one of \"NaN\", \"Infinity\", \"-Infinity\", \"-0\"")
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<f64, E> {
        Ok(value)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<f64, E> {
        Ok(value as f64)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<f64, E> {
        Ok(value as f64)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<f64, E> {
        parse_special(value).ok_or_else(|| E::invalid_value(Unexpected::Str(value), &self))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "super")]
        value: f64,
        #[serde(default, with = "option", skip_serializing_if = "Option::is_none")]
        extra: Option<f64>,
    }

    fn round_trip(value: f64) -> f64 {
        let text = serde_json::to_string(&Sample { value, extra: None }).expect("encode");
        let back: Sample = serde_json::from_str(&text).expect("decode");
        back.value
    }

    #[test]
    fn test_special_values_round_trip_bit_exact() {
        for value in [0.0, -0.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 3.14, -3.14] {
            assert_eq!(round_trip(value).to_bits(), value.to_bits(), "value {value}");
        }
    }

    #[test]
    fn test_special_spellings_on_wire() {
        let encode = |value| serde_json::to_value(WireDouble(value)).expect("encode");
        assert_eq!(encode(f64::NAN), json!("NaN"));
        assert_eq!(encode(f64::INFINITY), json!("Infinity"));
        assert_eq!(encode(f64::NEG_INFINITY), json!("-Infinity"));
        assert_eq!(encode(-0.0), json!("-0"));
        assert_eq!(encode(0.0), json!(0.0));
        assert_eq!(encode(2.5), json!(2.5));
    }

    #[test]
    fn test_positive_zero_is_not_negative_zero() {
        assert_eq!(special_spelling(0.0), None);
        assert_eq!(special_spelling(-0.0), Some(NEG_ZERO));
    }

    #[test]
    fn test_integers_decode() {
        let back: Sample = serde_json::from_str(r#"{"value": 42}"#).expect("decode");
        assert_eq!(back.value, 42.0);
        let back: Sample = serde_json::from_str(r#"{"value": -7}"#).expect("decode");
        assert_eq!(back.value, -7.0);
    }

    #[test]
    fn test_ordinary_numeric_strings_rejected() {
        for text in ["\"1.5\"", "\"+0\"", "\"nan\"", "\"inf\"", "\"0\""] {
            let raw = format!(r#"{{"value": {text}}}"#);
            assert!(serde_json::from_str::<Sample>(&raw).is_err(), "accepted {text}");
        }
    }

    #[test]
    fn test_option_adapter() {
        let back: Sample =
            serde_json::from_str(r#"{"value": 1, "extra": "-Infinity"}"#).expect("decode");
        assert_eq!(back.extra, Some(f64::NEG_INFINITY));

        let back: Sample = serde_json::from_str(r#"{"value": 1, "extra": null}"#).expect("decode");
        assert_eq!(back.extra, None);
    }

    proptest! {
        #[test]
        fn test_finite_doubles_round_trip(value in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
            prop_assert_eq!(round_trip(value).to_bits(), value.to_bits());
        }
    }
}
