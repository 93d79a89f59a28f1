//! Three-state optional field.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// Nullable
// ============================================================================

/// A field that can be omitted, sent as `null`, or carry a value.
///
/// `Option<T>` collapses "leave unchanged" and "reset" into one state.
/// BiDi overrides need both, so fields that accept `null` use this type:
///
/// ```ignore
/// #[derive(Serialize)]
/// struct Params {
///     #[serde(default, skip_serializing_if = "Nullable::is_absent")]
///     locale: Nullable<String>,
/// }
/// ```
///
/// | State | Encodes as |
/// |-------|-----------|
/// | [`Nullable::Absent`] | field omitted |
/// | [`Nullable::Null`] | `null` |
/// | [`Nullable::Value`] | the value |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nullable<T> {
    /// Field not present.
    Absent,
    /// Field present with an explicit `null`.
    Null,
    /// Field present with a value.
    Value(T),
}

impl<T> Nullable<T> {
    /// Returns `true` if the field is omitted.
    #[inline]
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Returns `true` if the field is an explicit `null`.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the value if present.
    #[inline]
    #[must_use]
    pub const fn as_value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Consumes `self`, returning the value if present.
    #[inline]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Maps the contained value, keeping `Absent` and `Null` as they are.
    #[inline]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Nullable<U> {
        match self {
            Self::Absent => Nullable::Absent,
            Self::Null => Nullable::Null,
            Self::Value(value) => Nullable::Value(f(value)),
        }
    }
}

impl<T> Default for Nullable<T> {
    #[inline]
    fn default() -> Self {
        Self::Absent
    }
}

/// `None` is an explicit `null`; use [`Nullable::Absent`] to omit the field.
impl<T> From<Option<T>> for Nullable<T> {
    #[inline]
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Value)
    }
}

impl<T: Serialize> Serialize for Nullable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // Reached only when the field lacks `skip_serializing_if`.
            Self::Absent | Self::Null => serializer.serialize_none(),
            Self::Value(value) => serializer.serialize_some(value),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Nullable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Override {
        #[serde(default, skip_serializing_if = "Nullable::is_absent")]
        timezone: Nullable<String>,
    }

    #[test]
    fn test_absent_is_omitted() {
        let json = serde_json::to_value(Override::default()).expect("encode");
        assert_eq!(json, json!({}));
    }

    #[test]
    fn test_null_is_emitted() {
        let value = Override {
            timezone: Nullable::Null,
        };
        let json = serde_json::to_value(value).expect("encode");
        assert_eq!(json, json!({"timezone": null}));
    }

    #[test]
    fn test_value_is_emitted() {
        let value = Override {
            timezone: Some("Europe/Berlin".to_owned()).into(),
        };
        let json = serde_json::to_value(value).expect("encode");
        assert_eq!(json, json!({"timezone": "Europe/Berlin"}));
    }

    #[test]
    fn test_decode_three_states() {
        let absent: Override = serde_json::from_value(json!({})).expect("decode");
        let null: Override = serde_json::from_value(json!({"timezone": null})).expect("decode");
        let value: Override = serde_json::from_value(json!({"timezone": "UTC"})).expect("decode");

        assert!(absent.timezone.is_absent());
        assert!(null.timezone.is_null());
        assert_eq!(value.timezone.as_value().map(String::as_str), Some("UTC"));
    }

    #[test]
    fn test_map_preserves_state() {
        assert!(Nullable::<u8>::Absent.map(u16::from).is_absent());
        assert!(Nullable::<u8>::Null.map(u16::from).is_null());
        assert_eq!(Nullable::Value(3u8).map(u16::from).into_value(), Some(3));
    }
}
