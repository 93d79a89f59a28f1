//! Values sent to the remote end as function arguments or `this`.

// ============================================================================
// Imports
// ============================================================================

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::codec::{self, number::WireDouble};
use crate::identifiers::{ChannelId, Handle, SharedId};

use super::{ResultOwnership, SerializationOptions};

// ============================================================================
// References
// ============================================================================

/// Reference to a node by its shared id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedReference {
    pub shared_id: SharedId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<Handle>,
}

impl SharedReference {
    /// A reference by shared id alone.
    #[inline]
    #[must_use]
    pub fn new(shared_id: SharedId) -> Self {
        Self {
            shared_id,
            handle: None,
        }
    }
}

/// Reference to a remote object by handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObjectReference {
    pub handle: Handle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_id: Option<SharedId>,
}

/// A channel argument: the function receives a callback whose calls are
/// delivered as `script.message` events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "channel")]
pub struct ChannelValue {
    pub value: ChannelProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProperties {
    pub channel: ChannelId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialization_options: Option<SerializationOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership: Option<ResultOwnership>,
}

impl ChannelValue {
    /// A channel with default serialization and ownership.
    #[must_use]
    pub fn new(channel: ChannelId) -> Self {
        Self {
            value: ChannelProperties {
                channel,
                serialization_options: None,
                ownership: None,
            },
        }
    }
}

// ============================================================================
// Constants
// ============================================================================

/// Largest integer an IEEE double holds exactly (2^53 - 1).
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

// ============================================================================
// LocalValue
// ============================================================================

/// Mapping key: a plain string or any local value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MappingKey {
    String(String),
    Value(LocalValue),
}

/// A value built locally and deserialized by the remote end.
///
/// Numbers use the special spelling for `NaN`, the infinities and `-0`.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalValue {
    Undefined,
    Null,
    String(String),
    Number(f64),
    Boolean(bool),
    /// Decimal digits.
    BigInt(String),
    Array(Vec<LocalValue>),
    /// ISO 8601 string.
    Date(String),
    Map(Vec<(MappingKey, LocalValue)>),
    Object(Vec<(MappingKey, LocalValue)>),
    RegExp {
        pattern: String,
        flags: Option<String>,
    },
    Set(Vec<LocalValue>),
    Channel(ChannelProperties),
    SharedReference(SharedReference),
    RemoteObjectReference(RemoteObjectReference),
}

#[derive(Serialize)]
struct RegExpProperties<'a> {
    pattern: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    flags: Option<&'a str>,
}

impl Serialize for LocalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::SharedReference(reference) => return reference.serialize(serializer),
            Self::RemoteObjectReference(reference) => return reference.serialize(serializer),
            _ => {}
        }

        let mut map = serializer.serialize_map(None)?;
        match self {
            Self::Undefined => map.serialize_entry("type", "undefined")?,
            Self::Null => map.serialize_entry("type", "null")?,
            Self::String(text) => {
                map.serialize_entry("type", "string")?;
                map.serialize_entry("value", text)?;
            }
            Self::Number(number) => {
                map.serialize_entry("type", "number")?;
                map.serialize_entry("value", &WireDouble(*number))?;
            }
            Self::Boolean(flag) => {
                map.serialize_entry("type", "boolean")?;
                map.serialize_entry("value", flag)?;
            }
            Self::BigInt(digits) => {
                map.serialize_entry("type", "bigint")?;
                map.serialize_entry("value", digits)?;
            }
            Self::Array(items) => {
                map.serialize_entry("type", "array")?;
                map.serialize_entry("value", items)?;
            }
            Self::Date(date) => {
                map.serialize_entry("type", "date")?;
                map.serialize_entry("value", date)?;
            }
            Self::Map(entries) => {
                map.serialize_entry("type", "map")?;
                map.serialize_entry("value", entries)?;
            }
            Self::Object(entries) => {
                map.serialize_entry("type", "object")?;
                map.serialize_entry("value", entries)?;
            }
            Self::RegExp { pattern, flags } => {
                map.serialize_entry("type", "regexp")?;
                map.serialize_entry(
                    "value",
                    &RegExpProperties {
                        pattern,
                        flags: flags.as_deref(),
                    },
                )?;
            }
            Self::Set(items) => {
                map.serialize_entry("type", "set")?;
                map.serialize_entry("value", items)?;
            }
            Self::Channel(properties) => {
                map.serialize_entry("type", "channel")?;
                map.serialize_entry("value", properties)?;
            }
            Self::SharedReference(_) | Self::RemoteObjectReference(_) => {}
        }
        map.end()
    }
}

impl LocalValue {
    /// Builds an object from string keys.
    #[must_use]
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, LocalValue)>) -> Self {
        Self::Object(
            entries
                .into_iter()
                .map(|(key, value)| (MappingKey::String(key.into()), value))
                .collect(),
        )
    }

    /// Builds a `Set` from anything convertible.
    #[must_use]
    pub fn set<T: Into<LocalValue>>(items: impl IntoIterator<Item = T>) -> Self {
        Self::Set(items.into_iter().map(Into::into).collect())
    }

    /// Converts a JSON tree.
    ///
    /// | JSON | Local value |
    /// |------|-------------|
    /// | `null` | `Null` |
    /// | boolean, string | `Boolean`, `String` |
    /// | number | `Number`, or `BigInt` for integers past 2^53 |
    /// | array | `Array` |
    /// | object | `Object` with string keys, in the map's key order |
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Boolean(*flag),
            Value::String(text) => Self::String(text.clone()),
            Value::Number(number) => {
                let exact = number
                    .as_u64()
                    .map(|n| n <= MAX_SAFE_INTEGER)
                    .or_else(|| number.as_i64().map(|n| n.unsigned_abs() <= MAX_SAFE_INTEGER));
                match (exact, number.as_f64()) {
                    (Some(false), _) | (_, None) => Self::BigInt(number.to_string()),
                    (_, Some(float)) => Self::Number(float),
                }
            }
            Value::Array(items) => Self::Array(items.iter().map(Self::from_json).collect()),
            Value::Object(entries) => Self::Object(
                entries
                    .iter()
                    .map(|(key, value)| (MappingKey::String(key.clone()), Self::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Converts any serializable value through its JSON form.
    ///
    /// Structs and string-keyed maps become objects with their keys sorted;
    /// sequences, tuples and sets become arrays. Use [`LocalValue::set`] or [`LocalValue::Map`]
    /// when the function expects a JavaScript `Set` or `Map`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if `value` fails to
    /// serialize, e.g. a map with non-string keys.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> crate::Result<Self> {
        codec::to_value(value).map(|json| Self::from_json(&json))
    }
}

impl From<&str> for LocalValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for LocalValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for LocalValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for LocalValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for LocalValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for LocalValue {
    fn from(value: i64) -> Self {
        Self::from_json(&Value::from(value))
    }
}

impl From<u32> for LocalValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<Value> for LocalValue {
    fn from(value: Value) -> Self {
        Self::from_json(&value)
    }
}

impl<T: Into<LocalValue>> From<Option<T>> for LocalValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<LocalValue>> From<Vec<T>> for LocalValue {
    fn from(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

impl<T: Into<LocalValue>> FromIterator<T> for LocalValue {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::Array(iter.into_iter().map(Into::into).collect())
    }
}

impl From<SharedReference> for LocalValue {
    fn from(value: SharedReference) -> Self {
        Self::SharedReference(value)
    }
}

impl From<RemoteObjectReference> for LocalValue {
    fn from(value: RemoteObjectReference) -> Self {
        Self::RemoteObjectReference(value)
    }
}

// ============================================================================
// Tests
// ============================================================================
