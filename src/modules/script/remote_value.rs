//! Values serialized by the remote end.
//!
//! A [`RemoteValue`] is discriminated by its `type` field. Decoding looks the
//! discriminator up in a table built once on first use; unknown types decode
//! to [`RemoteValue::Unknown`] so newer remote ends do not break older
//! clients. A bare JSON string is shorthand for a string value, which is how
//! mapping keys travel.
//!
//! | `type` | Variant |
//! |--------|---------|
//! | `undefined`, `null` | [`RemoteValue::Undefined`], [`RemoteValue::Null`] |
//! | `string`, `number`, `boolean`, `bigint` | primitives |
//! | `array`, `set`, `nodelist`, `htmlcollection` | [`ListRemoteValue`] |
//! | `object`, `map` | [`MappingRemoteValue`] |
//! | `regexp`, `date` | with their own value |
//! | `node` | [`NodeRemoteValue`] |
//! | `window` | [`WindowRemoteValue`] |
//! | `symbol`, `function`, `weakmap`, `weakset`, `generator`, `error`, `proxy`, `promise`, `typedarray`, `arraybuffer` | [`ObjectHandle`] only |

// ============================================================================
// Imports
// ============================================================================

use std::sync::LazyLock;

use rustc_hash::FxHashMap;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::codec::number::WireDouble;
use crate::codec::{self, TYPE_FIELD};
use crate::error::Error;
use crate::identifiers::{BrowsingContextId, Handle, InternalId, SharedId};

// ============================================================================
// Constants
// ============================================================================

/// Largest integer an IEEE double holds exactly (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

// ============================================================================
// Types
// ============================================================================

/// Decodes one discriminated shape.
type Decoder = fn(Value) -> Result<RemoteValue, serde_json::Error>;

/// Handle and internal id carried by every object-like value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectHandle {
    /// Present when the value was serialized with `resultOwnership: root`.
    #[serde(default)]
    pub handle: Option<Handle>,
    /// Stable within one serialization; marks repeated references.
    #[serde(default)]
    pub internal_id: Option<InternalId>,
}

/// Ordered collection value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListRemoteValue {
    #[serde(flatten)]
    pub object: ObjectHandle,
    /// `None` past the serialization depth limit.
    #[serde(default)]
    pub value: Option<Vec<RemoteValue>>,
}

/// Key/value collection value. Keys are usually [`RemoteValue::String`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MappingRemoteValue {
    #[serde(flatten)]
    pub object: ObjectHandle,
    #[serde(default)]
    pub value: Option<Vec<(RemoteValue, RemoteValue)>>,
}

/// A DOM node.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRemoteValue {
    /// Reference usable across realms of the same document.
    #[serde(default)]
    pub shared_id: Option<SharedId>,
    #[serde(flatten)]
    pub object: ObjectHandle,
    #[serde(default)]
    pub value: Option<NodeProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProperties {
    pub node_type: u32,
    pub child_node_count: u32,
    #[serde(default)]
    pub attributes: Option<FxHashMap<String, String>>,
    #[serde(default)]
    pub children: Option<Vec<RemoteValue>>,
    #[serde(default)]
    pub local_name: Option<String>,
    #[serde(default)]
    pub mode: Option<ShadowRootMode>,
    #[serde(default, rename = "namespaceURI")]
    pub namespace_uri: Option<String>,
    #[serde(default)]
    pub node_value: Option<String>,
    #[serde(default)]
    pub shadow_root: Option<Box<RemoteValue>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShadowRootMode {
    Open,
    Closed,
}

/// A window proxy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WindowRemoteValue {
    #[serde(flatten)]
    pub object: ObjectHandle,
    pub value: WindowProxyProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WindowProxyProperties {
    pub context: BrowsingContextId,
}

// ============================================================================
// RemoteValue
// ============================================================================

/// A value as serialized by the remote end.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteValue {
    Undefined,
    Null,
    String(String),
    /// May be `NaN`, an infinity or `-0.0`.
    Number(f64),
    Boolean(bool),
    /// Decimal digits.
    BigInt(String),
    Symbol(ObjectHandle),
    Array(ListRemoteValue),
    Object(MappingRemoteValue),
    Function(ObjectHandle),
    RegExp {
        object: ObjectHandle,
        pattern: String,
        flags: Option<String>,
    },
    /// ISO 8601 string.
    Date {
        object: ObjectHandle,
        value: String,
    },
    Map(MappingRemoteValue),
    Set(ListRemoteValue),
    WeakMap(ObjectHandle),
    WeakSet(ObjectHandle),
    Generator(ObjectHandle),
    Error(ObjectHandle),
    Proxy(ObjectHandle),
    Promise(ObjectHandle),
    TypedArray(ObjectHandle),
    ArrayBuffer(ObjectHandle),
    NodeList(ListRemoteValue),
    HtmlCollection(ListRemoteValue),
    Node(NodeRemoteValue),
    Window(WindowRemoteValue),
    /// A `type` this crate does not know; the raw object is kept.
    Unknown { kind: String, raw: Value },
}

impl RemoteValue {
    /// Decodes a remote value from a parsed JSON tree.
    ///
    /// # Errors
    ///
    /// Fails if `value` is neither a string nor an object with a `type`, or
    /// if a known type's payload has the wrong shape.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        if let Value::String(text) = value {
            return Ok(Self::String(text));
        }

        let decoder = match codec::discriminator(&value, TYPE_FIELD) {
            None => return Err(de::Error::missing_field(TYPE_FIELD)),
            Some(kind) => match DECODERS.get(kind) {
                Some(decoder) => *decoder,
                None => {
                    let kind = kind.to_owned();
                    return Ok(Self::Unknown { kind, raw: value });
                }
            },
        };

        decoder(value)
    }

    /// Returns the wire discriminator.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::BigInt(_) => "bigint",
            Self::Symbol(_) => "symbol",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
            Self::RegExp { .. } => "regexp",
            Self::Date { .. } => "date",
            Self::Map(_) => "map",
            Self::Set(_) => "set",
            Self::WeakMap(_) => "weakmap",
            Self::WeakSet(_) => "weakset",
            Self::Generator(_) => "generator",
            Self::Error(_) => "error",
            Self::Proxy(_) => "proxy",
            Self::Promise(_) => "promise",
            Self::TypedArray(_) => "typedarray",
            Self::ArrayBuffer(_) => "arraybuffer",
            Self::NodeList(_) => "nodelist",
            Self::HtmlCollection(_) => "htmlcollection",
            Self::Node(_) => "node",
            Self::Window(_) => "window",
            Self::Unknown { kind, .. } => kind,
        }
    }

    /// Returns the text of a `string` value.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text),
            _ => None,
        }
    }

    /// Returns a `number` value, special doubles included.
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }

    /// Returns a `boolean` value.
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Returns the object handle, for values that own one.
    #[must_use]
    pub fn handle(&self) -> Option<&Handle> {
        self.object().and_then(|object| object.handle.as_ref())
    }

    /// Returns the shared id of a node.
    #[must_use]
    pub fn shared_id(&self) -> Option<&SharedId> {
        match self {
            Self::Node(node) => node.shared_id.as_ref(),
            _ => None,
        }
    }

    fn object(&self) -> Option<&ObjectHandle> {
        match self {
            Self::Symbol(object)
            | Self::Function(object)
            | Self::WeakMap(object)
            | Self::WeakSet(object)
            | Self::Generator(object)
            | Self::Error(object)
            | Self::Proxy(object)
            | Self::Promise(object)
            | Self::TypedArray(object)
            | Self::ArrayBuffer(object)
            | Self::RegExp { object, .. }
            | Self::Date { object, .. } => Some(object),
            Self::Array(list) | Self::Set(list) | Self::NodeList(list) | Self::HtmlCollection(list) => {
                Some(&list.object)
            }
            Self::Object(mapping) | Self::Map(mapping) => Some(&mapping.object),
            Self::Node(node) => Some(&node.object),
            Self::Window(window) => Some(&window.object),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl RemoteValue {
    /// Converts to plain JSON.
    ///
    /// | Remote value | JSON |
    /// |--------------|------|
    /// | `undefined`, `null` | `null` |
    /// | `string`, `bigint`, `date` | string |
    /// | `number` | integer when integral and exact, float otherwise |
    /// | `array`, `set`, `nodelist`, `htmlcollection` | array |
    /// | `object`, `map` with string keys | object |
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] naming the failing path for values without
    /// a JSON form: `NaN` and the infinities, non-string mapping keys,
    /// collections cut off by the serialization depth and handle-only
    /// values such as functions or nodes.
    pub fn to_json(&self) -> crate::Result<Value> {
        self.json_at("$")
    }

    /// Deserializes the value into `T` through its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the value has no JSON form or does not
    /// match `T`.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> crate::Result<T> {
        codec::decode_value(&self.to_json()?)
    }

    fn json_at(&self, path: &str) -> crate::Result<Value> {
        let unsupported = |reason: &str| Error::decode("JSON value", path, self.kind(), reason);

        match self {
            Self::Undefined | Self::Null => Ok(Value::Null),
            Self::String(text) | Self::BigInt(text) | Self::Date { value: text, .. } => {
                Ok(Value::String(text.clone()))
            }
            Self::Boolean(flag) => Ok(Value::Bool(*flag)),
            Self::Number(number) => number_to_json(*number).ok_or_else(|| unsupported("non-finite number")),
            Self::Array(list) | Self::Set(list) | Self::NodeList(list) | Self::HtmlCollection(list) => {
                let items = list
                    .value
                    .as_ref()
                    .ok_or_else(|| unsupported("contents past serialization depth"))?;
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| item.json_at(&format!("{path}[{index}]")))
                    .collect::<crate::Result<Vec<_>>>()
                    .map(Value::Array)
            }
            Self::Object(mapping) | Self::Map(mapping) => {
                let entries = mapping
                    .value
                    .as_ref()
                    .ok_or_else(|| unsupported("contents past serialization depth"))?;
                let mut object = Map::new();
                for (key, value) in entries {
                    let Self::String(key) = key else {
                        return Err(Error::decode(
                            "JSON value",
                            path,
                            key.kind(),
                            "mapping key is not a string",
                        ));
                    };
                    object.insert(key.clone(), value.json_at(&format!("{path}.{key}"))?);
                }
                Ok(Value::Object(object))
            }
            _ => Err(unsupported("no JSON form")),
        }
    }
}

/// Integral doubles become JSON integers so they decode into integer types.
fn number_to_json(number: f64) -> Option<Value> {
    let integral = number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER;
    if integral && !(number == 0.0 && number.is_sign_negative()) {
        return Some(Value::from(number as i64));
    }
    serde_json::Number::from_f64(number).map(Value::Number)
}

fn mismatch(shape: &str, value: &RemoteValue) -> Error {
    Error::decode(shape, ".", value.kind(), format!("cannot convert {} value", value.kind()))
}

impl TryFrom<RemoteValue> for String {
    type Error = Error;

    fn try_from(value: RemoteValue) -> crate::Result<Self> {
        match value {
            RemoteValue::String(text) => Ok(text),
            other => Err(mismatch("String", &other)),
        }
    }
}

impl TryFrom<RemoteValue> for f64 {
    type Error = Error;

    fn try_from(value: RemoteValue) -> crate::Result<Self> {
        value.as_f64().ok_or_else(|| mismatch("f64", &value))
    }
}

impl TryFrom<RemoteValue> for bool {
    type Error = Error;

    fn try_from(value: RemoteValue) -> crate::Result<Self> {
        value.as_bool().ok_or_else(|| mismatch("bool", &value))
    }
}

/// Accepts integral numbers within 2^53 and `bigint` values that fit.
impl TryFrom<RemoteValue> for i64 {
    type Error = Error;

    fn try_from(value: RemoteValue) -> crate::Result<Self> {
        match &value {
            RemoteValue::Number(number)
                if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER =>
            {
                Ok(*number as i64)
            }
            RemoteValue::BigInt(digits) => digits.parse().map_err(|_| mismatch("i64", &value)),
            _ => Err(mismatch("i64", &value)),
        }
    }
}

impl<'de> Deserialize<'de> for RemoteValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(value).map_err(de::Error::custom)
    }
}

// ============================================================================
// Decoder Table
// ============================================================================

#[derive(Deserialize)]
struct Primitive<T> {
    value: T,
}

#[derive(Deserialize)]
struct RegExpValue {
    #[serde(flatten)]
    object: ObjectHandle,
    value: RegExpProperties,
}

#[derive(Deserialize)]
struct RegExpProperties {
    pattern: String,
    #[serde(default)]
    flags: Option<String>,
}

#[derive(Deserialize)]
struct DateValue {
    #[serde(flatten)]
    object: ObjectHandle,
    value: String,
}

fn parse<T: DeserializeOwned>(value: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(value)
}

static DECODERS: LazyLock<FxHashMap<&'static str, Decoder>> = LazyLock::new(|| {
    let mut table: FxHashMap<&'static str, Decoder> = FxHashMap::default();

    table.insert("undefined", |_| Ok(RemoteValue::Undefined));
    table.insert("null", |_| Ok(RemoteValue::Null));
    table.insert("string", |v| {
        parse::<Primitive<String>>(v).map(|p| RemoteValue::String(p.value))
    });
    table.insert("number", |v| {
        parse::<Primitive<WireDouble>>(v).map(|p| RemoteValue::Number(p.value.0))
    });
    table.insert("boolean", |v| {
        parse::<Primitive<bool>>(v).map(|p| RemoteValue::Boolean(p.value))
    });
    table.insert("bigint", |v| {
        parse::<Primitive<String>>(v).map(|p| RemoteValue::BigInt(p.value))
    });

    table.insert("symbol", |v| parse(v).map(RemoteValue::Symbol));
    table.insert("function", |v| parse(v).map(RemoteValue::Function));
    table.insert("weakmap", |v| parse(v).map(RemoteValue::WeakMap));
    table.insert("weakset", |v| parse(v).map(RemoteValue::WeakSet));
    table.insert("generator", |v| parse(v).map(RemoteValue::Generator));
    table.insert("error", |v| parse(v).map(RemoteValue::Error));
    table.insert("proxy", |v| parse(v).map(RemoteValue::Proxy));
    table.insert("promise", |v| parse(v).map(RemoteValue::Promise));
    table.insert("typedarray", |v| parse(v).map(RemoteValue::TypedArray));
    table.insert("arraybuffer", |v| parse(v).map(RemoteValue::ArrayBuffer));

    table.insert("array", |v| parse(v).map(RemoteValue::Array));
    table.insert("set", |v| parse(v).map(RemoteValue::Set));
    table.insert("nodelist", |v| parse(v).map(RemoteValue::NodeList));
    table.insert("htmlcollection", |v| parse(v).map(RemoteValue::HtmlCollection));
    table.insert("object", |v| parse(v).map(RemoteValue::Object));
    table.insert("map", |v| parse(v).map(RemoteValue::Map));

    table.insert("regexp", |v| {
        parse::<RegExpValue>(v).map(|r| RemoteValue::RegExp {
            object: r.object,
            pattern: r.value.pattern,
            flags: r.value.flags,
        })
    });
    table.insert("date", |v| {
        parse::<DateValue>(v).map(|d| RemoteValue::Date {
            object: d.object,
            value: d.value,
        })
    });
    table.insert("node", |v| parse(v).map(RemoteValue::Node));
    table.insert("window", |v| parse(v).map(RemoteValue::Window));

    table
});

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn decode(value: Value) -> RemoteValue {
        codec::decode_value(&value).expect("decode")
    }

    #[test]
    fn test_every_discriminator_selects_its_variant() {
        let kinds = [
            "undefined", "null", "symbol", "function", "weakmap", "weakset", "generator",
            "error", "proxy", "promise", "typedarray", "arraybuffer", "array", "set",
            "nodelist", "htmlcollection", "object", "map", "node",
        ];
        for kind in kinds {
            let value = decode(json!({"type": kind}));
            assert_eq!(value.kind(), kind);
        }

        assert_eq!(decode(json!({"type": "string", "value": "s"})).kind(), "string");
        assert_eq!(decode(json!({"type": "number", "value": 1})).kind(), "number");
        assert_eq!(decode(json!({"type": "boolean", "value": true})).kind(), "boolean");
        assert_eq!(decode(json!({"type": "bigint", "value": "9"})).kind(), "bigint");
        assert_eq!(
            decode(json!({"type": "regexp", "value": {"pattern": "a+"}})).kind(),
            "regexp"
        );
        assert_eq!(
            decode(json!({"type": "date", "value": "2024-01-01T00:00:00.000Z"})).kind(),
            "date"
        );
        assert_eq!(
            decode(json!({"type": "window", "value": {"context": "c"}})).kind(),
            "window"
        );
    }

    #[test]
    fn test_bare_string_is_string_value() {
        assert_eq!(decode(json!("key")), RemoteValue::String("key".to_owned()));
    }

    #[test]
    fn test_special_numbers() {
        let nan = decode(json!({"type": "number", "value": "NaN"}));
        assert!(nan.as_f64().expect("number").is_nan());

        let neg_zero = decode(json!({"type": "number", "value": "-0"}));
        assert_eq!(neg_zero.as_f64().map(f64::to_bits), Some((-0.0f64).to_bits()));

        let err = codec::decode_value::<RemoteValue>(&json!({"type": "number", "value": "1.5"}))
            .expect_err("not a special spelling");
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_unknown_type_is_kept() {
        let value = decode(json!({"type": "temporal", "value": 1}));
        match value {
            RemoteValue::Unknown { kind, raw } => {
                assert_eq!(kind, "temporal");
                assert_eq!(raw["value"], 1);
            }
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn test_missing_type_is_decode_error() {
        let err = codec::decode_value::<RemoteValue>(&json!({"value": 1})).expect_err("no type");
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_nested_mapping() {
        let value = decode(json!({
            "type": "object",
            "handle": "h-1",
            "value": [
                ["a", {"type": "number", "value": 1}],
                [{"type": "number", "value": 2}, {"type": "array", "value": [{"type": "null"}]}]
            ]
        }));

        assert_eq!(value.handle().map(Handle::as_str), Some("h-1"));
        let RemoteValue::Object(mapping) = value else {
            panic!("expected object");
        };
        let entries = mapping.value.expect("entries");
        assert_eq!(entries[0].0.as_str(), Some("a"));
        assert_eq!(entries[1].0.as_f64(), Some(2.0));
        assert!(matches!(&entries[1].1, RemoteValue::Array(list) if list.value.as_ref().map(Vec::len) == Some(1)));
    }

    #[test]
    fn test_node_value() {
        let value = decode(json!({
            "type": "node",
            "sharedId": "node-1",
            "value": {
                "nodeType": 1,
                "childNodeCount": 0,
                "localName": "div",
                "namespaceURI": "http://www.w3.org/1999/xhtml",
                "attributes": {"id": "main"}
            }
        }));

        assert_eq!(value.shared_id().map(SharedId::as_str), Some("node-1"));
        let RemoteValue::Node(node) = value else {
            panic!("expected node");
        };
        let properties = node.value.expect("properties");
        assert_eq!(properties.local_name.as_deref(), Some("div"));
        assert_eq!(
            properties.attributes.as_ref().and_then(|a| a.get("id")).map(String::as_str),
            Some("main")
        );
    }

    #[test]
    fn test_nested_failure_reports_path() {
        #[derive(Debug, Deserialize)]
        struct Wrapper {
            #[allow(dead_code)]
            result: RemoteValue,
        }

        let err = codec::decode_value::<Wrapper>(&json!({"result": {"type": "boolean", "value": "yes"}}))
            .expect_err("bad boolean");
        match err {
            crate::error::Error::Decode { path, .. } => assert_eq!(path, "result"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_to_json_collections() {
        let value = decode(json!({"type": "object", "value": [
            ["name", {"type": "string", "value": "Ada"}],
            ["scores", {"type": "array", "value": [
                {"type": "number", "value": 1},
                {"type": "number", "value": 2.5},
                {"type": "bigint", "value": "12345678901234567890"}
            ]}],
            ["seen", {"type": "undefined"}]
        ]}));

        assert_eq!(
            value.to_json().expect("json"),
            json!({"name": "Ada", "scores": [1, 2.5, "12345678901234567890"], "seen": null})
        );
    }

    #[test]
    fn test_to_json_failures_name_the_path() {
        let value = decode(json!({"type": "array", "value": [
            {"type": "number", "value": 1},
            {"type": "number", "value": "NaN"}
        ]}));
        let err = value.to_json().expect_err("NaN");
        assert!(err.is_decode_error());
        assert!(err.to_string().contains("$[1]"));

        let keyed = decode(json!({"type": "map", "value": [
            [{"type": "number", "value": 1}, {"type": "null"}]
        ]}));
        assert!(keyed.to_json().expect_err("number key").to_string().contains("not a string"));

        let function = decode(json!({"type": "function", "handle": "h"}));
        assert!(function.to_json().is_err());
    }

    #[test]
    fn test_deserialize_into_struct() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Point {
            x: u32,
            y: i64,
            label: Option<String>,
        }

        let value = decode(json!({"type": "object", "value": [
            ["x", {"type": "number", "value": 3}],
            ["y", {"type": "number", "value": -4}],
            ["label", {"type": "null"}]
        ]}));

        let point: Point = value.deserialize_into().expect("point");
        assert_eq!(point, Point { x: 3, y: -4, label: None });

        let wrong = decode(json!({"type": "object", "value": [["x", "three"]]}));
        let err = wrong.deserialize_into::<Point>().expect_err("shape");
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_try_from_primitives() {
        let text: String = decode(json!({"type": "string", "value": "hi"}))
            .try_into()
            .expect("string");
        assert_eq!(text, "hi");

        let count: i64 = decode(json!({"type": "number", "value": 42}))
            .try_into()
            .expect("integer");
        assert_eq!(count, 42);

        let big: i64 = RemoteValue::BigInt("9007199254740993".to_owned())
            .try_into()
            .expect("bigint");
        assert_eq!(big, 9_007_199_254_740_993);

        let infinite: f64 = decode(json!({"type": "number", "value": "Infinity"}))
            .try_into()
            .expect("number");
        assert!(infinite.is_infinite());

        assert!(i64::try_from(RemoteValue::Number(1.5)).is_err());
        assert!(bool::try_from(RemoteValue::Null).is_err());
        assert!(String::try_from(RemoteValue::Boolean(true)).is_err());
    }
}
