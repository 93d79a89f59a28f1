//! Wire codec.
//!
//! Encodes outgoing parameter objects to JSON text and decodes inbound JSON
//! into typed results and event payloads.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `number` | Special double spelling (`NaN`, `Infinity`, `-Infinity`, `-0`) |
//! | `nullable` | Absent / `null` / value field state |
//!
//! Polymorphic payloads (remote values, log entries, realm info) implement
//! their discriminator dispatch next to their types and report failures
//! through [`decode`] / [`decode_value`], which wrap every error in
//! [`Error::Decode`] with the JSON path of the failing element.

// ============================================================================
// Submodules
// ============================================================================

pub mod number;

mod nullable;

// ============================================================================
// Imports
// ============================================================================

use std::any::type_name;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_path_to_error::{Path, Segment};

use crate::error::{Error, Result};

// ============================================================================
// Re-exports
// ============================================================================

pub use nullable::Nullable;

// ============================================================================
// Constants
// ============================================================================

/// Maximum characters of an offending token quoted in a decode error.
const TOKEN_SNIPPET_LEN: usize = 64;

/// Discriminator field shared by polymorphic payloads.
pub const TYPE_FIELD: &str = "type";

// ============================================================================
// Encoding
// ============================================================================

/// Encodes a value as compact, newline-free JSON text.
///
/// # Errors
///
/// Returns [`Error::Json`] if the value cannot be represented as JSON.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Encodes a value into a JSON tree.
///
/// # Errors
///
/// Returns [`Error::Json`] if the value cannot be represented as JSON.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes JSON text into `T`.
///
/// # Errors
///
/// Returns [`Error::Decode`] on malformed JSON, trailing data, missing
/// required fields or unknown enum spellings.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_str(text);

    let value = serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        let token = text_snippet(text, inner.line(), inner.column());
        Error::decode(type_name::<T>(), path, token, inner.to_string())
    })?;

    deserializer.end().map_err(|err| {
        let token = text_snippet(text, err.line(), err.column());
        Error::decode(type_name::<T>(), ".", token, err.to_string())
    })?;

    Ok(value)
}

/// Decodes an already parsed JSON tree into `T`.
///
/// # Errors
///
/// Returns [`Error::Decode`] quoting the sub-tree where decoding stopped.
pub fn decode_value<T: DeserializeOwned>(value: &Value) -> Result<T> {
    serde_path_to_error::deserialize(value).map_err(|err| {
        let token = token_at(value, err.path());
        Error::decode(
            type_name::<T>(),
            err.path().to_string(),
            token,
            err.inner().to_string(),
        )
    })
}

/// Reads a string discriminator field from a JSON object.
#[inline]
#[must_use]
pub fn discriminator<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str)
}

// ============================================================================
// Helpers
// ============================================================================

/// Walks `path` into `root` and renders the deepest reachable node.
fn token_at(root: &Value, path: &Path) -> String {
    let mut current = root;

    for segment in path.iter() {
        let next = match segment {
            Segment::Seq { index } => current.get(*index),
            Segment::Map { key } => current.get(key.as_str()),
            Segment::Enum { .. } | Segment::Unknown => continue,
        };

        match next {
            Some(node) => current = node,
            None => break,
        }
    }

    truncate(&current.to_string())
}

/// Extracts the text preceding a 1-based line/column position.
fn text_snippet(text: &str, line: usize, column: usize) -> String {
    let Some(row) = text.lines().nth(line.saturating_sub(1)) else {
        return truncate(text);
    };

    let chars: Vec<char> = row.chars().collect();
    let end = column.min(chars.len());
    let start = end.saturating_sub(TOKEN_SNIPPET_LEN);

    chars[start..end].iter().collect()
}

fn truncate(text: &str) -> String {
    text.chars().take(TOKEN_SNIPPET_LEN).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Status {
        ready: bool,
        message: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    enum Readiness {
        None,
        Interactive,
        Complete,
    }

    #[test]
    fn test_decode_text() {
        let status: Status = decode(r#"{"ready": true, "message": "ok"}"#).expect("decode");
        assert!(status.ready);
        assert_eq!(status.message, "ok");
    }

    #[test]
    fn test_decode_missing_field_reports_shape() {
        let err = decode::<Status>(r#"{"ready": true}"#).expect_err("missing field");
        match err {
            Error::Decode { shape, message, .. } => {
                assert!(shape.ends_with("Status"));
                assert!(message.contains("message"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_malformed_json() {
        let err = decode::<Status>(r#"{"ready": tru"#).expect_err("malformed");
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_decode_trailing_data() {
        let err = decode::<Status>(r#"{"ready": true, "message": "ok"} x"#).expect_err("trailing");
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_decode_value_reports_path_and_token() {
        let value = json!({"items": [{"ready": true, "message": "ok"}, {"ready": "yes", "message": "ok"}]});

        #[derive(Debug, Deserialize)]
        struct Wrapper {
            #[allow(dead_code)]
            items: Vec<Status>,
        }

        let err = decode_value::<Wrapper>(&value).expect_err("bad bool");
        match err {
            Error::Decode { path, token, .. } => {
                assert_eq!(path, "items[1].ready");
                assert_eq!(token, "\"yes\"");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_camel_case_enum() {
        let state: Readiness = decode_value(&json!("interactive")).expect("decode");
        assert_eq!(state, Readiness::Interactive);

        let err = decode_value::<Readiness>(&json!("eventually")).expect_err("unknown");
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_encode_is_single_line() {
        let text = encode(&json!({"a": [1, 2], "b": {"c": null}})).expect("encode");
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_discriminator() {
        let value = json!({"type": "node"});
        assert_eq!(discriminator(&value, TYPE_FIELD), Some("node"));
        assert_eq!(discriminator(&json!("text"), TYPE_FIELD), None);
    }
}
