//! Request envelope and inbound message classification.
//!
//! # Outbound
//!
//! ```json
//! {"id": 1, "method": "session.status", "params": {}}
//! ```
//!
//! # Inbound
//!
//! | Kind | Shape |
//! |------|-------|
//! | Success | `{"id": 1, "type": "success", "result": {...}}` or `{"id": 1, "result": {...}}` |
//! | Error | `{"id": 1, "type": "error", "error": "code", "message": "...", "stacktrace": "..."}` |
//! | Event | `{"type": "event", "method": "module.event", "params": {...}}` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::{self, Nullable};
use crate::error::{Error, Result};
use crate::identifiers::CommandId;

use super::Command;
use super::event::EventMessage;

// ============================================================================
// Constants
// ============================================================================

/// Error code used when an error envelope omits `error`.
const UNKNOWN_ERROR: &str = "unknown error";

// ============================================================================
// Request
// ============================================================================

/// A command request from local end to remote end.
#[derive(Debug, Clone, Serialize)]
pub struct Request<'a> {
    /// Unique identifier for request/response correlation.
    pub id: CommandId,

    /// Command with method and params.
    #[serde(flatten)]
    pub command: &'a Command,
}

impl<'a> Request<'a> {
    /// Creates a request for `command` under `id`.
    #[inline]
    #[must_use]
    pub const fn new(id: CommandId, command: &'a Command) -> Self {
        Self { id, command }
    }
}

// ============================================================================
// Message
// ============================================================================

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Successful command response.
    Success {
        /// Matches the command `id`.
        id: CommandId,
        /// Raw result, decoded later into the caller's shape.
        result: Value,
    },

    /// Error envelope.
    ///
    /// `id` is `None` when the remote end could not parse the command.
    Error {
        /// Matches the command `id`, if known.
        id: Option<CommandId>,
        /// BiDi error code.
        code: String,
        /// Error message.
        message: String,
        /// Remote stack trace.
        stacktrace: Option<String>,
    },

    /// Unsolicited event.
    Event(EventMessage),
}

/// Every field any inbound envelope may carry.
#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    id: Option<CommandId>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Nullable<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    stacktrace: Option<String>,
}

impl Message {
    /// Parses and classifies an inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the frame is not JSON, or fits none of
    /// the three envelope kinds.
    pub fn parse(text: &str) -> Result<Self> {
        let mut raw: RawMessage = codec::decode(text)?;
        let kind = raw.kind.take();

        match kind.as_deref() {
            Some("success") => raw.into_success(),
            Some("error") => Ok(raw.into_error()),
            Some("event") => raw.into_event(),
            Some(other) => Err(Error::decode(
                "Message",
                "type",
                other,
                "unknown message type",
            )),
            // Older revisions omit `type`
            None if raw.id.is_some() && raw.error.is_some() => Ok(raw.into_error()),
            None if raw.id.is_some() => raw.into_success(),
            None if raw.method.is_some() => raw.into_event(),
            None => Err(Error::decode(
                "Message",
                ".",
                text.chars().take(64).collect::<String>(),
                "frame is neither a response nor an event",
            )),
        }
    }

    /// Returns the correlation id, if the message carries one.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<CommandId> {
        match self {
            Self::Success { id, .. } => Some(*id),
            Self::Error { id, .. } => *id,
            Self::Event(_) => None,
        }
    }
}

impl RawMessage {
    fn into_success(self) -> Result<Message> {
        let id = self
            .id
            .ok_or_else(|| Error::decode("Message", "id", "null", "success response without id"))?;

        Ok(Message::Success {
            id,
            result: self.result.into_value().unwrap_or(Value::Null),
        })
    }

    fn into_error(self) -> Message {
        let code = self.error.unwrap_or_else(|| UNKNOWN_ERROR.to_owned());
        Message::Error {
            id: self.id,
            message: self.message.unwrap_or_else(|| code.clone()),
            code,
            stacktrace: self.stacktrace,
        }
    }

    fn into_event(self) -> Result<Message> {
        let method = self
            .method
            .ok_or_else(|| Error::decode("Message", "method", "null", "event without method"))?;

        Ok(Message::Event(EventMessage {
            method,
            params: self.params.unwrap_or(Value::Null),
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================
