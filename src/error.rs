//! Error types for the BiDi client.
//!
//! Local failures, remote error envelopes, decode failures and timeouts
//! all surface as one [`Error`] enum.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use bidi_webdriver::{BiDi, Result};
//!
//! async fn example(bidi: &BiDi) -> Result<()> {
//!     let status = bidi.session().status().await?;
//!     assert!(status.ready);
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`] |
//! | Decoding | [`Error::Decode`] |
//! | Remote | [`Error::Protocol`] |
//! | Transport | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::WebSocket`] |
//! | Timing | [`Error::CommandTimeout`] |
//! | Backpressure | [`Error::TooManyPending`] |
//! | External | [`Error::Io`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::CommandId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result alias over [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Every failure a command, subscription or connection can report.
///
/// Nothing is retried; callers decide based on the `is_*` predicates.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument passed to a façade operation.
    ///
    /// Detected locally, before anything is written to the transport.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Decode Errors
    // ========================================================================
    /// Inbound JSON did not match the expected shape.
    ///
    /// Carries the Rust type that was expected, the JSON path where
    /// decoding stopped and a snippet of the offending token.
    #[error("Decode error: expected {shape} at '{path}', found {token}: {message}")]
    Decode {
        /// Name of the expected type.
        shape: String,
        /// Path of the failing element (`.` when the root failed).
        path: String,
        /// Snippet of the offending JSON token.
        token: String,
        /// Underlying decoder message.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// The remote end answered with an error envelope.
    #[error("Protocol error ({code}): {message}")]
    Protocol {
        /// BiDi error code, e.g. `no such frame`.
        code: String,
        /// Human readable message from the remote end.
        message: String,
        /// Remote stack trace, if one was sent.
        stacktrace: Option<String>,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Connection could not be established or broke mid-write.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Transport closed while the operation was in flight.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Timing Errors
    // ========================================================================
    /// No matching response arrived before the deadline.
    ///
    /// The pending entry is removed; a late response is logged and dropped.
    #[error("Command {command_id} ({method}) timed out after {timeout_ms}ms")]
    CommandTimeout {
        /// Correlation id of the command.
        command_id: CommandId,
        /// Wire method name.
        method: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Too many commands are awaiting responses.
    #[error("Too many pending commands (limit {limit})")]
    TooManyPending {
        /// Configured limit.
        limit: usize,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a decode error.
    #[inline]
    pub fn decode(
        shape: impl Into<String>,
        path: impl Into<String>,
        token: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Decode {
            shape: shape.into(),
            path: path.into(),
            token: token.into(),
            message: message.into(),
        }
    }

    /// Creates a protocol error from a remote error envelope.
    #[inline]
    pub fn protocol(
        code: impl Into<String>,
        message: impl Into<String>,
        stacktrace: Option<String>,
    ) -> Self {
        Self::Protocol {
            code: code.into(),
            message: message.into(),
            stacktrace,
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a command timeout error.
    #[inline]
    pub fn command_timeout(
        command_id: CommandId,
        method: impl Into<String>,
        timeout_ms: u64,
    ) -> Self {
        Self::CommandTimeout {
            command_id,
            method: method.into(),
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::CommandTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the remote end reported the failure.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    /// Returns `true` if inbound JSON had an unexpected shape.
    #[inline]
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Returns the remote error code for protocol errors.
    #[inline]
    #[must_use]
    pub fn protocol_code(&self) -> Option<&str> {
        match self {
            Self::Protocol { code, .. } => Some(code),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
