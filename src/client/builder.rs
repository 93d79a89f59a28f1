//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and connecting [`BiDi`] clients.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use bidi_webdriver::BiDi;
//!
//! # async fn example() -> bidi_webdriver::Result<()> {
//! let bidi = BiDi::builder()
//!     .url("ws://127.0.0.1:9222/session")
//!     .command_timeout(Duration::from_secs(10))
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::transport::broker::{DEFAULT_COMMAND_TIMEOUT, DEFAULT_MAX_PENDING};
use crate::transport::{BrokerConfig, Transport, WebSocketTransport};

use super::core::BiDi;

// ============================================================================
// Constants
// ============================================================================

/// Default deadline for the WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// BiDiBuilder
// ============================================================================

/// Builder for configuring a [`BiDi`] client.
///
/// Use [`BiDi::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct BiDiBuilder {
    /// Remote end WebSocket URL.
    url: Option<String>,
    /// Default deadline of every command.
    command_timeout: Duration,
    /// Deadline of the WebSocket handshake.
    connect_timeout: Duration,
    /// Cap on in-flight commands.
    max_pending: usize,
}

impl Default for BiDiBuilder {
    fn default() -> Self {
        Self {
            url: None,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

// ============================================================================
// BiDiBuilder Implementation
// ============================================================================

impl BiDiBuilder {
    /// Creates a builder with default timeouts and no URL.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the remote end URL, e.g. the `webSocketUrl` capability.
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the default command deadline.
    #[inline]
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the WebSocket handshake deadline.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Caps the number of commands awaiting a response.
    #[inline]
    #[must_use]
    pub fn max_pending(mut self, limit: usize) -> Self {
        self.max_pending = limit;
        self
    }

    /// Opens the WebSocket and starts the broker.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL is missing or invalid, or a limit is zero
    /// - [`Error::Connection`] if the handshake fails or times out
    pub async fn connect(self) -> Result<BiDi> {
        let url = self.validate_url()?;
        let config = self.validate_broker_config()?;

        let transport = WebSocketTransport::connect(&url, self.connect_timeout).await?;
        Ok(BiDi::from_parts(transport, config))
    }

    /// Starts the broker on an already open transport. The URL is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a limit is zero.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<BiDi> {
        let config = self.validate_broker_config()?;
        Ok(BiDi::from_parts(transport, config))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl BiDiBuilder {
    /// Validates the URL configuration.
    fn validate_url(&self) -> Result<Url> {
        let raw = self.url.as_deref().ok_or_else(|| {
            Error::config(
                "Remote end URL is required. Use .url() to set it.\n\
                 Example: BiDi::builder().url(\"ws://127.0.0.1:9222/session\")",
            )
        })?;

        let url = Url::parse(raw)
            .map_err(|e| Error::config(format!("Invalid remote end URL '{raw}': {e}")))?;

        match url.scheme() {
            "ws" | "wss" => Ok(url),
            scheme => Err(Error::config(format!(
                "Unsupported URL scheme '{scheme}'. Expected ws or wss."
            ))),
        }
    }

    /// Validates timeouts and limits.
    fn validate_broker_config(&self) -> Result<BrokerConfig> {
        if self.command_timeout.is_zero() {
            return Err(Error::config("Command timeout must be greater than zero"));
        }
        if self.max_pending == 0 {
            return Err(Error::config("max_pending must be greater than zero"));
        }

        Ok(BrokerConfig {
            command_timeout: self.command_timeout,
            max_pending: self.max_pending,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::MemoryTransport;

    #[test]
    fn test_default_builder() {
        let builder = BiDiBuilder::new();
        assert!(builder.url.is_none());
        assert_eq!(builder.command_timeout, DEFAULT_COMMAND_TIMEOUT);
        assert_eq!(builder.max_pending, DEFAULT_MAX_PENDING);
    }

    #[test]
    fn test_validate_url_requires_url() {
        let err = BiDiBuilder::new().validate_url().expect_err("missing url");
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("URL is required"));
    }

    #[test]
    fn test_validate_url_rejects_http() {
        let err = BiDiBuilder::new()
            .url("http://localhost:9222")
            .validate_url()
            .expect_err("http scheme");
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn test_validate_url_rejects_garbage() {
        let result = BiDiBuilder::new().url("not a url").validate_url();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_url_accepts_ws_and_wss() {
        for url in ["ws://localhost:9222/session", "wss://grid.example/session/abc"] {
            let parsed = BiDiBuilder::new().url(url).validate_url().expect("valid");
            assert_eq!(parsed.as_str(), url);
        }
    }

    #[test]
    fn test_zero_limits_rejected() {
        let zero_timeout = BiDiBuilder::new().command_timeout(Duration::ZERO);
        assert!(zero_timeout.validate_broker_config().is_err());

        let zero_pending = BiDiBuilder::new().max_pending(0);
        assert!(zero_pending.validate_broker_config().is_err());
    }

    #[tokio::test]
    async fn test_build_with_transport_carries_config() {
        let (transport, _peer) = MemoryTransport::pair();
        let bidi = BiDiBuilder::new()
            .command_timeout(Duration::from_millis(500))
            .max_pending(8)
            .build_with_transport(transport)
            .expect("build");

        assert_eq!(
            bidi.broker().config().command_timeout,
            Duration::from_millis(500)
        );
        assert_eq!(bidi.broker().config().max_pending, 8);
    }

    #[tokio::test]
    async fn test_connect_validates_before_dialing() {
        let err = BiDiBuilder::new()
            .url("ftp://example.com")
            .connect()
            .await
            .expect_err("bad scheme");
        assert!(matches!(err, Error::Config { .. }));
    }
}
