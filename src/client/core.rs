//! Connection hub.
//!
//! A [`BiDi`] owns one [`Broker`] and hands out module façades bound to it.
//! Cloning is cheap; every clone shares the same connection.
//!
//! # Example
//!
//! ```no_run
//! use bidi_webdriver::BiDi;
//!
//! # async fn example() -> bidi_webdriver::Result<()> {
//! let bidi = BiDi::connect("ws://127.0.0.1:9222/session").await?;
//!
//! let status = bidi.status().await?;
//! println!("ready: {}", status.ready);
//!
//! bidi.close();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;

use crate::error::Result;
use crate::modules::session::StatusResult;
use crate::modules::{
    BrowserModule, BrowsingContextModule, EmulationModule, InputModule, LogModule, NetworkModule,
    ScriptModule, SessionModule, StorageModule, WebExtensionModule,
};
use crate::transport::{Broker, BrokerConfig, Transport};

use super::builder::BiDiBuilder;

// ============================================================================
// BiDi
// ============================================================================

/// A WebDriver BiDi connection.
#[derive(Debug, Clone)]
pub struct BiDi {
    broker: Broker,
}

// ============================================================================
// BiDi - Construction
// ============================================================================

impl BiDi {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> BiDiBuilder {
        BiDiBuilder::new()
    }

    /// Connects to `url` with default settings.
    ///
    /// # Errors
    ///
    /// See [`BiDiBuilder::connect`].
    pub async fn connect(url: &str) -> Result<Self> {
        BiDiBuilder::new().url(url).connect().await
    }

    /// Starts a client on `transport` with default settings.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn with_transport<T: Transport>(transport: T) -> Self {
        Self::from_parts(transport, BrokerConfig::default())
    }

    pub(crate) fn from_parts<T: Transport>(transport: T, config: BrokerConfig) -> Self {
        Self {
            broker: Broker::spawn(transport, config),
        }
    }

    /// Returns the underlying broker, e.g. for raw commands or counters.
    #[inline]
    #[must_use]
    pub fn broker(&self) -> &Broker {
        &self.broker
    }
}

// ============================================================================
// BiDi - Modules
// ============================================================================

impl BiDi {
    /// Returns the `session` façade: status, subscriptions and lifecycle.
    #[must_use]
    pub fn session(&self) -> SessionModule {
        SessionModule::new(self.broker.clone())
    }

    /// Returns the `browser` façade: user contexts and client windows.
    #[must_use]
    pub fn browser(&self) -> BrowserModule {
        BrowserModule::new(self.broker.clone())
    }

    /// Returns the `browsingContext` façade: tabs, navigation and capture.
    ///
    /// Its `log`, `network` and `input` methods give façades scoped to one
    /// context.
    #[must_use]
    pub fn browsing_context(&self) -> BrowsingContextModule {
        BrowsingContextModule::new(self.broker.clone())
    }

    /// Returns the `emulation` façade.
    #[must_use]
    pub fn emulation(&self) -> EmulationModule {
        EmulationModule::new(self.broker.clone())
    }

    /// Returns the `input` façade: action sequences and file inputs.
    #[must_use]
    pub fn input(&self) -> InputModule {
        InputModule::new(self.broker.clone())
    }

    /// Returns the `log` façade for `log.entryAdded` events.
    #[must_use]
    pub fn log(&self) -> LogModule {
        LogModule::new(self.broker.clone())
    }

    /// Returns the `network` façade: intercepts, data collectors and events.
    #[must_use]
    pub fn network(&self) -> NetworkModule {
        NetworkModule::new(self.broker.clone())
    }

    /// Returns the `script` façade: evaluation, preload scripts and realms.
    #[must_use]
    pub fn script(&self) -> ScriptModule {
        ScriptModule::new(self.broker.clone())
    }

    /// Returns the `storage` façade for cookies.
    #[must_use]
    pub fn storage(&self) -> StorageModule {
        StorageModule::new(self.broker.clone())
    }

    /// Returns the `webExtension` façade.
    #[must_use]
    pub fn web_extension(&self) -> WebExtensionModule {
        WebExtensionModule::new(self.broker.clone())
    }
}

// ============================================================================
// BiDi - Shortcuts
// ============================================================================

impl BiDi {
    /// Shortcut for `session().status()`.
    pub async fn status(&self) -> Result<StatusResult> {
        self.session().status().await
    }

    /// Ends the session, then closes the connection.
    ///
    /// The connection is closed even if `session.end` fails.
    pub async fn end(&self) -> Result<()> {
        let result = self.session().end().await;
        self.close();
        result
    }

    /// Closes the connection. Pending commands fail with
    /// [`Error::ConnectionClosed`](crate::Error::ConnectionClosed).
    pub fn close(&self) {
        debug!("Closing BiDi connection");
        self.broker.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    use crate::transport::MemoryTransport;

    #[tokio::test]
    async fn test_status_end_to_end() {
        let (transport, mut peer) = MemoryTransport::pair();
        let bidi = BiDi::with_transport(transport);

        let remote = async {
            let request = peer.next_request().await.expect("request");
            assert_eq!(request["method"], "session.status");
            assert_eq!(request["params"], json!({}));
            peer.respond(&request["id"], json!({"ready": true, "message": "ok"}))
                .expect("respond");
        };

        let (status, ()) = tokio::join!(bidi.status(), remote);
        let status = assert_ok!(status);
        assert!(status.ready);
        assert_eq!(status.message, "ok");
    }

    #[tokio::test]
    async fn test_close_fails_later_calls() {
        let (transport, _peer) = MemoryTransport::pair();
        let bidi = BiDi::with_transport(transport);

        bidi.close();
        let err = assert_err!(bidi.status().await);
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_end_closes_after_reply() {
        let (transport, mut peer) = MemoryTransport::pair();
        let bidi = BiDi::with_transport(transport);

        let remote = async {
            let request = peer.next_request().await.expect("request");
            assert_eq!(request["method"], "session.end");
            peer.respond(&request["id"], json!({})).expect("respond");
        };

        let (result, ()) = tokio::join!(bidi.end(), remote);
        assert_ok!(result);
        assert!(bidi.broker().is_closed());
    }

    #[tokio::test]
    async fn test_facade_getters_route_to_their_domain() {
        use crate::modules::emulation::EmulationTargets;
        use crate::modules::storage::CookieFilter;

        let (transport, mut peer) = MemoryTransport::pair();
        let bidi = BiDi::with_transport(transport);

        let browser = bidi.browser();
        let (users, request) = tokio::join!(browser.get_user_contexts(), async {
            let request = peer.next_request().await.expect("request");
            peer.respond(&request["id"], json!({"userContexts": []}))
                .expect("respond");
            request
        });
        assert_ok!(users);
        assert_eq!(request["method"], "browser.getUserContexts");

        let storage = bidi.storage();
        let (cookies, request) = tokio::join!(
            storage.get_cookies(Some(CookieFilter::name("sid")), None),
            async {
                let request = peer.next_request().await.expect("request");
                peer.respond(&request["id"], json!({"cookies": [], "partitionKey": {}}))
                    .expect("respond");
                request
            }
        );
        assert_ok!(cookies);
        assert_eq!(request["method"], "storage.getCookies");

        let emulation = bidi.emulation();
        let (locale, request) = tokio::join!(
            emulation
                .set_locale_override(Some("de-DE"), EmulationTargets::global()),
            async {
                let request = peer.next_request().await.expect("request");
                peer.respond(&request["id"], json!({})).expect("respond");
                request
            }
        );
        assert_ok!(locale);
        assert_eq!(request["method"], "emulation.setLocaleOverride");
    }

    #[tokio::test]
    async fn test_clones_share_broker() {
        let (transport, _peer) = MemoryTransport::pair();
        let bidi = BiDi::with_transport(transport);
        let other = bidi.clone();

        other.close();
        assert!(bidi.broker().is_closed());
    }
}
