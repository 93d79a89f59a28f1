//! The `session` domain: status, lifecycle and event subscriptions.
//!
//! # Subscriptions
//!
//! A [`Subscription`] pairs the remote subscription id returned by
//! `session.subscribe` with a local [`EventStream`]. The local listener is
//! registered before the subscribe command is sent, so no event arriving
//! right after the response is lost.
//!
//! ```ignore
//! let mut loads = bidi.browsing_context().on_load(SubscriptionOptions::default()).await?;
//! while let Some(event) = loads.recv().await {
//!     println!("loaded {}", event?.url);
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Result;
use crate::identifiers::{BrowsingContextId, SessionId, SubscriptionId, UserContextId};
use crate::protocol::{EmptyParams, EmptyResult, bidi_commands};
use crate::transport::{Broker, EventStream};

// ============================================================================
// Commands
// ============================================================================

bidi_commands! {
    /// `session.*` commands.
    pub enum SessionCommand {
        /// Reports whether the remote end accepts new sessions.
        Status(EmptyParams) = "session.status",
        /// Creates a session.
        New(NewParameters) = "session.new",
        /// Ends the current session.
        End(EmptyParams) = "session.end",
        /// Enables events.
        Subscribe(SubscribeParameters) = "session.subscribe",
        /// Disables events.
        Unsubscribe(UnsubscribeParameters) = "session.unsubscribe",
    }
}

// ============================================================================
// Parameter Types
// ============================================================================

/// Parameters of `session.new`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewParameters {
    /// Requested capabilities.
    pub capabilities: CapabilitiesRequest,
}

/// Capability matching request.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitiesRequest {
    /// Capabilities every candidate must satisfy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub always_match: Option<CapabilityRequest>,
    /// Alternatives, tried in order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_match: Option<Vec<CapabilityRequest>>,
}

/// One set of requested capabilities.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_insecure_certs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unhandled_prompt_behavior: Option<UserPromptHandler>,
    /// Vendor capabilities such as `moz:firefoxOptions`.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// Proxy settings, discriminated by `proxyType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "proxyType", rename_all = "camelCase")]
pub enum ProxyConfiguration {
    Autodetect,
    Direct,
    Manual(ManualProxyConfiguration),
    Pac {
        #[serde(rename = "proxyAutoconfigUrl")]
        proxy_autoconfig_url: String,
    },
    System,
}

/// Explicit per-scheme proxies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualProxyConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socks_proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socks_version: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_proxy: Option<Vec<String>>,
}

/// How each kind of user prompt is handled when no one handles it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPromptHandler {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<UserPromptHandlerType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_unload: Option<UserPromptHandlerType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm: Option<UserPromptHandlerType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<UserPromptHandlerType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<UserPromptHandlerType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<UserPromptHandlerType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserPromptHandlerType {
    Accept,
    Dismiss,
    Ignore,
}

/// Parameters of `session.subscribe`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeParameters {
    /// Event names (`log.entryAdded`) or whole modules (`log`).
    pub events: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<BrowsingContextId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_contexts: Option<Vec<UserContextId>>,
}

/// Parameters of `session.unsubscribe`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum UnsubscribeParameters {
    /// Removes subscriptions by the ids `session.subscribe` returned.
    ById {
        subscriptions: Vec<SubscriptionId>,
    },
    /// Removes global subscriptions by event name.
    ByAttributes {
        events: Vec<String>,
    },
}

/// Scope of a typed subscription.
///
/// Both fields absent subscribes globally.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionOptions {
    /// Top-level browsing contexts to watch.
    pub contexts: Option<Vec<BrowsingContextId>>,
    /// User contexts to watch.
    pub user_contexts: Option<Vec<UserContextId>>,
}

impl SubscriptionOptions {
    /// Restricts the subscription to `contexts`.
    #[inline]
    #[must_use]
    pub fn contexts(mut self, contexts: impl IntoIterator<Item = BrowsingContextId>) -> Self {
        self.contexts = Some(contexts.into_iter().collect());
        self
    }

    /// Restricts the subscription to `user_contexts`.
    #[inline]
    #[must_use]
    pub fn user_contexts(mut self, user_contexts: impl IntoIterator<Item = UserContextId>) -> Self {
        self.user_contexts = Some(user_contexts.into_iter().collect());
        self
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result of `session.status`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusResult {
    /// `true` if a new session can be created.
    pub ready: bool,
    /// Implementation defined reason.
    pub message: String,
}

/// Result of `session.new`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResult {
    pub session_id: SessionId,
    pub capabilities: Capabilities,
}

/// Capabilities the remote end settled on.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub accept_insecure_certs: bool,
    pub browser_name: String,
    pub browser_version: String,
    pub platform_name: String,
    pub set_window_rect: bool,
    pub user_agent: String,
    #[serde(default)]
    pub proxy: Option<ProxyConfiguration>,
    #[serde(default)]
    pub unhandled_prompt_behavior: Option<UserPromptHandler>,
    #[serde(default)]
    pub web_socket_url: Option<String>,
    /// Vendor capabilities.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// Result of `session.subscribe`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscribeResult {
    /// Absent from remote ends that predate subscription ids.
    #[serde(default)]
    pub subscription: Option<SubscriptionId>,
}

// ============================================================================
// SessionModule
// ============================================================================

facade! {
    /// `session.*` façade.
    pub struct SessionModule;
    commands: SessionCommand;
}

impl SessionModule {
    /// Queries whether the remote end can create new sessions.
    pub async fn status(&self) -> Result<StatusResult> {
        let status: StatusResult = self.execute(SessionCommand::Status(EmptyParams {})).await?;
        debug!(ready = status.ready, message = %status.message, "Session status");
        Ok(status)
    }

    /// Creates a new session.
    pub async fn new_session(&self, capabilities: CapabilitiesRequest) -> Result<NewResult> {
        let result: NewResult = self
            .execute(SessionCommand::New(NewParameters { capabilities }))
            .await?;
        debug!(session_id = %result.session_id, browser = %result.capabilities.browser_name, "Session created");
        Ok(result)
    }

    /// Ends the session. The remote end closes the connection afterwards.
    pub async fn end(&self) -> Result<()> {
        debug!("Ending session");
        let _: EmptyResult = self.execute(SessionCommand::End(EmptyParams {})).await?;
        Ok(())
    }

    /// Enables events on the remote end.
    ///
    /// This only turns events on remotely. Use [`Broker::listen`] or one of
    /// the façades' `on_*` methods to receive them.
    pub async fn subscribe(&self, params: SubscribeParameters) -> Result<SubscribeResult> {
        debug!(events = ?params.events, "Subscribing");
        self.execute(SessionCommand::Subscribe(params)).await
    }

    /// Subscribes to `event` and returns a typed stream of its payloads.
    pub async fn subscribe_to<E: DeserializeOwned>(
        &self,
        event: &str,
        options: SubscriptionOptions,
    ) -> Result<Subscription<E>> {
        subscribe(&self.broker, self.timeout, event, options).await
    }

    /// Removes subscriptions by id.
    pub async fn unsubscribe(&self, subscriptions: Vec<SubscriptionId>) -> Result<()> {
        debug!(count = subscriptions.len(), "Unsubscribing by id");
        let _: EmptyResult = self
            .execute(SessionCommand::Unsubscribe(UnsubscribeParameters::ById {
                subscriptions,
            }))
            .await?;
        Ok(())
    }

    /// Removes global subscriptions by event name.
    pub async fn unsubscribe_by_attributes(&self, events: Vec<String>) -> Result<()> {
        debug!(events = ?events, "Unsubscribing by attributes");
        let _: EmptyResult = self
            .execute(SessionCommand::Unsubscribe(UnsubscribeParameters::ByAttributes {
                events,
            }))
            .await?;
        Ok(())
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Sends `session.subscribe` for one event and opens its stream.
///
/// The stream only yields events from `options.contexts` when it is set.
pub(crate) async fn subscribe<E: DeserializeOwned>(
    broker: &Broker,
    timeout: Option<Duration>,
    event: &str,
    options: SubscriptionOptions,
) -> Result<Subscription<E>> {
    let scope = options.contexts.clone();
    subscribe_scoped(broker, timeout, event, options, scope).await
}

/// Like [`subscribe`], with a local context filter independent of the
/// remote subscription's scope.
pub(crate) async fn subscribe_scoped<E: DeserializeOwned>(
    broker: &Broker,
    timeout: Option<Duration>,
    event: &str,
    options: SubscriptionOptions,
    scope: Option<Vec<BrowsingContextId>>,
) -> Result<Subscription<E>> {
    // Listen first; the remote end may emit as soon as it has answered
    let stream = match scope {
        Some(contexts) => broker.listen_in(event, contexts),
        None => broker.listen(event),
    };

    let params = SubscribeParameters {
        events: vec![event.to_owned()],
        contexts: options.contexts,
        user_contexts: options.user_contexts,
    };
    let result: SubscribeResult = broker
        .execute(SessionCommand::Subscribe(params), timeout)
        .await?;

    debug!(event, subscription = ?result.subscription, "Subscribed");

    Ok(Subscription {
        id: result.subscription,
        event: event.to_owned(),
        stream,
        broker: broker.clone(),
        timeout,
    })
}

/// A remote subscription together with its local event stream.
///
/// Dropping a `Subscription` stops local delivery but leaves the remote
/// subscription active; call [`Subscription::unsubscribe`] to end both.
pub struct Subscription<E> {
    id: Option<SubscriptionId>,
    event: String,
    stream: EventStream<E>,
    broker: Broker,
    timeout: Option<Duration>,
}

impl<E> Subscription<E> {
    /// Returns the remote subscription id, if the remote end sent one.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<&SubscriptionId> {
        self.id.as_ref()
    }

    /// Returns the subscribed event name.
    #[inline]
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }
}

impl<E: DeserializeOwned> Subscription<E> {
    /// Waits for the next event payload.
    ///
    /// Returns `None` once the connection closes.
    pub async fn recv(&mut self) -> Option<Result<E>> {
        self.stream.recv().await
    }

    /// Ends the remote subscription and stops local delivery.
    ///
    /// Uses the subscription id when there is one, the event name otherwise.
    pub async fn unsubscribe(self) -> Result<()> {
        let params = match self.id {
            Some(id) => UnsubscribeParameters::ById {
                subscriptions: vec![id],
            },
            None => UnsubscribeParameters::ByAttributes {
                events: vec![self.event.clone()],
            },
        };

        drop(self.stream);

        let _: EmptyResult = self
            .broker
            .execute(SessionCommand::Unsubscribe(params), self.timeout)
            .await?;

        debug!(event = %self.event, "Unsubscribed");
        Ok(())
    }
}

impl<E: DeserializeOwned> Stream for Subscription<E> {
    type Item = Result<E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.stream).poll_next(cx)
    }
}

impl<E> std::fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("event", &self.event)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::modules::testing::{connect, respond};

    #[tokio::test]
    async fn test_status_round_trip() {
        let (bidi, mut peer) = connect();
        let session = bidi.session();

        let (status, request) = tokio::join!(
            session.status(),
            respond(&mut peer, json!({"ready": true, "message": ""}))
        );

        assert!(status.expect("status").ready);
        assert_eq!(request["method"], "session.status");
        assert_eq!(request["params"], json!({}));
    }

    #[tokio::test]
    async fn test_new_session_encodes_capabilities() {
        let (bidi, mut peer) = connect();
        let session = bidi.session();

        let mut extensions = Map::new();
        extensions.insert("moz:debuggerAddress".to_owned(), json!(true));
        let capabilities = CapabilitiesRequest {
            always_match: Some(CapabilityRequest {
                accept_insecure_certs: Some(true),
                proxy: Some(ProxyConfiguration::Direct),
                unhandled_prompt_behavior: Some(UserPromptHandler {
                    default: Some(UserPromptHandlerType::Dismiss),
                    ..UserPromptHandler::default()
                }),
                extensions,
                ..CapabilityRequest::default()
            }),
            first_match: None,
        };

        let reply = json!({
            "sessionId": "s-1",
            "capabilities": {
                "acceptInsecureCerts": true,
                "browserName": "firefox",
                "browserVersion": "140.0",
                "platformName": "linux",
                "setWindowRect": true,
                "userAgent": "Mozilla/5.0",
                "moz:buildID": "20250101"
            }
        });

        let (result, request) = tokio::join!(
            session.new_session(capabilities),
            respond(&mut peer, reply)
        );

        assert_eq!(
            request["params"],
            json!({"capabilities": {"alwaysMatch": {
                "acceptInsecureCerts": true,
                "proxy": {"proxyType": "direct"},
                "unhandledPromptBehavior": {"default": "dismiss"},
                "moz:debuggerAddress": true
            }}})
        );

        let result = result.expect("session");
        assert_eq!(result.session_id.as_str(), "s-1");
        assert_eq!(result.capabilities.extensions["moz:buildID"], "20250101");
    }

    #[test]
    fn test_proxy_configuration_wire_shape() {
        let pac = ProxyConfiguration::Pac {
            proxy_autoconfig_url: "http://pac".to_owned(),
        };
        assert_eq!(
            serde_json::to_value(&pac).expect("encode"),
            json!({"proxyType": "pac", "proxyAutoconfigUrl": "http://pac"})
        );

        let manual = ProxyConfiguration::Manual(ManualProxyConfiguration {
            http_proxy: Some("127.0.0.1:8080".to_owned()),
            socks_version: Some(5),
            ..ManualProxyConfiguration::default()
        });
        assert_eq!(
            serde_json::to_value(&manual).expect("encode"),
            json!({"proxyType": "manual", "httpProxy": "127.0.0.1:8080", "socksVersion": 5})
        );
    }

    #[tokio::test]
    async fn test_unsubscribe_variants() {
        let (bidi, mut peer) = connect();
        let session = bidi.session();

        let (result, request) = tokio::join!(
            session.unsubscribe(vec![SubscriptionId::new("sub-1")]),
            respond(&mut peer, json!({}))
        );
        result.expect("unsubscribe");
        assert_eq!(request["params"], json!({"subscriptions": ["sub-1"]}));

        let (result, request) = tokio::join!(
            session.unsubscribe_by_attributes(vec!["log.entryAdded".to_owned()]),
            respond(&mut peer, json!({}))
        );
        result.expect("unsubscribe");
        assert_eq!(request["params"], json!({"events": ["log.entryAdded"]}));
    }

    #[tokio::test]
    async fn test_typed_subscription_lifecycle() {
        #[derive(Debug, Deserialize)]
        struct Ping {
            n: u32,
        }

        let (bidi, mut peer) = connect();
        let session = bidi.session();
        let options = SubscriptionOptions::default().contexts([BrowsingContextId::new("ctx")]);

        let (subscription, request) = tokio::join!(
            session.subscribe_to::<Ping>("test.ping", options),
            respond(&mut peer, json!({"subscription": "sub-9"}))
        );
        assert_eq!(
            request["params"],
            json!({"events": ["test.ping"], "contexts": ["ctx"]})
        );

        let mut subscription = subscription.expect("subscribe");
        assert_eq!(subscription.id().map(SubscriptionId::as_str), Some("sub-9"));

        peer.emit("test.ping", json!({"n": 7})).expect("emit");
        let event = subscription.recv().await.expect("event").expect("decoded");
        assert_eq!(event.n, 7);

        let (result, request) = tokio::join!(subscription.unsubscribe(), respond(&mut peer, json!({})));
        result.expect("unsubscribe");
        assert_eq!(request["method"], "session.unsubscribe");
        assert_eq!(request["params"], json!({"subscriptions": ["sub-9"]}));
        assert_eq!(bidi.broker().listener_count("test.ping"), 0);
    }

    #[tokio::test]
    async fn test_failed_subscribe_releases_listener() {
        let (bidi, mut peer) = connect();
        let session = bidi.session();

        let remote = async {
            let request = peer.next_request().await.expect("request");
            peer.respond_error(&request["id"], "invalid argument", "no such event")
                .expect("respond");
        };

        let (result, ()) = tokio::join!(
            session.subscribe_to::<Value>("bogus.event", SubscriptionOptions::default()),
            remote
        );

        assert_eq!(
            result.expect_err("should fail").protocol_code(),
            Some("invalid argument")
        );
        assert_eq!(bidi.broker().listener_count("bogus.event"), 0);
    }
}
