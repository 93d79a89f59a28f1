//! Intercept-and-handle helpers.
//!
//! [`NetworkModule::intercept_requests`] and its siblings add an intercept
//! for one phase, subscribe to the matching event and return an
//! [`Interception`] that yields only the requests its own intercept blocked.
//! Resuming an item consumes it, so a blocked request is answered once.
//!
//! | Helper | Phase | Item |
//! |--------|-------|------|
//! | `intercept_requests` | `beforeRequestSent` | [`InterceptedRequest`] |
//! | `intercept_responses` | `responseStarted` | [`InterceptedResponse`] |
//! | `intercept_auth` | `authRequired` | [`InterceptedAuth`] |
//!
//! ```ignore
//! let mut requests = bidi.network().intercept_requests(InterceptOptions::default()).await?;
//! while let Some(request) = requests.recv().await {
//!     let request = request?;
//!     if request.request().url.ends_with(".png") {
//!         request.fail().await?;
//!     } else {
//!         request.continue_unchanged().await?;
//!     }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::identifiers::{BrowsingContextId, InterceptId, RequestId};
use crate::modules::session::{self, Subscription, SubscriptionOptions};

use super::{
    AddInterceptParameters, AuthAction, AuthChallenge, AuthCredentials, BaseParameters,
    BeforeRequestSentParams, ContinueRequestParameters, ContinueResponseParameters,
    InterceptPhase, NetworkModule, ProvideResponseParameters, RequestData, ResponseData,
    ResponseParams, UrlPattern, events,
};

// ============================================================================
// InterceptOptions
// ============================================================================

/// Which requests an interception blocks.
#[derive(Debug, Clone, Default)]
pub struct InterceptOptions {
    /// Top-level contexts to intercept in; every context when `None`.
    pub contexts: Option<Vec<BrowsingContextId>>,
    /// URL patterns to match; every URL when `None`.
    pub url_patterns: Option<Vec<UrlPattern>>,
}

impl InterceptOptions {
    /// Restricts the interception to `contexts`.
    #[must_use]
    pub fn contexts(mut self, contexts: impl IntoIterator<Item = BrowsingContextId>) -> Self {
        self.contexts = Some(contexts.into_iter().collect());
        self
    }

    /// Restricts the interception to URLs matching any of `patterns`.
    #[must_use]
    pub fn url_patterns(mut self, patterns: impl IntoIterator<Item = UrlPattern>) -> Self {
        self.url_patterns = Some(patterns.into_iter().collect());
        self
    }
}

// ============================================================================
// InterceptedEvent
// ============================================================================

mod sealed {
    pub trait Sealed {}
}

/// An item an [`Interception`] yields.
///
/// Implemented by [`InterceptedRequest`], [`InterceptedResponse`] and
/// [`InterceptedAuth`] only.
pub trait InterceptedEvent: sealed::Sealed + Sized {
    #[doc(hidden)]
    const PHASE: InterceptPhase;
    #[doc(hidden)]
    const EVENT: &'static str;
    #[doc(hidden)]
    type Payload: DeserializeOwned;
    #[doc(hidden)]
    fn base(payload: &Self::Payload) -> &BaseParameters;
    #[doc(hidden)]
    fn wrap(payload: Self::Payload, network: NetworkModule) -> Self;
}

// ============================================================================
// Interception
// ============================================================================

/// A live intercept and the stream of requests it blocked.
///
/// Dropping it stops local delivery only. Requests the intercept blocks
/// afterwards stay blocked until it is removed, so prefer
/// [`Interception::remove`].
pub struct Interception<T: InterceptedEvent> {
    intercept: InterceptId,
    subscription: Subscription<T::Payload>,
    network: NetworkModule,
    _marker: PhantomData<fn() -> T>,
}

impl<T: InterceptedEvent> Interception<T> {
    /// Returns the intercept id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &InterceptId {
        &self.intercept
    }

    /// Waits for the next request this intercept blocked.
    ///
    /// Returns `None` once the connection closes.
    pub async fn recv(&mut self) -> Option<Result<T>> {
        self.next().await
    }

    /// Removes the intercept, then ends the event subscription.
    pub async fn remove(self) -> Result<()> {
        let Self {
            intercept,
            subscription,
            network,
            ..
        } = self;

        network.remove_intercept(intercept).await?;
        subscription.unsubscribe().await
    }

    /// Blocked by this intercept, as opposed to another one or none.
    fn owns(&self, base: &BaseParameters) -> bool {
        base.is_blocked
            && base
                .intercepts
                .as_ref()
                .is_some_and(|intercepts| intercepts.contains(&self.intercept))
    }
}

impl<T: InterceptedEvent> Stream for Interception<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let payload = match ready!(Pin::new(&mut self.subscription).poll_next(cx)) {
                None => return Poll::Ready(None),
                Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                Some(Ok(payload)) => payload,
            };

            if self.owns(T::base(&payload)) {
                let network = self.network.clone();
                return Poll::Ready(Some(Ok(T::wrap(payload, network))));
            }

            trace!(
                intercept = %self.intercept,
                request = %T::base(&payload).request.request,
                "Skipping request not blocked by this intercept"
            );
        }
    }
}

impl<T: InterceptedEvent> fmt::Debug for Interception<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interception")
            .field("intercept", &self.intercept)
            .field("phase", &T::PHASE)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Items
// ============================================================================

/// Accessors and resume methods shared by every intercepted item.
macro_rules! intercepted_common {
    ($item:ident, $payload:ty, $phase:expr, $event:expr, |$event_var:ident| $base:expr) => {
        impl sealed::Sealed for $item {}

        impl InterceptedEvent for $item {
            const PHASE: InterceptPhase = $phase;
            const EVENT: &'static str = $event;
            type Payload = $payload;

            fn base($event_var: &$payload) -> &BaseParameters {
                $base
            }

            fn wrap(event: $payload, network: NetworkModule) -> Self {
                Self { event, network }
            }
        }

        impl $item {
            /// The event that reported the blocked request.
            #[inline]
            #[must_use]
            pub fn event(&self) -> &$payload {
                &self.event
            }

            /// The request as the browser would send it.
            #[inline]
            #[must_use]
            pub fn request(&self) -> &RequestData {
                &<Self as InterceptedEvent>::base(&self.event).request
            }

            /// Id to resume the request with.
            #[inline]
            #[must_use]
            pub fn id(&self) -> &RequestId {
                &self.request().request
            }

            /// Context the request belongs to, if any.
            #[inline]
            #[must_use]
            pub fn context(&self) -> Option<&BrowsingContextId> {
                <Self as InterceptedEvent>::base(&self.event).context.as_ref()
            }

            /// Fails the request with a network error.
            pub async fn fail(self) -> Result<()> {
                self.network.fail_request(self.id().clone()).await
            }

            /// Answers the request with the response `build` fills in.
            ///
            /// `build` receives parameters for this request; the id it
            /// returns is ignored.
            pub async fn provide_response(
                self,
                build: impl FnOnce(ProvideResponseParameters) -> ProvideResponseParameters,
            ) -> Result<()> {
                let id = self.id().clone();
                let mut params = build(ProvideResponseParameters::new(id.clone()));
                params.request = id;
                self.network.provide_response(params).await
            }
        }
    };
}

/// A request blocked before it was sent.
#[derive(Debug)]
pub struct InterceptedRequest {
    event: BeforeRequestSentParams,
    network: NetworkModule,
}

intercepted_common!(
    InterceptedRequest,
    BeforeRequestSentParams,
    InterceptPhase::BeforeRequestSent,
    events::BEFORE_REQUEST_SENT,
    |event| &event.base
);

impl InterceptedRequest {
    /// Sends the request unchanged.
    pub async fn continue_unchanged(self) -> Result<()> {
        self.continue_request(|params| params).await
    }

    /// Sends the request with the changes `modify` makes.
    ///
    /// ```ignore
    /// request
    ///     .continue_request(|params| ContinueRequestParameters {
    ///         method: Some("POST".to_owned()),
    ///         ..params
    ///     })
    ///     .await?;
    /// ```
    pub async fn continue_request(
        self,
        modify: impl FnOnce(ContinueRequestParameters) -> ContinueRequestParameters,
    ) -> Result<()> {
        let id = self.id().clone();
        let mut params = modify(ContinueRequestParameters::new(id.clone()));
        params.request = id;
        self.network.continue_request(params).await
    }
}

/// A response blocked after its headers arrived.
#[derive(Debug)]
pub struct InterceptedResponse {
    event: ResponseParams,
    network: NetworkModule,
}

intercepted_common!(
    InterceptedResponse,
    ResponseParams,
    InterceptPhase::ResponseStarted,
    events::RESPONSE_STARTED,
    |event| &event.base
);

impl InterceptedResponse {
    /// The response status and headers.
    #[inline]
    #[must_use]
    pub fn response(&self) -> &ResponseData {
        &self.event.response
    }

    /// Lets the response through unchanged.
    pub async fn continue_unchanged(self) -> Result<()> {
        self.continue_response(|params| params).await
    }

    /// Lets the response through with the changes `modify` makes.
    pub async fn continue_response(
        self,
        modify: impl FnOnce(ContinueResponseParameters) -> ContinueResponseParameters,
    ) -> Result<()> {
        let id = self.id().clone();
        let mut params = modify(ContinueResponseParameters::new(id.clone()));
        params.request = id;
        self.network.continue_response(params).await
    }
}

/// A request waiting on an HTTP auth challenge.
#[derive(Debug)]
pub struct InterceptedAuth {
    event: ResponseParams,
    network: NetworkModule,
}

intercepted_common!(
    InterceptedAuth,
    ResponseParams,
    InterceptPhase::AuthRequired,
    events::AUTH_REQUIRED,
    |event| &event.base
);

impl InterceptedAuth {
    /// The `401`/`407` response carrying the challenges.
    #[inline]
    #[must_use]
    pub fn response(&self) -> &ResponseData {
        &self.event.response
    }

    /// Challenges the server sent.
    #[must_use]
    pub fn challenges(&self) -> &[AuthChallenge] {
        self.event.response.auth_challenges.as_deref().unwrap_or_default()
    }

    /// Answers the challenge with `credentials`.
    pub async fn provide_credentials(self, credentials: AuthCredentials) -> Result<()> {
        self.continue_with_auth(AuthAction::ProvideCredentials { credentials })
            .await
    }

    /// Lets the browser handle the challenge.
    pub async fn continue_default(self) -> Result<()> {
        self.continue_with_auth(AuthAction::Default).await
    }

    /// Cancels the challenge; the page sees the `401`.
    pub async fn cancel(self) -> Result<()> {
        self.continue_with_auth(AuthAction::Cancel).await
    }

    /// Answers the challenge with `action`.
    pub async fn continue_with_auth(self, action: AuthAction) -> Result<()> {
        let id = self.id().clone();
        self.network.continue_with_auth(id, action).await
    }
}

// ============================================================================
// NetworkModule - Interception
// ============================================================================

impl NetworkModule {
    /// Blocks matching requests before they are sent and yields them.
    pub async fn intercept_requests(
        &self,
        options: InterceptOptions,
    ) -> Result<Interception<InterceptedRequest>> {
        self.intercept(options).await
    }

    /// Blocks matching responses once their headers arrive and yields them.
    pub async fn intercept_responses(
        &self,
        options: InterceptOptions,
    ) -> Result<Interception<InterceptedResponse>> {
        self.intercept(options).await
    }

    /// Blocks matching requests on auth challenges and yields them.
    pub async fn intercept_auth(
        &self,
        options: InterceptOptions,
    ) -> Result<Interception<InterceptedAuth>> {
        self.intercept(options).await
    }

    /// Subscribes first so no blocked request goes unseen, then adds the
    /// intercept. A failed intercept ends the subscription again.
    async fn intercept<T: InterceptedEvent>(
        &self,
        options: InterceptOptions,
    ) -> Result<Interception<T>> {
        let subscription_options = SubscriptionOptions {
            contexts: options.contexts.clone(),
            user_contexts: None,
        };
        let subscription: Subscription<T::Payload> =
            session::subscribe(&self.broker, self.timeout, T::EVENT, subscription_options).await?;

        let params = AddInterceptParameters {
            phases: vec![T::PHASE],
            contexts: options.contexts,
            url_patterns: options.url_patterns,
        };
        let intercept = match self.add_intercept(params).await {
            Ok(intercept) => intercept,
            Err(e) => {
                if let Err(cleanup) = subscription.unsubscribe().await {
                    warn!(error = %cleanup, event = T::EVENT, "Failed to unsubscribe after rejected intercept");
                }
                return Err(e);
            }
        };

        debug!(intercept = %intercept, phase = ?T::PHASE, "Interception started");

        Ok(Interception {
            intercept,
            subscription,
            network: self.clone(),
            _marker: PhantomData,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};

    use crate::modules::testing::{connect, respond};
    use crate::transport::MemoryPeer;

    use super::super::tests::request_data;

    fn blocked(intercepts: &[&str], extra: Value) -> Value {
        let mut params = json!({
            "context": "ctx",
            "isBlocked": !intercepts.is_empty(),
            "navigation": null,
            "redirectCount": 0,
            "request": request_data(),
            "timestamp": 10,
        });
        if !intercepts.is_empty() {
            params["intercepts"] = json!(intercepts);
        }
        if let (Some(params), Value::Object(extra)) = (params.as_object_mut(), extra) {
            params.extend(extra);
        }
        params
    }

    fn response_data(status: u16) -> Value {
        json!({
            "url": "https://example.com/",
            "protocol": "http/1.1",
            "status": status,
            "statusText": "",
            "fromCache": false,
            "headers": [],
            "mimeType": "text/html",
            "bytesReceived": 0,
            "headersSize": null,
            "bodySize": null,
            "content": {"size": 0},
            "authChallenges": [{"scheme": "Basic", "realm": "admin"}]
        })
    }

    /// Answers the subscribe and addIntercept commands.
    async fn start(peer: &mut MemoryPeer, intercept: &str) -> (Value, Value) {
        let subscribe = respond(peer, json!({"subscription": "s-1"})).await;
        let add = respond(peer, json!({"intercept": intercept})).await;
        (subscribe, add)
    }

    #[tokio::test]
    async fn test_intercept_requests_yields_only_own_blocked_requests() {
        let (bidi, mut peer) = connect();
        let network = bidi.network();

        let options = InterceptOptions::default().url_patterns([UrlPattern::String {
            pattern: "https://example.com/*".to_owned(),
        }]);
        let (interception, (subscribe, add)) =
            tokio::join!(network.intercept_requests(options), start(&mut peer, "i-1"));
        let mut interception = interception.expect("interception");

        assert_eq!(subscribe["params"], json!({"events": ["network.beforeRequestSent"]}));
        assert_eq!(add["method"], "network.addIntercept");
        assert_eq!(
            add["params"],
            json!({"phases": ["beforeRequestSent"],
                   "urlPatterns": [{"type": "string", "pattern": "https://example.com/*"}]})
        );
        assert_eq!(interception.id(), &InterceptId::new("i-1"));

        let mut seen = request_data();
        seen["request"] = json!("req-seen");
        let mut other = request_data();
        other["request"] = json!("req-other");

        peer.emit(
            events::BEFORE_REQUEST_SENT,
            json!({"context": "ctx", "isBlocked": false, "navigation": null,
                   "redirectCount": 0, "request": seen, "timestamp": 1}),
        )
        .expect("emit");
        peer.emit(
            events::BEFORE_REQUEST_SENT,
            json!({"context": "ctx", "isBlocked": true, "navigation": null,
                   "redirectCount": 0, "request": other, "timestamp": 2,
                   "intercepts": ["i-2"]}),
        )
        .expect("emit");
        peer.emit(events::BEFORE_REQUEST_SENT, blocked(&["i-2", "i-1"], json!({})))
            .expect("emit");

        let request = interception
            .recv()
            .await
            .expect("item")
            .expect("decoded");
        assert_eq!(request.id(), &RequestId::new("req-1"));
        assert_eq!(request.context(), Some(&BrowsingContextId::new("ctx")));

        let (result, sent) = tokio::join!(
            request.continue_request(|params| ContinueRequestParameters {
                method: Some("POST".to_owned()),
                ..params
            }),
            respond(&mut peer, json!({}))
        );
        result.expect("continue");
        assert_eq!(sent["method"], "network.continueRequest");
        assert_eq!(sent["params"], json!({"request": "req-1", "method": "POST"}));
    }

    #[tokio::test]
    async fn test_intercepted_request_can_be_answered_locally() {
        let (bidi, mut peer) = connect();
        let network = bidi.network();

        let (interception, _) = tokio::join!(
            network.intercept_requests(InterceptOptions::default()),
            start(&mut peer, "i-1")
        );
        let mut interception = interception.expect("interception");

        peer.emit(events::BEFORE_REQUEST_SENT, blocked(&["i-1"], json!({})))
            .expect("emit");
        let request = interception.recv().await.expect("item").expect("decoded");

        let (result, sent) = tokio::join!(
            request.provide_response(|params| ProvideResponseParameters {
                request: RequestId::new("ignored"),
                status_code: Some(204),
                ..params
            }),
            respond(&mut peer, json!({}))
        );
        result.expect("provide");
        assert_eq!(sent["method"], "network.provideResponse");
        assert_eq!(sent["params"], json!({"request": "req-1", "statusCode": 204}));
    }

    #[tokio::test]
    async fn test_intercept_responses_and_fail() {
        let (bidi, mut peer) = connect();
        let network = bidi.network();

        let options = InterceptOptions::default().contexts([BrowsingContextId::new("ctx")]);
        let (interception, (subscribe, add)) =
            tokio::join!(network.intercept_responses(options), start(&mut peer, "i-9"));
        let mut interception = interception.expect("interception");
        assert_eq!(subscribe["params"]["contexts"], json!(["ctx"]));
        assert_eq!(add["params"]["contexts"], json!(["ctx"]));
        assert_eq!(add["params"]["phases"], json!(["responseStarted"]));

        peer.emit(
            events::RESPONSE_STARTED,
            blocked(&["i-9"], json!({"response": response_data(500)})),
        )
        .expect("emit");

        let response = interception.recv().await.expect("item").expect("decoded");
        assert_eq!(response.response().status, 500);

        let (result, sent) = tokio::join!(response.fail(), respond(&mut peer, json!({})));
        result.expect("fail");
        assert_eq!(sent["method"], "network.failRequest");
        assert_eq!(sent["params"], json!({"request": "req-1"}));
    }

    #[tokio::test]
    async fn test_intercept_auth_provides_credentials() {
        let (bidi, mut peer) = connect();
        let network = bidi.network();

        let (interception, _) = tokio::join!(
            network.intercept_auth(InterceptOptions::default()),
            start(&mut peer, "i-auth")
        );
        let mut interception = interception.expect("interception");

        peer.emit(
            events::AUTH_REQUIRED,
            blocked(&["i-auth"], json!({"response": response_data(401)})),
        )
        .expect("emit");

        let auth = interception.recv().await.expect("item").expect("decoded");
        assert_eq!(auth.challenges()[0].realm, "admin");

        let (result, sent) = tokio::join!(
            auth.provide_credentials(AuthCredentials::new("user", "pw")),
            respond(&mut peer, json!({}))
        );
        result.expect("auth");
        assert_eq!(
            sent["params"],
            json!({"request": "req-1", "action": "provideCredentials",
                   "credentials": {"type": "password", "username": "user", "password": "pw"}})
        );
    }

    #[tokio::test]
    async fn test_rejected_intercept_ends_subscription() {
        let (bidi, mut peer) = connect();
        let network = bidi.network();

        let remote = async {
            respond(&mut peer, json!({"subscription": "s-1"})).await;
            let add = peer.next_request().await.expect("request");
            peer.respond_error(&add["id"], "invalid argument", "bad pattern")
                .expect("respond");
            respond(&mut peer, json!({})).await
        };
        let (result, unsubscribe) =
            tokio::join!(network.intercept_requests(InterceptOptions::default()), remote);

        let err = result.expect_err("rejected");
        assert_eq!(err.protocol_code(), Some("invalid argument"));
        assert_eq!(unsubscribe["method"], "session.unsubscribe");
        assert_eq!(unsubscribe["params"], json!({"subscriptions": ["s-1"]}));
        assert_eq!(bidi.broker().listener_count(events::BEFORE_REQUEST_SENT), 0);
    }

    #[tokio::test]
    async fn test_remove_drops_intercept_then_subscription() {
        let (bidi, mut peer) = connect();
        let network = bidi.network();

        let (interception, _) = tokio::join!(
            network.intercept_requests(InterceptOptions::default()),
            start(&mut peer, "i-1")
        );
        let interception = interception.expect("interception");

        let remote = async {
            let first = respond(&mut peer, json!({})).await;
            let second = respond(&mut peer, json!({})).await;
            (first, second)
        };
        let (result, (first, second)) = tokio::join!(interception.remove(), remote);
        result.expect("remove");

        assert_eq!(first["method"], "network.removeIntercept");
        assert_eq!(first["params"], json!({"intercept": "i-1"}));
        assert_eq!(second["method"], "session.unsubscribe");
        assert_eq!(bidi.broker().listener_count(events::BEFORE_REQUEST_SENT), 0);
    }
}
