//! The `network` domain: request interception, data collection and the
//! request lifecycle events.
//!
//! # Interception
//!
//! An intercept blocks matching requests at one or more phases. A blocked
//! request shows up in an event with `isBlocked == true` and must be resumed
//! with exactly one of:
//!
//! | Phase | Resume with |
//! |-------|-------------|
//! | `beforeRequestSent` | `continue_request`, `provide_response`, `fail_request` |
//! | `responseStarted` | `continue_response`, `provide_response`, `fail_request` |
//! | `authRequired` | `continue_with_auth`, `continue_response`, `fail_request` |
//!
//! The [`intercept`] helpers pair an intercept with its event stream and
//! filter out requests blocked by other intercepts.

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::{
    BrowsingContextId, CollectorId, InterceptId, NavigationId, RequestId, UserContextId,
};
use crate::protocol::{EmptyResult, bidi_commands};

use super::script::StackTrace;

pub mod intercept;

pub use intercept::{
    InterceptOptions, InterceptedAuth, InterceptedEvent, InterceptedRequest, InterceptedResponse,
    Interception,
};

// ============================================================================
// Commands
// ============================================================================

bidi_commands! {
    /// `network.*` commands.
    pub enum NetworkCommand {
        AddDataCollector(AddDataCollectorParameters) = "network.addDataCollector",
        AddIntercept(AddInterceptParameters) = "network.addIntercept",
        ContinueRequest(ContinueRequestParameters) = "network.continueRequest",
        ContinueResponse(ContinueResponseParameters) = "network.continueResponse",
        ContinueWithAuth(ContinueWithAuthParameters) = "network.continueWithAuth",
        FailRequest(FailRequestParameters) = "network.failRequest",
        GetData(GetDataParameters) = "network.getData",
        ProvideResponse(ProvideResponseParameters) = "network.provideResponse",
        RemoveDataCollector(RemoveDataCollectorParameters) = "network.removeDataCollector",
        RemoveIntercept(RemoveInterceptParameters) = "network.removeIntercept",
        SetCacheBehavior(SetCacheBehaviorParameters) = "network.setCacheBehavior",
        SetExtraHeaders(SetExtraHeadersParameters) = "network.setExtraHeaders",
    }
}

/// Event method names.
pub mod events {
    pub const BEFORE_REQUEST_SENT: &str = "network.beforeRequestSent";
    pub const RESPONSE_STARTED: &str = "network.responseStarted";
    pub const RESPONSE_COMPLETED: &str = "network.responseCompleted";
    pub const FETCH_ERROR: &str = "network.fetchError";
    pub const AUTH_REQUIRED: &str = "network.authRequired";
}

// ============================================================================
// Shared Types
// ============================================================================

/// Header or body bytes: UTF-8 text or base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum BytesValue {
    String(String),
    Base64(String),
}

impl BytesValue {
    /// A UTF-8 text value.
    #[inline]
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Base64-encodes `bytes`.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::Base64(BASE64.encode(bytes))
    }

    /// Returns the raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if a base64 value is malformed.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Self::String(text) => Ok(text.clone().into_bytes()),
            Self::Base64(data) => BASE64.decode(data).map_err(|e| {
                Error::decode(
                    "BytesValue",
                    "value",
                    data.chars().take(16).collect::<String>(),
                    e.to_string(),
                )
            }),
        }
    }

    /// Returns the text of a `string` value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text),
            Self::Base64(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: BytesValue,
    pub domain: String,
    pub path: String,
    pub size: u64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    /// Seconds since the epoch; absent for session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: BytesValue,
}

impl Header {
    /// A header with a text value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: BytesValue::text(value),
        }
    }
}

/// A cookie sent with a continued request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CookieHeader {
    pub name: String,
    pub value: BytesValue,
}

/// A `Set-Cookie` header on a continued or provided response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCookieHeader {
    pub name: String,
    pub value: BytesValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
}

/// URL filter of an intercept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UrlPattern {
    /// Matches the parsed pattern string.
    String { pattern: String },
    /// Matches each given component; absent components match anything.
    Pattern {
        #[serde(skip_serializing_if = "Option::is_none")]
        protocol: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        hostname: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        port: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pathname: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        search: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterceptPhase {
    BeforeRequestSent,
    ResponseStarted,
    AuthRequired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "password")]
pub struct AuthCredentials {
    pub username: String,
    pub password: String,
}

impl AuthCredentials {
    /// Password credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    Request,
    Response,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CollectorType {
    Blob,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheBehavior {
    Default,
    Bypass,
}

// ============================================================================
// Parameter Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDataCollectorParameters {
    pub data_types: Vec<DataType>,
    pub max_encoded_data_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collector_type: Option<CollectorType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<BrowsingContextId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_contexts: Option<Vec<UserContextId>>,
}

impl AddDataCollectorParameters {
    /// A session-wide blob collector.
    #[must_use]
    pub fn new(data_types: Vec<DataType>, max_encoded_data_size: u64) -> Self {
        Self {
            data_types,
            max_encoded_data_size,
            collector_type: None,
            contexts: None,
            user_contexts: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddInterceptParameters {
    pub phases: Vec<InterceptPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<BrowsingContextId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_patterns: Option<Vec<UrlPattern>>,
}

impl AddInterceptParameters {
    /// An intercept matching every URL in every context.
    #[must_use]
    pub fn new(phases: Vec<InterceptPhase>) -> Self {
        Self {
            phases,
            contexts: None,
            url_patterns: None,
        }
    }

    /// Restricts the intercept to URLs matching any of `patterns`.
    #[must_use]
    pub fn url_patterns(mut self, patterns: Vec<UrlPattern>) -> Self {
        self.url_patterns = Some(patterns);
        self
    }
}

/// Resumes a request blocked in `beforeRequestSent`, optionally modified.
#[derive(Debug, Clone, Serialize)]
pub struct ContinueRequestParameters {
    pub request: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<BytesValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Vec<CookieHeader>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<Header>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ContinueRequestParameters {
    /// Continues `request` unchanged.
    #[must_use]
    pub fn new(request: RequestId) -> Self {
        Self {
            request,
            body: None,
            cookies: None,
            headers: None,
            method: None,
            url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueResponseParameters {
    pub request: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Vec<SetCookieHeader>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<AuthCredentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<Header>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_phrase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl ContinueResponseParameters {
    /// Continues the response of `request` unchanged.
    #[must_use]
    pub fn new(request: RequestId) -> Self {
        Self {
            request,
            cookies: None,
            credentials: None,
            headers: None,
            reason_phrase: None,
            status_code: None,
        }
    }
}

/// How to answer an `authRequired` challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum AuthAction {
    ProvideCredentials { credentials: AuthCredentials },
    /// Let the browser handle the challenge, usually by prompting.
    Default,
    Cancel,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContinueWithAuthParameters {
    pub request: RequestId,
    #[serde(flatten)]
    pub action: AuthAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailRequestParameters {
    pub request: RequestId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDataParameters {
    pub data_type: DataType,
    pub request: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collector: Option<CollectorId>,
    /// Releases the data from `collector` after reading. Requires `collector`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disown: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvideResponseParameters {
    pub request: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<BytesValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Vec<SetCookieHeader>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<Header>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_phrase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl ProvideResponseParameters {
    /// An empty response with every field left to the remote end.
    #[must_use]
    pub fn new(request: RequestId) -> Self {
        Self {
            request,
            body: None,
            cookies: None,
            headers: None,
            reason_phrase: None,
            status_code: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveDataCollectorParameters {
    pub collector: CollectorId,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveInterceptParameters {
    pub intercept: InterceptId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCacheBehaviorParameters {
    pub cache_behavior: CacheBehavior,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<BrowsingContextId>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetExtraHeadersParameters {
    pub headers: Vec<Header>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<BrowsingContextId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_contexts: Option<Vec<UserContextId>>,
}

// ============================================================================
// Result Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AddDataCollectorResult {
    pub collector: CollectorId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddInterceptResult {
    pub intercept: InterceptId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetDataResult {
    pub bytes: BytesValue,
}

// ============================================================================
// Event Types
// ============================================================================

/// Timings in milliseconds relative to `time_origin`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchTimingInfo {
    pub time_origin: f64,
    pub request_time: f64,
    pub redirect_start: f64,
    pub redirect_end: f64,
    pub fetch_start: f64,
    pub dns_start: f64,
    pub dns_end: f64,
    pub connect_start: f64,
    pub connect_end: f64,
    pub tls_start: f64,
    pub request_start: f64,
    pub response_start: f64,
    pub response_end: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestData {
    pub request: RequestId,
    pub url: String,
    pub method: String,
    pub headers: Vec<Header>,
    pub cookies: Vec<Cookie>,
    pub headers_size: u64,
    #[serde(default)]
    pub body_size: Option<u64>,
    pub destination: String,
    #[serde(default)]
    pub initiator_type: Option<String>,
    pub timings: FetchTimingInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthChallenge {
    pub scheme: String,
    pub realm: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ResponseContent {
    pub size: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    pub url: String,
    pub protocol: String,
    pub status: u16,
    pub status_text: String,
    pub from_cache: bool,
    pub headers: Vec<Header>,
    pub mime_type: String,
    pub bytes_received: u64,
    #[serde(default)]
    pub headers_size: Option<u64>,
    #[serde(default)]
    pub body_size: Option<u64>,
    pub content: ResponseContent,
    #[serde(default)]
    pub auth_challenges: Option<Vec<AuthChallenge>>,
}

/// Fields shared by every network event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseParameters {
    #[serde(default)]
    pub context: Option<BrowsingContextId>,
    pub is_blocked: bool,
    #[serde(default)]
    pub navigation: Option<NavigationId>,
    pub redirect_count: u32,
    pub request: RequestData,
    pub timestamp: u64,
    /// Intercepts that blocked the request; present only when blocked.
    #[serde(default)]
    pub intercepts: Option<Vec<InterceptId>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InitiatorType {
    Parser,
    Script,
    Preflight,
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Initiator {
    #[serde(default)]
    pub column_number: Option<u64>,
    #[serde(default)]
    pub line_number: Option<u64>,
    #[serde(default)]
    pub request: Option<RequestId>,
    #[serde(default)]
    pub stack_trace: Option<StackTrace>,
    #[serde(default, rename = "type")]
    pub kind: Option<InitiatorType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BeforeRequestSentParams {
    #[serde(flatten)]
    pub base: BaseParameters,
    #[serde(default)]
    pub initiator: Option<Initiator>,
}

/// Payload of `responseStarted`, `responseCompleted` and `authRequired`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseParams {
    #[serde(flatten)]
    pub base: BaseParameters,
    pub response: ResponseData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchErrorParams {
    #[serde(flatten)]
    pub base: BaseParameters,
    pub error_text: String,
}

// ============================================================================
// NetworkModule
// ============================================================================

facade! {
    /// `network.*` façade.
    pub struct NetworkModule;
    commands: NetworkCommand;
}

impl NetworkModule {
    /// Starts retaining request or response bodies for `get_data`.
    pub async fn add_data_collector(
        &self,
        params: AddDataCollectorParameters,
    ) -> Result<CollectorId> {
        let result: AddDataCollectorResult = self
            .execute(NetworkCommand::AddDataCollector(params))
            .await?;
        debug!(collector = %result.collector, "Data collector added");
        Ok(result.collector)
    }

    /// Blocks matching requests at the given phases.
    pub async fn add_intercept(&self, params: AddInterceptParameters) -> Result<InterceptId> {
        let result: AddInterceptResult = self.execute(NetworkCommand::AddIntercept(params)).await?;
        debug!(intercept = %result.intercept, "Intercept added");
        Ok(result.intercept)
    }

    /// Resumes a request blocked in `beforeRequestSent`.
    pub async fn continue_request(&self, params: ContinueRequestParameters) -> Result<()> {
        debug!(request = %params.request, "Continuing request");
        let _: EmptyResult = self.execute(NetworkCommand::ContinueRequest(params)).await?;
        Ok(())
    }

    /// Resumes a response blocked in `responseStarted` or `authRequired`.
    pub async fn continue_response(&self, params: ContinueResponseParameters) -> Result<()> {
        debug!(request = %params.request, "Continuing response");
        let _: EmptyResult = self
            .execute(NetworkCommand::ContinueResponse(params))
            .await?;
        Ok(())
    }

    /// Answers an auth challenge.
    pub async fn continue_with_auth(&self, request: RequestId, action: AuthAction) -> Result<()> {
        debug!(request = %request, "Continuing with auth");
        let _: EmptyResult = self
            .execute(NetworkCommand::ContinueWithAuth(ContinueWithAuthParameters {
                request,
                action,
            }))
            .await?;
        Ok(())
    }

    /// Fails a blocked request with a network error.
    pub async fn fail_request(&self, request: RequestId) -> Result<()> {
        debug!(request = %request, "Failing request");
        let _: EmptyResult = self
            .execute(NetworkCommand::FailRequest(FailRequestParameters { request }))
            .await?;
        Ok(())
    }

    /// Reads collected data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `disown` is set without a
    /// collector.
    pub async fn get_data(&self, params: GetDataParameters) -> Result<BytesValue> {
        if params.disown == Some(true) && params.collector.is_none() {
            return Err(Error::invalid_argument("disown requires a collector"));
        }

        let result: GetDataResult = self.execute(NetworkCommand::GetData(params)).await?;
        Ok(result.bytes)
    }

    /// Answers a blocked request without contacting the server.
    pub async fn provide_response(&self, params: ProvideResponseParameters) -> Result<()> {
        debug!(request = %params.request, "Providing response");
        let _: EmptyResult = self
            .execute(NetworkCommand::ProvideResponse(params))
            .await?;
        Ok(())
    }

    /// Stops a collector and releases its data.
    pub async fn remove_data_collector(&self, collector: CollectorId) -> Result<()> {
        let _: EmptyResult = self
            .execute(NetworkCommand::RemoveDataCollector(
                RemoveDataCollectorParameters { collector },
            ))
            .await?;
        Ok(())
    }

    /// Removes an intercept. Requests it already blocked stay blocked.
    pub async fn remove_intercept(&self, intercept: InterceptId) -> Result<()> {
        debug!(intercept = %intercept, "Removing intercept");
        let _: EmptyResult = self
            .execute(NetworkCommand::RemoveIntercept(RemoveInterceptParameters {
                intercept,
            }))
            .await?;
        Ok(())
    }

    /// Bypasses the HTTP cache in `contexts`, or everywhere when `None`.
    pub async fn set_cache_behavior(
        &self,
        cache_behavior: CacheBehavior,
        contexts: Option<Vec<BrowsingContextId>>,
    ) -> Result<()> {
        let _: EmptyResult = self
            .execute(NetworkCommand::SetCacheBehavior(SetCacheBehaviorParameters {
                cache_behavior,
                contexts,
            }))
            .await?;
        Ok(())
    }

    /// Adds headers to every request in scope. An empty list clears them.
    pub async fn set_extra_headers(&self, params: SetExtraHeadersParameters) -> Result<()> {
        let _: EmptyResult = self
            .execute(NetworkCommand::SetExtraHeaders(params))
            .await?;
        Ok(())
    }
}

event_subscriptions! {
    impl NetworkModule {
        fn on_before_request_sent(events::BEFORE_REQUEST_SENT) -> BeforeRequestSentParams;
        fn on_response_started(events::RESPONSE_STARTED) -> ResponseParams;
        fn on_response_completed(events::RESPONSE_COMPLETED) -> ResponseParams;
        fn on_fetch_error(events::FETCH_ERROR) -> FetchErrorParams;
        fn on_auth_required(events::AUTH_REQUIRED) -> ResponseParams;
    }
}

// ============================================================================
// Tests
// ============================================================================
