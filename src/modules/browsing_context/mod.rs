//! The `browsingContext` domain: navigables, navigation, screenshots,
//! printing, prompts and viewports.
//!
//! # Commands
//!
//! | Method | Façade call |
//! |--------|-------------|
//! | `activate` | [`BrowsingContextModule::activate`] |
//! | `captureScreenshot` | [`BrowsingContextModule::capture_screenshot`] |
//! | `close` | [`BrowsingContextModule::close`] |
//! | `create` | [`BrowsingContextModule::create`] |
//! | `getTree` | [`BrowsingContextModule::get_tree`] |
//! | `handleUserPrompt` | [`BrowsingContextModule::handle_user_prompt`] |
//! | `locateNodes` | [`BrowsingContextModule::locate_nodes`] |
//! | `navigate` | [`BrowsingContextModule::navigate`] |
//! | `print` | [`BrowsingContextModule::print`] |
//! | `reload` | [`BrowsingContextModule::reload`] |
//! | `setViewport` | [`BrowsingContextModule::set_viewport`] |
//! | `traverseHistory` | [`BrowsingContextModule::traverse_history`] |
//!
//! # Per-context façades
//!
//! [`BrowsingContextModule::log`], [`BrowsingContextModule::network`] and
//! [`BrowsingContextModule::input`] bind the matching domain to one context,
//! so calls and subscriptions need no context argument.

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::Nullable;
use crate::error::{Error, Result};
use crate::identifiers::{BrowsingContextId, ClientWindowId, NavigationId, UserContextId};
use crate::protocol::{EmptyResult, bidi_commands};

use super::script::{RemoteValue, SerializationOptions, SharedReference};
use super::session::UserPromptHandlerType;

mod scoped;

pub use scoped::{BrowsingContextInputModule, BrowsingContextLogModule, BrowsingContextNetworkModule};

// ============================================================================
// Events
// ============================================================================

/// Event method names.
pub mod events {
    pub const CONTEXT_CREATED: &str = "browsingContext.contextCreated";
    pub const CONTEXT_DESTROYED: &str = "browsingContext.contextDestroyed";
    pub const NAVIGATION_STARTED: &str = "browsingContext.navigationStarted";
    pub const FRAGMENT_NAVIGATED: &str = "browsingContext.fragmentNavigated";
    pub const HISTORY_UPDATED: &str = "browsingContext.historyUpdated";
    pub const DOM_CONTENT_LOADED: &str = "browsingContext.domContentLoaded";
    pub const LOAD: &str = "browsingContext.load";
    pub const DOWNLOAD_WILL_BEGIN: &str = "browsingContext.downloadWillBegin";
    pub const DOWNLOAD_END: &str = "browsingContext.downloadEnd";
    pub const NAVIGATION_ABORTED: &str = "browsingContext.navigationAborted";
    pub const NAVIGATION_COMMITTED: &str = "browsingContext.navigationCommitted";
    pub const NAVIGATION_FAILED: &str = "browsingContext.navigationFailed";
    pub const USER_PROMPT_CLOSED: &str = "browsingContext.userPromptClosed";
    pub const USER_PROMPT_OPENED: &str = "browsingContext.userPromptOpened";
}

// ============================================================================
// Commands
// ============================================================================

bidi_commands! {
    /// `browsingContext.*` commands.
    pub enum BrowsingContextCommand {
        Activate(ContextParameters) = "browsingContext.activate",
        CaptureScreenshot(CaptureScreenshotParameters) = "browsingContext.captureScreenshot",
        Close(CloseParameters) = "browsingContext.close",
        Create(CreateParameters) = "browsingContext.create",
        GetTree(GetTreeParameters) = "browsingContext.getTree",
        HandleUserPrompt(HandleUserPromptParameters) = "browsingContext.handleUserPrompt",
        LocateNodes(LocateNodesParameters) = "browsingContext.locateNodes",
        Navigate(NavigateParameters) = "browsingContext.navigate",
        Print(PrintParameters) = "browsingContext.print",
        Reload(ReloadParameters) = "browsingContext.reload",
        SetViewport(SetViewportParameters) = "browsingContext.setViewport",
        TraverseHistory(TraverseHistoryParameters) = "browsingContext.traverseHistory",
    }
}

// ============================================================================
// Shared Types
// ============================================================================

/// Parameters naming a single browsing context.
#[derive(Debug, Clone, Serialize)]
pub struct ContextParameters {
    pub context: BrowsingContextId,
}

/// How far a navigation waits before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadinessState {
    /// Return as soon as the navigation starts.
    #[default]
    None,
    Interactive,
    Complete,
}

/// A browsing context and, optionally, its descendants.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    /// `None` when the tree was cut off by `maxDepth`.
    pub children: Option<Vec<Info>>,
    pub client_window: ClientWindowId,
    pub context: BrowsingContextId,
    pub original_opener: Option<BrowsingContextId>,
    pub url: String,
    pub user_context: UserContextId,
    #[serde(default)]
    pub parent: Option<BrowsingContextId>,
}

// ============================================================================
// captureScreenshot
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CaptureScreenshotParameters {
    pub context: BrowsingContextId,
    #[serde(flatten)]
    pub options: CaptureScreenshotOptions,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CaptureScreenshotOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<ScreenshotOrigin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ImageFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip: Option<ClipRectangle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScreenshotOrigin {
    Viewport,
    Document,
}

/// Screenshot encoding, e.g. `image/png` or `image/jpeg` with a quality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageFormat {
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Between 0.0 and 1.0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,
}

impl ImageFormat {
    /// Lossless PNG.
    #[must_use]
    pub fn png() -> Self {
        Self {
            mime_type: "image/png".to_owned(),
            quality: None,
        }
    }

    /// JPEG with `quality` in `0.0..=1.0`.
    #[must_use]
    pub fn jpeg(quality: f64) -> Self {
        Self {
            mime_type: "image/jpeg".to_owned(),
            quality: Some(quality),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClipRectangle {
    Box {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Element {
        element: SharedReference,
    },
}

/// Base64 image data.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureScreenshotResult {
    pub data: String,
}

impl CaptureScreenshotResult {
    /// Decodes the image bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if `data` is not valid base64.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        decode_base64("CaptureScreenshotResult", &self.data)
    }
}

// ============================================================================
// close / create / getTree
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseParameters {
    pub context: BrowsingContextId,
    /// Run `beforeunload` handlers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_unload: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CreateType {
    Tab,
    Window,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateParameters {
    #[serde(rename = "type")]
    pub kind: CreateType,
    #[serde(flatten)]
    pub options: CreateOptions,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_context: Option<BrowsingContextId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_context: Option<UserContextId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateResult {
    pub context: BrowsingContextId,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTreeParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<BrowsingContextId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetTreeResult {
    pub contexts: Vec<Info>,
}

// ============================================================================
// handleUserPrompt
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleUserPromptParameters {
    pub context: BrowsingContextId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_text: Option<String>,
}

// ============================================================================
// locateNodes
// ============================================================================

/// Node query strategy, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Locator {
    Accessibility { value: AccessibilityLocatorValue },
    Css { value: String },
    Context { value: ContextLocatorValue },
    InnerText {
        value: String,
        #[serde(rename = "ignoreCase", skip_serializing_if = "Option::is_none")]
        ignore_case: Option<bool>,
        #[serde(rename = "matchType", skip_serializing_if = "Option::is_none")]
        match_type: Option<InnerTextMatchType>,
        #[serde(rename = "maxDepth", skip_serializing_if = "Option::is_none")]
        max_depth: Option<u32>,
    },
    #[serde(rename = "xpath")]
    XPath { value: String },
}

impl Locator {
    /// CSS selector locator.
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css {
            value: selector.into(),
        }
    }

    /// XPath expression locator.
    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath {
            value: expression.into(),
        }
    }

    /// Full, case sensitive inner text match.
    #[must_use]
    pub fn inner_text(text: impl Into<String>) -> Self {
        Self::InnerText {
            value: text.into(),
            ignore_case: None,
            match_type: None,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccessibilityLocatorValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextLocatorValue {
    pub context: BrowsingContextId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InnerTextMatchType {
    Full,
    Partial,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocateNodesParameters {
    pub context: BrowsingContextId,
    pub locator: Locator,
    #[serde(flatten)]
    pub options: LocateNodesOptions,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocateNodesOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_node_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialization_options: Option<SerializationOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_nodes: Option<Vec<SharedReference>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocateNodesResult {
    pub nodes: Vec<RemoteValue>,
}

// ============================================================================
// navigate / reload / traverseHistory
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct NavigateParameters {
    pub context: BrowsingContextId,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait: Option<ReadinessState>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NavigateResult {
    /// `None` when the navigation was same-document.
    pub navigation: Option<NavigationId>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadParameters {
    pub context: BrowsingContextId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_cache: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait: Option<ReadinessState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraverseHistoryParameters {
    pub context: BrowsingContextId,
    /// Negative goes back, positive goes forward.
    pub delta: i64,
}

// ============================================================================
// print
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PrintParameters {
    pub context: BrowsingContextId,
    #[serde(flatten)]
    pub options: PrintOptions,
}

/// Page setup. Lengths are in centimeters.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<PrintMargin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<PrintOrientation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PrintPage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_ranges: Option<Vec<PageRange>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shrink_to_fit: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PrintMargin {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PrintOrientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PrintPage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
}

/// A single page number or a range such as `"2-5"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PageRange {
    Page(u32),
    Range(String),
}

/// Base64 PDF data.
#[derive(Debug, Clone, Deserialize)]
pub struct PrintResult {
    pub data: String,
}

impl PrintResult {
    /// Decodes the PDF bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if `data` is not valid base64.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        decode_base64("PrintResult", &self.data)
    }
}

// ============================================================================
// setViewport
// ============================================================================

/// Parameters of `browsingContext.setViewport`.
///
/// `viewport` and `device_pixel_ratio` are three-state: absent leaves the
/// current value, `Null` resets to the default, a value overrides.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetViewportParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<BrowsingContextId>,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub viewport: Nullable<Viewport>,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub device_pixel_ratio: Nullable<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_contexts: Option<Vec<UserContextId>>,
}

impl SetViewportParameters {
    /// Targets one top-level browsing context.
    #[must_use]
    pub fn for_context(context: BrowsingContextId) -> Self {
        Self {
            context: Some(context),
            ..Self::default()
        }
    }

    /// Targets user contexts.
    #[must_use]
    pub fn for_user_contexts(user_contexts: Vec<UserContextId>) -> Self {
        Self {
            user_contexts: Some(user_contexts),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

// ============================================================================
// Event Payloads
// ============================================================================

/// Payload shared by navigation lifecycle events.
#[derive(Debug, Clone, Deserialize)]
pub struct NavigationInfo {
    pub context: BrowsingContextId,
    pub navigation: Option<NavigationId>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadWillBeginParams {
    pub suggested_filename: String,
    #[serde(flatten)]
    pub navigation: NavigationInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DownloadStatus {
    Canceled,
    Complete,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadEndParams {
    pub status: DownloadStatus,
    /// Saved file path; only for `complete`, and `None` if not saved.
    #[serde(default)]
    pub filepath: Option<String>,
    #[serde(flatten)]
    pub navigation: NavigationInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryUpdatedParams {
    pub context: BrowsingContextId,
    pub timestamp: u64,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserPromptType {
    Alert,
    BeforeUnload,
    Confirm,
    Prompt,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPromptOpenedParams {
    pub context: BrowsingContextId,
    pub handler: UserPromptHandlerType,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: UserPromptType,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub user_context: Option<UserContextId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPromptClosedParams {
    pub context: BrowsingContextId,
    pub accepted: bool,
    #[serde(rename = "type")]
    pub kind: UserPromptType,
    #[serde(default)]
    pub user_text: Option<String>,
    #[serde(default)]
    pub user_context: Option<UserContextId>,
}

// ============================================================================
// BrowsingContextModule
// ============================================================================

facade! {
    /// `browsingContext.*` façade.
    pub struct BrowsingContextModule;
    commands: BrowsingContextCommand;
}

impl BrowsingContextModule {
    /// Brings a top-level context to the foreground.
    pub async fn activate(&self, context: BrowsingContextId) -> Result<()> {
        debug!(context = %context, "Activating context");
        let _: EmptyResult = self
            .execute(BrowsingContextCommand::Activate(ContextParameters { context }))
            .await?;
        Ok(())
    }

    /// Captures a screenshot.
    pub async fn capture_screenshot(
        &self,
        context: BrowsingContextId,
        options: CaptureScreenshotOptions,
    ) -> Result<CaptureScreenshotResult> {
        debug!(context = %context, "Capturing screenshot");
        let result: CaptureScreenshotResult = self
            .execute(BrowsingContextCommand::CaptureScreenshot(
                CaptureScreenshotParameters { context, options },
            ))
            .await?;
        debug!(data_len = result.data.len(), "Screenshot captured");
        Ok(result)
    }

    /// Closes a top-level context.
    pub async fn close(&self, context: BrowsingContextId, prompt_unload: Option<bool>) -> Result<()> {
        debug!(context = %context, "Closing context");
        let _: EmptyResult = self
            .execute(BrowsingContextCommand::Close(CloseParameters {
                context,
                prompt_unload,
            }))
            .await?;
        Ok(())
    }

    /// Opens a new tab or window.
    pub async fn create(&self, kind: CreateType, options: CreateOptions) -> Result<BrowsingContextId> {
        let result: CreateResult = self
            .execute(BrowsingContextCommand::Create(CreateParameters { kind, options }))
            .await?;
        debug!(context = %result.context, kind = ?kind, "Context created");
        Ok(result.context)
    }

    /// Returns the context tree.
    pub async fn get_tree(&self, params: GetTreeParameters) -> Result<Vec<Info>> {
        let result: GetTreeResult = self
            .execute(BrowsingContextCommand::GetTree(params))
            .await?;
        Ok(result.contexts)
    }

    /// Accepts or dismisses an open prompt.
    pub async fn handle_user_prompt(&self, params: HandleUserPromptParameters) -> Result<()> {
        debug!(context = %params.context, accept = ?params.accept, "Handling user prompt");
        let _: EmptyResult = self
            .execute(BrowsingContextCommand::HandleUserPrompt(params))
            .await?;
        Ok(())
    }

    /// Finds nodes matching `locator`.
    pub async fn locate_nodes(
        &self,
        context: BrowsingContextId,
        locator: Locator,
        options: LocateNodesOptions,
    ) -> Result<Vec<RemoteValue>> {
        let result: LocateNodesResult = self
            .execute(BrowsingContextCommand::LocateNodes(LocateNodesParameters {
                context,
                locator,
                options,
            }))
            .await?;
        debug!(count = result.nodes.len(), "Nodes located");
        Ok(result.nodes)
    }

    /// Navigates to `url`.
    pub async fn navigate(
        &self,
        context: BrowsingContextId,
        url: impl Into<String>,
        wait: Option<ReadinessState>,
    ) -> Result<NavigateResult> {
        let url = url.into();
        debug!(context = %context, url = %url, wait = ?wait, "Navigating");
        self.execute(BrowsingContextCommand::Navigate(NavigateParameters { context, url, wait }))
            .await
    }

    /// Prints the document to PDF.
    pub async fn print(&self, context: BrowsingContextId, options: PrintOptions) -> Result<PrintResult> {
        debug!(context = %context, "Printing");
        self.execute(BrowsingContextCommand::Print(PrintParameters { context, options }))
            .await
    }

    /// Reloads the document.
    pub async fn reload(&self, params: ReloadParameters) -> Result<NavigateResult> {
        debug!(context = %params.context, "Reloading");
        self.execute(BrowsingContextCommand::Reload(params)).await
    }

    /// Overrides, resets or leaves the viewport and pixel ratio.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if neither a context nor user
    /// contexts are given.
    pub async fn set_viewport(&self, params: SetViewportParameters) -> Result<()> {
        if params.context.is_none() && params.user_contexts.is_none() {
            return Err(Error::invalid_argument(
                "setViewport needs a context or user contexts",
            ));
        }

        debug!(viewport = ?params.viewport, ratio = ?params.device_pixel_ratio, "Setting viewport");
        let _: EmptyResult = self
            .execute(BrowsingContextCommand::SetViewport(params))
            .await?;
        Ok(())
    }

    /// Moves through session history by `delta` entries.
    pub async fn traverse_history(&self, context: BrowsingContextId, delta: i64) -> Result<()> {
        debug!(context = %context, delta, "Traversing history");
        let _: EmptyResult = self
            .execute(BrowsingContextCommand::TraverseHistory(
                TraverseHistoryParameters { context, delta },
            ))
            .await?;
        Ok(())
    }
}

event_subscriptions! {
    impl BrowsingContextModule {
        fn on_context_created(events::CONTEXT_CREATED) -> Info;
        fn on_context_destroyed(events::CONTEXT_DESTROYED) -> Info;
        fn on_navigation_started(events::NAVIGATION_STARTED) -> NavigationInfo;
        fn on_fragment_navigated(events::FRAGMENT_NAVIGATED) -> NavigationInfo;
        fn on_history_updated(events::HISTORY_UPDATED) -> HistoryUpdatedParams;
        fn on_dom_content_loaded(events::DOM_CONTENT_LOADED) -> NavigationInfo;
        fn on_load(events::LOAD) -> NavigationInfo;
        fn on_download_will_begin(events::DOWNLOAD_WILL_BEGIN) -> DownloadWillBeginParams;
        fn on_download_end(events::DOWNLOAD_END) -> DownloadEndParams;
        fn on_navigation_aborted(events::NAVIGATION_ABORTED) -> NavigationInfo;
        fn on_navigation_committed(events::NAVIGATION_COMMITTED) -> NavigationInfo;
        fn on_navigation_failed(events::NAVIGATION_FAILED) -> NavigationInfo;
        fn on_user_prompt_closed(events::USER_PROMPT_CLOSED) -> UserPromptClosedParams;
        fn on_user_prompt_opened(events::USER_PROMPT_OPENED) -> UserPromptOpenedParams;
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn decode_base64(shape: &str, data: &str) -> Result<Vec<u8>> {
    BASE64.decode(data).map_err(|e| {
        Error::decode(
            shape,
            "data",
            data.chars().take(16).collect::<String>(),
            e.to_string(),
        )
    })
}

// ============================================================================
// Tests
// ============================================================================
