//! Domain façades bound to one browsing context.
//!
//! Each wraps the session-wide façade and fills in the context: commands
//! target it, interceptions and cache overrides are limited to it, and
//! subscriptions only yield its events.

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;
use crate::identifiers::BrowsingContextId;
use crate::modules::input::{FileDialogInfo, InputModule, SourceActions};
use crate::modules::log::{LogEntry, LogModule};
use crate::modules::network::{
    BeforeRequestSentParams, CacheBehavior, FetchErrorParams, InterceptOptions, InterceptedAuth,
    InterceptedRequest, InterceptedResponse, Interception, NetworkModule, ResponseParams,
};
use crate::modules::script::SharedReference;
use crate::modules::session::{Subscription, SubscriptionOptions};

use super::BrowsingContextModule;

// ============================================================================
// BrowsingContextModule - Derived Façades
// ============================================================================

impl BrowsingContextModule {
    /// `log.*` restricted to `context`.
    #[must_use]
    pub fn log(&self, context: BrowsingContextId) -> BrowsingContextLogModule {
        let log = LogModule::new(self.broker.clone());
        BrowsingContextLogModule {
            context,
            log: match self.timeout {
                Some(timeout) => log.with_timeout(timeout),
                None => log,
            },
        }
    }

    /// `network.*` restricted to `context`.
    #[must_use]
    pub fn network(&self, context: BrowsingContextId) -> BrowsingContextNetworkModule {
        let network = NetworkModule::new(self.broker.clone());
        BrowsingContextNetworkModule {
            context,
            network: match self.timeout {
                Some(timeout) => network.with_timeout(timeout),
                None => network,
            },
        }
    }

    /// `input.*` targeting `context`.
    #[must_use]
    pub fn input(&self, context: BrowsingContextId) -> BrowsingContextInputModule {
        let input = InputModule::new(self.broker.clone());
        BrowsingContextInputModule {
            context,
            input: match self.timeout {
                Some(timeout) => input.with_timeout(timeout),
                None => input,
            },
        }
    }
}

/// Remote and local scope for one context.
fn only(context: &BrowsingContextId) -> SubscriptionOptions {
    SubscriptionOptions::default().contexts([context.clone()])
}

// ============================================================================
// BrowsingContextLogModule
// ============================================================================

/// Log entries of one context.
#[derive(Debug, Clone)]
pub struct BrowsingContextLogModule {
    context: BrowsingContextId,
    log: LogModule,
}

impl BrowsingContextLogModule {
    /// The context every call targets.
    #[inline]
    #[must_use]
    pub fn context(&self) -> &BrowsingContextId {
        &self.context
    }

    /// Entries whose source is this context.
    pub async fn on_entry_added(&self) -> Result<Subscription<LogEntry>> {
        self.log.on_entry_added_in(self.context.clone()).await
    }
}

// ============================================================================
// BrowsingContextNetworkModule
// ============================================================================

/// Network traffic of one context.
#[derive(Debug, Clone)]
pub struct BrowsingContextNetworkModule {
    context: BrowsingContextId,
    network: NetworkModule,
}

impl BrowsingContextNetworkModule {
    /// The context every call targets.
    #[inline]
    #[must_use]
    pub fn context(&self) -> &BrowsingContextId {
        &self.context
    }

    /// Blocks this context's matching requests before they are sent.
    ///
    /// Any contexts already set on `options` are replaced.
    pub async fn intercept_requests(
        &self,
        options: InterceptOptions,
    ) -> Result<Interception<InterceptedRequest>> {
        self.network.intercept_requests(self.scope(options)).await
    }

    /// Blocks this context's matching responses once headers arrive.
    pub async fn intercept_responses(
        &self,
        options: InterceptOptions,
    ) -> Result<Interception<InterceptedResponse>> {
        self.network.intercept_responses(self.scope(options)).await
    }

    /// Blocks this context's matching requests on auth challenges.
    pub async fn intercept_auth(
        &self,
        options: InterceptOptions,
    ) -> Result<Interception<InterceptedAuth>> {
        self.network.intercept_auth(self.scope(options)).await
    }

    /// Overrides the HTTP cache behavior of this context only.
    pub async fn set_cache_behavior(&self, cache_behavior: CacheBehavior) -> Result<()> {
        self.network
            .set_cache_behavior(cache_behavior, Some(vec![self.context.clone()]))
            .await
    }

    /// Requests this context is about to send.
    pub async fn on_before_request_sent(&self) -> Result<Subscription<BeforeRequestSentParams>> {
        self.network.on_before_request_sent(only(&self.context)).await
    }

    /// Response headers received in this context.
    pub async fn on_response_started(&self) -> Result<Subscription<ResponseParams>> {
        self.network.on_response_started(only(&self.context)).await
    }

    /// Responses this context finished reading.
    pub async fn on_response_completed(&self) -> Result<Subscription<ResponseParams>> {
        self.network.on_response_completed(only(&self.context)).await
    }

    /// Requests of this context that failed.
    pub async fn on_fetch_error(&self) -> Result<Subscription<FetchErrorParams>> {
        self.network.on_fetch_error(only(&self.context)).await
    }

    /// Auth challenges this context received.
    pub async fn on_auth_required(&self) -> Result<Subscription<ResponseParams>> {
        self.network.on_auth_required(only(&self.context)).await
    }

    fn scope(&self, options: InterceptOptions) -> InterceptOptions {
        options.contexts([self.context.clone()])
    }
}

// ============================================================================
// BrowsingContextInputModule
// ============================================================================

/// Simulated input into one context.
#[derive(Debug, Clone)]
pub struct BrowsingContextInputModule {
    context: BrowsingContextId,
    input: InputModule,
}

impl BrowsingContextInputModule {
    /// The context every call targets.
    #[inline]
    #[must_use]
    pub fn context(&self) -> &BrowsingContextId {
        &self.context
    }

    /// Runs `actions` tick by tick in this context.
    pub async fn perform_actions(&self, actions: Vec<SourceActions>) -> Result<()> {
        self.input
            .perform_actions(self.context.clone(), actions)
            .await
    }

    /// Releases every pressed key and button in this context.
    pub async fn release_actions(&self) -> Result<()> {
        self.input.release_actions(self.context.clone()).await
    }

    /// Sets the files of an `<input type="file">` in this context.
    pub async fn set_files(&self, element: SharedReference, files: Vec<String>) -> Result<()> {
        self.input
            .set_files(self.context.clone(), element, files)
            .await
    }

    /// File pickers this context opens.
    pub async fn on_file_dialog_opened(&self) -> Result<Subscription<FileDialogInfo>> {
        self.input.on_file_dialog_opened(only(&self.context)).await
    }
}

// ============================================================================
// Tests
// ============================================================================
