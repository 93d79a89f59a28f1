//! The `script` domain: evaluation, function calls, realms, preload scripts
//! and channels.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `remote_value` | [`RemoteValue`], decoded by discriminator table |
//! | `local_value` | [`LocalValue`] and reference types, encoded by hand |
//!
//! # Example
//!
//! ```ignore
//! let result = bidi
//!     .script()
//!     .evaluate(EvaluateParameters::new("1 + 1", Target::context(context)))
//!     .await?
//!     .into_value()?;
//! assert_eq!(result.as_f64(), Some(2.0));
//! ```

// ============================================================================
// Submodules
// ============================================================================

pub mod local_value;
pub mod remote_value;

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::Nullable;
use crate::error::{Error, Result};
use crate::identifiers::{
    BrowsingContextId, ChannelId, Handle, PreloadScriptId, RealmId, UserContextId,
};
use crate::protocol::{EmptyResult, bidi_commands};

// ============================================================================
// Re-exports
// ============================================================================

pub use local_value::{
    ChannelProperties, ChannelValue, LocalValue, MappingKey, RemoteObjectReference,
    SharedReference,
};
pub use remote_value::{
    ListRemoteValue, MappingRemoteValue, NodeProperties, NodeRemoteValue, ObjectHandle,
    RemoteValue, WindowRemoteValue,
};

// ============================================================================
// Events
// ============================================================================

/// Event method names.
pub mod events {
    pub const MESSAGE: &str = "script.message";
    pub const REALM_CREATED: &str = "script.realmCreated";
    pub const REALM_DESTROYED: &str = "script.realmDestroyed";
}

// ============================================================================
// Commands
// ============================================================================

bidi_commands! {
    /// `script.*` commands.
    pub enum ScriptCommand {
        AddPreloadScript(AddPreloadScriptParameters) = "script.addPreloadScript",
        CallFunction(CallFunctionParameters) = "script.callFunction",
        Disown(DisownParameters) = "script.disown",
        Evaluate(EvaluateParameters) = "script.evaluate",
        GetRealms(GetRealmsParameters) = "script.getRealms",
        RemovePreloadScript(RemovePreloadScriptParameters) = "script.removePreloadScript",
    }
}

// ============================================================================
// Shared Types
// ============================================================================

/// Where script runs: a realm, or a browsing context's (sandboxed) realm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Target {
    Realm {
        realm: RealmId,
    },
    Context {
        context: BrowsingContextId,
        #[serde(skip_serializing_if = "Option::is_none")]
        sandbox: Option<String>,
    },
}

impl Target {
    /// A specific realm.
    #[inline]
    #[must_use]
    pub fn realm(realm: RealmId) -> Self {
        Self::Realm { realm }
    }

    /// The context's default realm.
    #[inline]
    #[must_use]
    pub fn context(context: BrowsingContextId) -> Self {
        Self::Context {
            context,
            sandbox: None,
        }
    }

    /// A named sandbox in the context, created on first use.
    #[inline]
    #[must_use]
    pub fn sandbox(context: BrowsingContextId, sandbox: impl Into<String>) -> Self {
        Self::Context {
            context,
            sandbox: Some(sandbox.into()),
        }
    }
}

/// Whether returned objects get a handle that keeps them alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultOwnership {
    Root,
    None,
}

/// Limits on how deep results are serialized.
///
/// Depths are three-state: absent uses the remote default, `Null` means
/// unlimited, a value sets the limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializationOptions {
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub max_dom_depth: Nullable<u32>,
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub max_object_depth: Nullable<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_shadow_tree: Option<IncludeShadowTree>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IncludeShadowTree {
    None,
    Open,
    All,
}

/// Origin of a `script.message`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Source {
    pub realm: RealmId,
    #[serde(default)]
    pub context: Option<BrowsingContextId>,
}

// ============================================================================
// Evaluation
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateParameters {
    pub expression: String,
    pub target: Target,
    /// Wait for a returned promise to settle.
    pub await_promise: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_ownership: Option<ResultOwnership>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialization_options: Option<SerializationOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_activation: Option<bool>,
}

impl EvaluateParameters {
    /// Evaluates `expression` in `target`, awaiting promises.
    #[must_use]
    pub fn new(expression: impl Into<String>, target: Target) -> Self {
        Self {
            expression: expression.into(),
            target,
            await_promise: true,
            result_ownership: None,
            serialization_options: None,
            user_activation: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFunctionParameters {
    pub function_declaration: String,
    pub await_promise: bool,
    pub target: Target,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<LocalValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_ownership: Option<ResultOwnership>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialization_options: Option<SerializationOptions>,
    #[serde(rename = "this", skip_serializing_if = "Option::is_none")]
    pub this: Option<LocalValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_activation: Option<bool>,
}

impl CallFunctionParameters {
    /// Calls `function_declaration` in `target` with `arguments`.
    #[must_use]
    pub fn new(
        function_declaration: impl Into<String>,
        target: Target,
        arguments: Vec<LocalValue>,
    ) -> Self {
        Self {
            function_declaration: function_declaration.into(),
            await_promise: true,
            target,
            arguments: Some(arguments),
            result_ownership: None,
            serialization_options: None,
            this: None,
            user_activation: None,
        }
    }
}

/// Outcome of `evaluate` and `callFunction`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EvaluateResult {
    Success {
        result: RemoteValue,
        realm: RealmId,
    },
    Exception {
        #[serde(rename = "exceptionDetails")]
        exception_details: ExceptionDetails,
        realm: RealmId,
    },
}

impl EvaluateResult {
    /// Returns the value, turning a thrown exception into an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] with code `javascript error` if the
    /// script threw.
    pub fn into_value(self) -> Result<RemoteValue> {
        match self {
            Self::Success { result, .. } => Ok(result),
            Self::Exception {
                exception_details, ..
            } => Err(Error::protocol(
                "javascript error",
                exception_details.text,
                Some(exception_details.stack_trace.to_string()),
            )),
        }
    }

    /// Realm the script ran in.
    #[inline]
    #[must_use]
    pub fn realm(&self) -> &RealmId {
        match self {
            Self::Success { realm, .. } | Self::Exception { realm, .. } => realm,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    pub column_number: u32,
    pub exception: RemoteValue,
    pub line_number: u32,
    pub stack_trace: StackTrace,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTrace {
    pub call_frames: Vec<StackFrame>,
}

impl std::fmt::Display for StackTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for frame in &self.call_frames {
            writeln!(
                f,
                "{}@{}:{}:{}",
                frame.function_name, frame.url, frame.line_number, frame.column_number
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub column_number: u32,
    pub function_name: String,
    pub line_number: u32,
    pub url: String,
}

// ============================================================================
// Realms
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BaseRealmInfo {
    pub realm: RealmId,
    pub origin: String,
}

/// A realm, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RealmInfo {
    Window {
        #[serde(flatten)]
        base: BaseRealmInfo,
        context: BrowsingContextId,
        #[serde(default)]
        sandbox: Option<String>,
    },
    DedicatedWorker {
        #[serde(flatten)]
        base: BaseRealmInfo,
        owners: Vec<RealmId>,
    },
    SharedWorker(BaseRealmInfo),
    ServiceWorker(BaseRealmInfo),
    Worker(BaseRealmInfo),
    PaintWorklet(BaseRealmInfo),
    AudioWorklet(BaseRealmInfo),
    Worklet(BaseRealmInfo),
    /// A realm type this crate does not know.
    #[serde(other)]
    Unknown,
}

impl RealmInfo {
    /// Returns the common realm fields, unless the type is unknown.
    #[must_use]
    pub fn base(&self) -> Option<&BaseRealmInfo> {
        match self {
            Self::Window { base, .. } | Self::DedicatedWorker { base, .. } => Some(base),
            Self::SharedWorker(base)
            | Self::ServiceWorker(base)
            | Self::Worker(base)
            | Self::PaintWorklet(base)
            | Self::AudioWorklet(base)
            | Self::Worklet(base) => Some(base),
            Self::Unknown => None,
        }
    }
}

/// Realm type filter for `getRealms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RealmType {
    Window,
    DedicatedWorker,
    SharedWorker,
    ServiceWorker,
    Worker,
    PaintWorklet,
    AudioWorklet,
    Worklet,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GetRealmsParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<BrowsingContextId>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<RealmType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetRealmsResult {
    pub realms: Vec<RealmInfo>,
}

// ============================================================================
// Preload Scripts / Disown
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPreloadScriptParameters {
    pub function_declaration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<ChannelValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<BrowsingContextId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_contexts: Option<Vec<UserContextId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<String>,
}

impl AddPreloadScriptParameters {
    /// Runs `function_declaration` in every new document.
    #[must_use]
    pub fn new(function_declaration: impl Into<String>) -> Self {
        Self {
            function_declaration: function_declaration.into(),
            arguments: None,
            contexts: None,
            user_contexts: None,
            sandbox: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddPreloadScriptResult {
    pub script: PreloadScriptId,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemovePreloadScriptParameters {
    pub script: PreloadScriptId,
}

#[derive(Debug, Clone, Serialize)]
pub struct DisownParameters {
    pub handles: Vec<Handle>,
    pub target: Target,
}

// ============================================================================
// Event Payloads
// ============================================================================

/// A value sent through a channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageParams {
    pub channel: ChannelId,
    pub data: RemoteValue,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RealmDestroyedParams {
    pub realm: RealmId,
}

// ============================================================================
// ScriptModule
// ============================================================================

facade! {
    /// `script.*` façade.
    pub struct ScriptModule;
    commands: ScriptCommand;
}

impl ScriptModule {
    /// Registers a script that runs before any page script.
    pub async fn add_preload_script(
        &self,
        params: AddPreloadScriptParameters,
    ) -> Result<PreloadScriptId> {
        let result: AddPreloadScriptResult = self
            .execute(ScriptCommand::AddPreloadScript(params))
            .await?;
        debug!(script = %result.script, "Preload script added");
        Ok(result.script)
    }

    /// Calls a function.
    pub async fn call_function(&self, params: CallFunctionParameters) -> Result<EvaluateResult> {
        debug!(
            function_len = params.function_declaration.len(),
            args = params.arguments.as_ref().map_or(0, Vec::len),
            "Calling function"
        );
        self.execute(ScriptCommand::CallFunction(params)).await
    }

    /// Releases handles so their objects can be collected.
    pub async fn disown(&self, handles: Vec<Handle>, target: Target) -> Result<()> {
        debug!(count = handles.len(), "Disowning handles");
        let _: EmptyResult = self
            .execute(ScriptCommand::Disown(DisownParameters { handles, target }))
            .await?;
        Ok(())
    }

    /// Evaluates an expression.
    pub async fn evaluate(&self, params: EvaluateParameters) -> Result<EvaluateResult> {
        debug!(expression_len = params.expression.len(), "Evaluating");
        self.execute(ScriptCommand::Evaluate(params)).await
    }

    /// Lists realms, optionally filtered by context and type.
    pub async fn get_realms(&self, params: GetRealmsParameters) -> Result<Vec<RealmInfo>> {
        let result: GetRealmsResult = self.execute(ScriptCommand::GetRealms(params)).await?;
        Ok(result.realms)
    }

    /// Removes a preload script.
    pub async fn remove_preload_script(&self, script: PreloadScriptId) -> Result<()> {
        debug!(script = %script, "Removing preload script");
        let _: EmptyResult = self
            .execute(ScriptCommand::RemovePreloadScript(
                RemovePreloadScriptParameters { script },
            ))
            .await?;
        Ok(())
    }
}

event_subscriptions! {
    impl ScriptModule {
        fn on_message(events::MESSAGE) -> MessageParams;
        fn on_realm_created(events::REALM_CREATED) -> RealmInfo;
        fn on_realm_destroyed(events::REALM_DESTROYED) -> RealmDestroyedParams;
    }
}

// ============================================================================
// Tests
// ============================================================================
