//! The `browser` domain: user contexts, client windows and downloads.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::identifiers::{ClientWindowId, UserContextId};
use crate::protocol::{EmptyParams, EmptyResult, bidi_commands};

use super::session::{ProxyConfiguration, UserPromptHandler};

// ============================================================================
// Commands
// ============================================================================

bidi_commands! {
    /// `browser.*` commands.
    pub enum BrowserCommand {
        Close(EmptyParams) = "browser.close",
        CreateUserContext(CreateUserContextParameters) = "browser.createUserContext",
        GetClientWindows(EmptyParams) = "browser.getClientWindows",
        GetUserContexts(EmptyParams) = "browser.getUserContexts",
        RemoveUserContext(RemoveUserContextParameters) = "browser.removeUserContext",
        SetClientWindowState(SetClientWindowStateParameters) = "browser.setClientWindowState",
        SetDownloadBehavior(SetDownloadBehaviorParameters) = "browser.setDownloadBehavior",
    }
}

// ============================================================================
// Parameter Types
// ============================================================================

/// Options of `browser.createUserContext`. All absent by default.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserContextParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_insecure_certs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unhandled_prompt_behavior: Option<UserPromptHandler>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveUserContextParameters {
    pub user_context: UserContextId,
}

/// Parameters of `browser.setClientWindowState`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetClientWindowStateParameters {
    pub client_window: ClientWindowId,
    #[serde(flatten)]
    pub state: WindowState,
}

/// Requested window state.
///
/// Only `normal` takes a rectangle; every member of it is optional.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum WindowState {
    Fullscreen,
    Maximized,
    Minimized,
    Normal {
        #[serde(skip_serializing_if = "Option::is_none")]
        width: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        height: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        x: Option<i32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        y: Option<i32>,
    },
}

/// Parameters of `browser.setDownloadBehavior`.
///
/// `download_behavior` is always sent: `None` encodes `null`, which
/// restores the default behavior.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDownloadBehaviorParameters {
    pub download_behavior: Option<DownloadBehavior>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_contexts: Option<Vec<UserContextId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DownloadBehavior {
    /// Downloads are saved to `destination_folder`.
    Allowed {
        #[serde(rename = "destinationFolder")]
        destination_folder: String,
    },
    /// Downloads are cancelled.
    Denied,
}

// ============================================================================
// Result Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContextInfo {
    pub user_context: UserContextId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserContextsResult {
    pub user_contexts: Vec<UserContextInfo>,
}

/// An OS window and its geometry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientWindowInfo {
    pub active: bool,
    pub client_window: ClientWindowId,
    pub state: ClientWindowState,
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientWindowState {
    Fullscreen,
    Maximized,
    Minimized,
    Normal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetClientWindowsResult {
    pub client_windows: Vec<ClientWindowInfo>,
}

// ============================================================================
// BrowserModule
// ============================================================================

facade! {
    /// `browser.*` façade.
    pub struct BrowserModule;
    commands: BrowserCommand;
}

impl BrowserModule {
    /// Closes every top-level browsing context and ends the session.
    pub async fn close(&self) -> Result<()> {
        debug!("Closing browser");
        let _: EmptyResult = self.execute(BrowserCommand::Close(EmptyParams {})).await?;
        Ok(())
    }

    /// Creates a user context.
    pub async fn create_user_context(
        &self,
        options: CreateUserContextParameters,
    ) -> Result<UserContextInfo> {
        let info: UserContextInfo = self
            .execute(BrowserCommand::CreateUserContext(options))
            .await?;
        debug!(user_context = %info.user_context, "User context created");
        Ok(info)
    }

    /// Lists user contexts, the default one included.
    pub async fn get_user_contexts(&self) -> Result<Vec<UserContextInfo>> {
        let result: GetUserContextsResult = self
            .execute(BrowserCommand::GetUserContexts(EmptyParams {}))
            .await?;
        Ok(result.user_contexts)
    }

    /// Closes a user context and all of its browsing contexts.
    pub async fn remove_user_context(&self, user_context: UserContextId) -> Result<()> {
        debug!(user_context = %user_context, "Removing user context");
        let _: EmptyResult = self
            .execute(BrowserCommand::RemoveUserContext(
                RemoveUserContextParameters { user_context },
            ))
            .await?;
        Ok(())
    }

    /// Lists client windows.
    pub async fn get_client_windows(&self) -> Result<Vec<ClientWindowInfo>> {
        let result: GetClientWindowsResult = self
            .execute(BrowserCommand::GetClientWindows(EmptyParams {}))
            .await?;
        Ok(result.client_windows)
    }

    /// Changes a window's state and returns its new geometry.
    pub async fn set_client_window_state(
        &self,
        client_window: ClientWindowId,
        state: WindowState,
    ) -> Result<ClientWindowInfo> {
        debug!(client_window = %client_window, state = ?state, "Setting window state");
        self.execute(BrowserCommand::SetClientWindowState(
            SetClientWindowStateParameters {
                client_window,
                state,
            },
        ))
        .await
    }

    /// Sets or, with `None`, resets the download behavior.
    pub async fn set_download_behavior(
        &self,
        download_behavior: Option<DownloadBehavior>,
        user_contexts: Option<Vec<UserContextId>>,
    ) -> Result<()> {
        debug!(behavior = ?download_behavior, "Setting download behavior");
        let _: EmptyResult = self
            .execute(BrowserCommand::SetDownloadBehavior(
                SetDownloadBehaviorParameters {
                    download_behavior,
                    user_contexts,
                },
            ))
            .await?;
        Ok(())
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
    async fn test_create_user_context_omits_absent_options() {
        let (bidi, mut peer) = connect();
        let browser = bidi.browser();

        let (info, request) = tokio::join!(
            browser.create_user_context(CreateUserContextParameters::default()),
            respond(&mut peer, json!({"userContext": "uc-1"}))
        );

        assert_eq!(request["method"], "browser.createUserContext");
        assert_eq!(request["params"], json!({}));
        assert_eq!(info.expect("info").user_context.as_str(), "uc-1");
    }

    #[tokio::test]
    async fn test_get_user_contexts() {
        let (bidi, mut peer) = connect();
        let browser = bidi.browser();

        let (contexts, _) = tokio::join!(
            browser.get_user_contexts(),
            respond(
                &mut peer,
                json!({"userContexts": [{"userContext": "default"}, {"userContext": "uc-1"}]})
            )
        );

        let contexts = contexts.expect("contexts");
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0].user_context, UserContextId::default_context());
    }

    #[tokio::test]
    async fn test_set_client_window_state_flattens_state() {
        let (bidi, mut peer) = connect();
        let browser = bidi.browser();

        let state = WindowState::Normal {
            width: Some(800),
            height: Some(600),
            x: None,
            y: None,
        };
        let reply = json!({
            "active": true, "clientWindow": "w-1", "state": "normal",
            "width": 800, "height": 600, "x": 0, "y": 0
        });

        let (info, request) = tokio::join!(
            browser.set_client_window_state(ClientWindowId::new("w-1"), state),
            respond(&mut peer, reply)
        );

        assert_eq!(
            request["params"],
            json!({"clientWindow": "w-1", "state": "normal", "width": 800, "height": 600})
        );
        assert_eq!(info.expect("info").state, ClientWindowState::Normal);
    }

    #[test]
    fn test_download_behavior_null_and_tagged() {
        let reset = SetDownloadBehaviorParameters {
            download_behavior: None,
            user_contexts: None,
        };
        assert_eq!(
            serde_json::to_value(&reset).expect("encode"),
            json!({"downloadBehavior": null})
        );

        let allowed = SetDownloadBehaviorParameters {
            download_behavior: Some(DownloadBehavior::Allowed {
                destination_folder: "/tmp/dl".to_owned(),
            }),
            user_contexts: Some(vec![UserContextId::new("uc-1")]),
        };
        assert_eq!(
            serde_json::to_value(&allowed).expect("encode"),
            json!({
                "downloadBehavior": {"type": "allowed", "destinationFolder": "/tmp/dl"},
                "userContexts": ["uc-1"]
            })
        );
    }

    #[test]
    fn test_unknown_window_state_is_decode_error() {
        let err = crate::codec::decode_value::<ClientWindowState>(&json!("docked"))
            .expect_err("unknown state");
        assert!(err.is_decode_error());
    }
}
