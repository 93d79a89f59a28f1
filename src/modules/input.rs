//! The `input` domain: synthetic keyboard, pointer and wheel input.
//!
//! Input is described as a list of input sources, each with a tick-ordered
//! list of actions. The remote end runs one tick at a time across all
//! sources, so a source with fewer actions should pad with pauses.
//!
//! ```ignore
//! let keys = KeySourceActions::new().type_text("hello").key_press(keys::ENTER);
//! let mouse = PointerSourceActions::mouse()
//!     .move_to(10, 20, Origin::Viewport)
//!     .click(0);
//! bidi.input().perform_actions(context, vec![keys.into(), mouse.into()]).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::identifiers::{BrowsingContextId, UserContextId};
use crate::protocol::{EmptyResult, bidi_commands};

use super::script::SharedReference;

// ============================================================================
// Commands
// ============================================================================

bidi_commands! {
    /// `input.*` commands.
    pub enum InputCommand {
        PerformActions(PerformActionsParameters) = "input.performActions",
        ReleaseActions(ReleaseActionsParameters) = "input.releaseActions",
        SetFiles(SetFilesParameters) = "input.setFiles",
    }
}

/// Event method names.
pub mod events {
    pub const FILE_DIALOG_OPENED: &str = "input.fileDialogOpened";
}

// ============================================================================
// Key Values
// ============================================================================

/// Normalized key values for non-printable keys.
pub mod keys {
    pub const BACKSPACE: &str = "\u{E003}";
    pub const TAB: &str = "\u{E004}";
    pub const ENTER: &str = "\u{E007}";
    pub const SHIFT: &str = "\u{E008}";
    pub const CONTROL: &str = "\u{E009}";
    pub const ALT: &str = "\u{E00A}";
    pub const ESCAPE: &str = "\u{E00C}";
    pub const SPACE: &str = "\u{E00D}";
    pub const ARROW_LEFT: &str = "\u{E012}";
    pub const ARROW_UP: &str = "\u{E013}";
    pub const ARROW_RIGHT: &str = "\u{E014}";
    pub const ARROW_DOWN: &str = "\u{E015}";
    pub const DELETE: &str = "\u{E017}";
    pub const META: &str = "\u{E03D}";
}

// ============================================================================
// Origins
// ============================================================================

/// Coordinate origin of pointer moves and wheel scrolls.
///
/// Keywords encode as bare strings, elements as an `element` object.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Origin {
    #[default]
    Viewport,
    /// The pointer's current position.
    Pointer,
    Element(ElementOrigin),
}

impl Serialize for Origin {
    fn serialize<S: Serializer>(&self, serializer: S) -> StdResult<S::Ok, S::Error> {
        match self {
            Self::Viewport => serializer.serialize_str("viewport"),
            Self::Pointer => serializer.serialize_str("pointer"),
            Self::Element(origin) => origin.serialize(serializer),
        }
    }
}

/// Offsets are relative to the center of `element`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "element")]
pub struct ElementOrigin {
    pub element: SharedReference,
}

impl Origin {
    /// Offsets relative to the center of `element`.
    #[must_use]
    pub fn element(element: SharedReference) -> Self {
        Self::Element(ElementOrigin { element })
    }
}

// ============================================================================
// Actions
// ============================================================================

/// An input source and its actions, one per tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SourceActions {
    None(NoneSourceActions),
    Key(KeySourceActions),
    Pointer(PointerSourceActions),
    Wheel(WheelSourceActions),
}

/// Timing-only source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoneSourceActions {
    pub id: String,
    pub actions: Vec<PauseAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "pause")]
pub struct PauseAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeySourceActions {
    pub id: String,
    pub actions: Vec<KeyAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum KeyAction {
    Pause {
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
    },
    KeyDown {
        value: String,
    },
    KeyUp {
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointerSourceActions {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<PointerParameters>,
    pub actions: Vec<PointerAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerParameters {
    pub pointer_type: PointerType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PointerType {
    #[default]
    Mouse,
    Pen,
    Touch,
}

/// Contact geometry shared by pointer down and move actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerCommonProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tangential_pressure: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twist: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude_angle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azimuth_angle: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PointerAction {
    Pause {
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
    },
    PointerDown {
        button: u32,
        #[serde(flatten)]
        properties: PointerCommonProperties,
    },
    PointerUp {
        button: u32,
    },
    PointerMove {
        x: f64,
        y: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        origin: Option<Origin>,
        #[serde(flatten)]
        properties: PointerCommonProperties,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WheelSourceActions {
    pub id: String,
    pub actions: Vec<WheelAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WheelAction {
    Pause {
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Scroll {
        x: i64,
        y: i64,
        delta_x: i64,
        delta_y: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        origin: Option<Origin>,
    },
}

fn source_id() -> String {
    Uuid::new_v4().to_string()
}

// ============================================================================
// Builders
// ============================================================================

impl NoneSourceActions {
    /// An empty tick-only source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: source_id(),
            actions: Vec::new(),
        }
    }

    /// Idles for `duration_ms`.
    #[must_use]
    pub fn pause(mut self, duration_ms: u64) -> Self {
        self.actions.push(PauseAction {
            duration: Some(duration_ms),
        });
        self
    }
}

impl Default for NoneSourceActions {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySourceActions {
    /// An empty keyboard source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: source_id(),
            actions: Vec::new(),
        }
    }

    /// Presses a key. `value` is one grapheme or a [`keys`] constant.
    #[must_use]
    pub fn key_down(mut self, value: impl Into<String>) -> Self {
        self.actions.push(KeyAction::KeyDown {
            value: value.into(),
        });
        self
    }

    /// Releases a key.
    #[must_use]
    pub fn key_up(mut self, value: impl Into<String>) -> Self {
        self.actions.push(KeyAction::KeyUp {
            value: value.into(),
        });
        self
    }

    /// Down then up.
    #[must_use]
    pub fn key_press(self, value: &str) -> Self {
        self.key_down(value).key_up(value)
    }

    /// One press per character, two ticks each.
    #[must_use]
    pub fn type_text(self, text: &str) -> Self {
        text.chars()
            .fold(self, |actions, c| actions.key_press(c.encode_utf8(&mut [0; 4])))
    }

    /// Idles for `duration_ms`.
    #[must_use]
    pub fn pause(mut self, duration_ms: u64) -> Self {
        self.actions.push(KeyAction::Pause {
            duration: Some(duration_ms),
        });
        self
    }
}

impl Default for KeySourceActions {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerSourceActions {
    /// An empty pointer source of `pointer_type`.
    #[must_use]
    pub fn new(pointer_type: PointerType) -> Self {
        Self {
            id: source_id(),
            parameters: Some(PointerParameters { pointer_type }),
            actions: Vec::new(),
        }
    }

    /// A mouse pointer source.
    #[inline]
    #[must_use]
    pub fn mouse() -> Self {
        Self::new(PointerType::Mouse)
    }

    /// Presses `button` (0 is the primary button).
    #[must_use]
    pub fn down(mut self, button: u32) -> Self {
        self.actions.push(PointerAction::PointerDown {
            button,
            properties: PointerCommonProperties::default(),
        });
        self
    }

    /// Releases `button`.
    #[must_use]
    pub fn up(mut self, button: u32) -> Self {
        self.actions.push(PointerAction::PointerUp { button });
        self
    }

    /// Down then up.
    #[must_use]
    pub fn click(self, button: u32) -> Self {
        self.down(button).up(button)
    }

    /// Moves the pointer to `(x, y)` relative to `origin`.
    #[must_use]
    pub fn move_to(mut self, x: impl Into<f64>, y: impl Into<f64>, origin: Origin) -> Self {
        self.actions.push(PointerAction::PointerMove {
            x: x.into(),
            y: y.into(),
            duration: None,
            origin: Some(origin),
            properties: PointerCommonProperties::default(),
        });
        self
    }

    /// Idles for `duration_ms`.
    #[must_use]
    pub fn pause(mut self, duration_ms: u64) -> Self {
        self.actions.push(PointerAction::Pause {
            duration: Some(duration_ms),
        });
        self
    }
}

impl WheelSourceActions {
    /// An empty wheel source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: source_id(),
            actions: Vec::new(),
        }
    }

    /// Scrolls by `(delta_x, delta_y)` at `(x, y)` relative to `origin`.
    #[must_use]
    pub fn scroll(mut self, x: i64, y: i64, delta_x: i64, delta_y: i64, origin: Origin) -> Self {
        self.actions.push(WheelAction::Scroll {
            x,
            y,
            delta_x,
            delta_y,
            duration: None,
            origin: Some(origin),
        });
        self
    }

    /// Idles for `duration_ms`.
    #[must_use]
    pub fn pause(mut self, duration_ms: u64) -> Self {
        self.actions.push(WheelAction::Pause {
            duration: Some(duration_ms),
        });
        self
    }
}

impl Default for WheelSourceActions {
    fn default() -> Self {
        Self::new()
    }
}

impl From<NoneSourceActions> for SourceActions {
    fn from(actions: NoneSourceActions) -> Self {
        Self::None(actions)
    }
}

impl From<KeySourceActions> for SourceActions {
    fn from(actions: KeySourceActions) -> Self {
        Self::Key(actions)
    }
}

impl From<PointerSourceActions> for SourceActions {
    fn from(actions: PointerSourceActions) -> Self {
        Self::Pointer(actions)
    }
}

impl From<WheelSourceActions> for SourceActions {
    fn from(actions: WheelSourceActions) -> Self {
        Self::Wheel(actions)
    }
}

// ============================================================================
// Parameter Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PerformActionsParameters {
    pub context: BrowsingContextId,
    pub actions: Vec<SourceActions>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseActionsParameters {
    pub context: BrowsingContextId,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetFilesParameters {
    pub context: BrowsingContextId,
    pub element: SharedReference,
    pub files: Vec<String>,
}

// ============================================================================
// Event Types
// ============================================================================

/// Payload of `input.fileDialogOpened`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDialogInfo {
    pub context: BrowsingContextId,
    #[serde(default)]
    pub user_context: Option<UserContextId>,
    #[serde(default)]
    pub element: Option<SharedReference>,
    pub multiple: bool,
}

// ============================================================================
// InputModule
// ============================================================================

facade! {
    /// `input.*` façade.
    pub struct InputModule;
    commands: InputCommand;
}

impl InputModule {
    /// Runs `actions` tick by tick in `context`.
    pub async fn perform_actions(
        &self,
        context: BrowsingContextId,
        actions: Vec<SourceActions>,
    ) -> Result<()> {
        debug!(context = %context, sources = actions.len(), "Performing actions");
        let _: EmptyResult = self
            .execute(InputCommand::PerformActions(PerformActionsParameters {
                context,
                actions,
            }))
            .await?;
        Ok(())
    }

    /// Releases every pressed key and button in `context`.
    pub async fn release_actions(&self, context: BrowsingContextId) -> Result<()> {
        debug!(context = %context, "Releasing actions");
        let _: EmptyResult = self
            .execute(InputCommand::ReleaseActions(ReleaseActionsParameters {
                context,
            }))
            .await?;
        Ok(())
    }

    /// Sets the files of an `<input type="file">` element.
    pub async fn set_files(
        &self,
        context: BrowsingContextId,
        element: SharedReference,
        files: Vec<String>,
    ) -> Result<()> {
        debug!(context = %context, count = files.len(), "Setting files");
        let _: EmptyResult = self
            .execute(InputCommand::SetFiles(SetFilesParameters {
                context,
                element,
                files,
            }))
            .await?;
        Ok(())
    }
}

event_subscriptions! {
    impl InputModule {
        fn on_file_dialog_opened(events::FILE_DIALOG_OPENED) -> FileDialogInfo;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::StreamExt;
    use serde_json::json;

    use crate::identifiers::{SharedId, SubscriptionId};
    use crate::modules::SubscriptionOptions;
    use crate::modules::testing::{connect, respond};

    #[test]
    fn test_type_text_presses_each_char() {
        let keys = KeySourceActions::new().type_text("ab");
        let encoded = serde_json::to_value(SourceActions::from(keys)).expect("encode");

        assert_eq!(encoded["type"], "key");
        assert_eq!(
            encoded["actions"],
            json!([
                {"type": "keyDown", "value": "a"},
                {"type": "keyUp", "value": "a"},
                {"type": "keyDown", "value": "b"},
                {"type": "keyUp", "value": "b"},
            ])
        );
    }

    #[test]
    fn test_pointer_actions_shape() {
        let element = SharedReference::new(SharedId::new("n1"));
        let pointer = PointerSourceActions::mouse()
            .move_to(5, 6, Origin::element(element))
            .click(0);
        let encoded = serde_json::to_value(SourceActions::from(pointer)).expect("encode");

        assert_eq!(encoded["parameters"], json!({"pointerType": "mouse"}));
        assert_eq!(
            encoded["actions"],
            json!([
                {"type": "pointerMove", "x": 5.0, "y": 6.0,
                 "origin": {"type": "element", "element": {"sharedId": "n1"}}},
                {"type": "pointerDown", "button": 0},
                {"type": "pointerUp", "button": 0},
            ])
        );
    }

    #[test]
    fn test_wheel_and_keyword_origins() {
        let wheel = WheelSourceActions::new().scroll(0, 0, 0, 120, Origin::Viewport);
        let encoded = serde_json::to_value(&wheel.actions[0]).expect("encode");
        assert_eq!(
            encoded,
            json!({"type": "scroll", "x": 0, "y": 0, "deltaX": 0, "deltaY": 120, "origin": "viewport"})
        );
        assert_eq!(
            serde_json::to_value(Origin::Pointer).expect("encode"),
            json!("pointer")
        );
    }

    #[test]
    fn test_source_ids_are_unique() {
        assert_ne!(KeySourceActions::new().id, KeySourceActions::new().id);
    }

    #[tokio::test]
    async fn test_perform_and_release() {
        let (bidi, mut peer) = connect();
        let input = bidi.input();
        let context = BrowsingContextId::new("ctx");

        let pause = NoneSourceActions::new().pause(10);
        let (result, request) = tokio::join!(
            input.perform_actions(context.clone(), vec![pause.into()]),
            respond(&mut peer, json!({}))
        );
        result.expect("perform");
        assert_eq!(request["method"], "input.performActions");
        assert_eq!(
            request["params"]["actions"][0]["actions"],
            json!([{"type": "pause", "duration": 10}])
        );

        let (result, request) = tokio::join!(
            input.release_actions(context),
            respond(&mut peer, json!({}))
        );
        result.expect("release");
        assert_eq!(request["params"], json!({"context": "ctx"}));
    }

    #[tokio::test]
    async fn test_file_dialog_event() {
        let (bidi, mut peer) = connect();
        let input = bidi.input();

        let (subscription, _) = tokio::join!(
            input.on_file_dialog_opened(SubscriptionOptions::default()),
            respond(&mut peer, json!({"subscription": "sub-1"}))
        );
        let mut subscription = subscription.expect("subscribe");
        assert_eq!(subscription.id(), Some(&SubscriptionId::new("sub-1")));

        peer.emit(
            events::FILE_DIALOG_OPENED,
            json!({"context": "ctx", "multiple": true}),
        )
        .expect("emit");

        let info = subscription.next().await.expect("event").expect("decode");
        assert!(info.multiple);
        assert!(info.element.is_none());
    }
}
