//! Command definitions organized by module.
//!
//! Commands follow `module.methodName` format. Each protocol domain declares
//! its own command enum with `bidi_commands!` next to its parameter types;
//! [`Command`] wraps them for unified serialization.
//!
//! # Command Modules
//!
//! | Module | Enum |
//! |--------|------|
//! | `browser` | [`BrowserCommand`] |
//! | `browsingContext` | [`BrowsingContextCommand`] |
//! | `emulation` | [`EmulationCommand`] |
//! | `input` | [`InputCommand`] |
//! | `network` | [`NetworkCommand`] |
//! | `script` | [`ScriptCommand`] |
//! | `session` | [`SessionCommand`] |
//! | `storage` | [`StorageCommand`] |
//! | `webExtension` | [`WebExtensionCommand`] |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::modules::browser::BrowserCommand;
use crate::modules::browsing_context::BrowsingContextCommand;
use crate::modules::emulation::EmulationCommand;
use crate::modules::input::InputCommand;
use crate::modules::network::NetworkCommand;
use crate::modules::script::ScriptCommand;
use crate::modules::session::SessionCommand;
use crate::modules::storage::StorageCommand;
use crate::modules::web_extension::WebExtensionCommand;

// ============================================================================
// Command Macro
// ============================================================================

/// Declares a module command enum.
///
/// Each variant carries its parameter struct and wire method name. The
/// generated enum serializes as `{"method": ..., "params": ...}` and
/// exposes the method through `method()`.
macro_rules! bidi_commands {
    (
        $(#[$enum_meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident($params:ty) = $method:literal,
            )+
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Debug, Clone, ::serde::Serialize)]
        #[serde(tag = "method", content = "params")]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                #[serde(rename = $method)]
                $variant($params),
            )+
        }

        impl $name {
            /// Returns the wire method name.
            #[must_use]
            pub const fn method(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => $method,)+
                }
            }
        }
    };
}

pub(crate) use bidi_commands;

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by module.
///
/// This enum wraps module-specific command enums for unified serialization.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Command {
    /// Browser module commands.
    Browser(BrowserCommand),
    /// BrowsingContext module commands.
    BrowsingContext(BrowsingContextCommand),
    /// Emulation module commands.
    Emulation(EmulationCommand),
    /// Input module commands.
    Input(InputCommand),
    /// Network module commands.
    Network(NetworkCommand),
    /// Script module commands.
    Script(ScriptCommand),
    /// Session module commands.
    Session(SessionCommand),
    /// Storage module commands.
    Storage(StorageCommand),
    /// WebExtension module commands.
    WebExtension(WebExtensionCommand),
}

impl Command {
    /// Returns the wire method name, e.g. `session.status`.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Browser(command) => command.method(),
            Self::BrowsingContext(command) => command.method(),
            Self::Emulation(command) => command.method(),
            Self::Input(command) => command.method(),
            Self::Network(command) => command.method(),
            Self::Script(command) => command.method(),
            Self::Session(command) => command.method(),
            Self::Storage(command) => command.method(),
            Self::WebExtension(command) => command.method(),
        }
    }
}

macro_rules! impl_from_module {
    ($($variant:ident($inner:ty)),+ $(,)?) => {
        $(
            impl From<$inner> for Command {
                #[inline]
                fn from(command: $inner) -> Self {
                    Self::$variant(command)
                }
            }
        )+
    };
}

impl_from_module!(
    Browser(BrowserCommand),
    BrowsingContext(BrowsingContextCommand),
    Emulation(EmulationCommand),
    Input(InputCommand),
    Network(NetworkCommand),
    Script(ScriptCommand),
    Session(SessionCommand),
    Storage(StorageCommand),
    WebExtension(WebExtensionCommand),
);

// ============================================================================
// Shared Parameter / Result Types
// ============================================================================

/// Parameters of commands that take none. Encodes as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmptyParams {}

/// Result of commands that return nothing but `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct EmptyResult {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::modules::session::{SessionCommand, SubscribeParameters};

    #[test]
    fn test_empty_params_encode_as_object() {
        let command = Command::from(SessionCommand::Status(EmptyParams {}));
        let json = serde_json::to_value(&command).expect("serialize");
        assert_eq!(json, json!({"method": "session.status", "params": {}}));
    }

    #[test]
    fn test_method_accessor() {
        let command = Command::from(SessionCommand::Subscribe(SubscribeParameters {
            events: vec!["log.entryAdded".to_owned()],
            contexts: None,
            user_contexts: None,
        }));
        assert_eq!(command.method(), "session.subscribe");
    }

    #[test]
    fn test_empty_result_ignores_extra_fields() {
        let result: EmptyResult = serde_json::from_value(json!({"extra": 1})).expect("decode");
        assert_eq!(result, EmptyResult {});
    }
}
