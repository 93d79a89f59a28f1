//! Type-safe identifiers for protocol entities.
//!
//! Every BiDi id travels as an opaque JSON string. Newtype wrappers keep a
//! browsing context id from being passed where a realm id is expected.
//!
//! | Type | Wire field |
//! |------|-----------|
//! | [`CommandId`] | envelope `id` |
//! | [`BrowsingContextId`] | `context` |
//! | [`UserContextId`] | `userContext` |
//! | [`ClientWindowId`] | `clientWindow` |
//! | [`NavigationId`] | `navigation` |
//! | [`RealmId`] | `realm` |
//! | [`Handle`] | `handle` |
//! | [`InternalId`] | `internalId` |
//! | [`SharedId`] | `sharedId` |
//! | [`PreloadScriptId`] | `script` |
//! | [`ChannelId`] | `channel` |
//! | [`InterceptId`] | `intercept` |
//! | [`RequestId`] | `request` |
//! | [`CollectorId`] | `collector` |
//! | [`ExtensionId`] | `extension` |
//! | [`SubscriptionId`] | `subscription` |
//! | [`SessionId`] | `sessionId` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// CommandId
// ============================================================================

/// Correlation id linking a command to its response.
///
/// Allocated from a monotonic counter per connection, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(u64);

impl CommandId {
    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// String Identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw id received from or addressed to the remote end.
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the id as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// A navigable: top-level tab/window or nested frame.
    BrowsingContextId
);
string_id!(
    /// An isolated cookie/storage partitioned browsing profile.
    UserContextId
);
string_id!(
    /// An OS-level browser window.
    ClientWindowId
);
string_id!(
    /// A single navigation in a browsing context.
    NavigationId
);
string_id!(
    /// A script realm (window, worker, worklet).
    RealmId
);
string_id!(
    /// A strong reference to a remote object, released with `script.disown`.
    Handle
);
string_id!(
    /// Per-serialization id used to detect cycles in remote values.
    InternalId
);
string_id!(
    /// Cross-realm reference to a DOM node.
    SharedId
);
string_id!(
    /// A registered preload script.
    PreloadScriptId
);
string_id!(
    /// A script-to-client message channel.
    ChannelId
);
string_id!(
    /// A network interception rule.
    InterceptId
);
string_id!(
    /// A network request.
    RequestId
);
string_id!(
    /// A network data collector.
    CollectorId
);
string_id!(
    /// An installed web extension.
    ExtensionId
);
string_id!(
    /// A `session.subscribe` registration.
    SubscriptionId
);
string_id!(
    /// A WebDriver session.
    SessionId
);

impl UserContextId {
    /// The user context every browser starts with.
    #[inline]
    #[must_use]
    pub fn default_context() -> Self {
        Self::new("default")
    }
}

// ============================================================================
// Tests
// ============================================================================
