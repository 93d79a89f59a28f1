//! Protocol domain façades.
//!
//! Each domain gets one façade type holding a [`Broker`](crate::transport::Broker)
//! handle. A façade method builds an immutable parameter object, hands it to
//! the broker and returns the decoded result. Façades are cheap to clone.
//!
//! # Modules
//!
//! | Module | Wire prefix | Façade |
//! |--------|-------------|--------|
//! | `browser` | `browser.` | [`BrowserModule`] |
//! | `browsing_context` | `browsingContext.` | [`BrowsingContextModule`] |
//! | `emulation` | `emulation.` | [`EmulationModule`] |
//! | `input` | `input.` | [`InputModule`] |
//! | `log` | `log.` | [`LogModule`] |
//! | `network` | `network.` | [`NetworkModule`] |
//! | `script` | `script.` | [`ScriptModule`] |
//! | `session` | `session.` | [`SessionModule`] |
//! | `storage` | `storage.` | [`StorageModule`] |
//! | `web_extension` | `webExtension.` | [`WebExtensionModule`] |
//!
//! # Timeouts
//!
//! Calls use the connection's command timeout unless the façade was derived
//! with `with_timeout`:
//!
//! ```ignore
//! let slow = bidi.browsing_context().with_timeout(Duration::from_secs(120));
//! slow.print(context, PrintOptions::default()).await?;
//! ```

// ============================================================================
// Facade Macro
// ============================================================================

/// Declares a façade struct.
///
/// `commands:` adds a private `execute` bound to the domain command enum.
macro_rules! facade {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
        $(commands: $command:ty;)?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            broker: $crate::transport::Broker,
            timeout: ::std::option::Option<::std::time::Duration>,
        }

        impl $name {
            pub(crate) fn new(broker: $crate::transport::Broker) -> Self {
                Self {
                    broker,
                    timeout: None,
                }
            }

            /// Returns a copy whose calls use `timeout` instead of the
            /// connection default.
            #[must_use]
            pub fn with_timeout(&self, timeout: ::std::time::Duration) -> Self {
                Self {
                    broker: self.broker.clone(),
                    timeout: Some(timeout),
                }
            }
        }

        $(
            impl $name {
                async fn execute<R: ::serde::de::DeserializeOwned>(
                    &self,
                    command: $command,
                ) -> $crate::error::Result<R> {
                    self.broker.execute(command, self.timeout).await
                }
            }
        )?
    };
}

/// Generates typed `on_*` subscription methods on a façade.
///
/// Each method sends `session.subscribe` for one event and returns a
/// [`Subscription`] decoding that event's params.
macro_rules! event_subscriptions {
    (
        impl $facade:ident {
            $(
                $(#[$meta:meta])*
                fn $method:ident($event:expr) -> $payload:ty;
            )+
        }
    ) => {
        impl $facade {
            $(
                $(#[$meta])*
                pub async fn $method(
                    &self,
                    options: $crate::modules::session::SubscriptionOptions,
                ) -> $crate::error::Result<$crate::modules::session::Subscription<$payload>> {
                    $crate::modules::session::subscribe(&self.broker, self.timeout, $event, options)
                        .await
                }
            )+
        }
    };
}

// ============================================================================
// Submodules
// ============================================================================

pub mod browser;
pub mod browsing_context;
pub mod emulation;
pub mod input;
pub mod log;
pub mod network;
pub mod script;
pub mod session;
pub mod storage;
pub mod web_extension;

// ============================================================================
// Re-exports
// ============================================================================

pub use browser::BrowserModule;
pub use browsing_context::{
    BrowsingContextInputModule, BrowsingContextLogModule, BrowsingContextModule,
    BrowsingContextNetworkModule,
};
pub use emulation::EmulationModule;
pub use input::InputModule;
pub use log::LogModule;
pub use network::NetworkModule;
pub use script::ScriptModule;
pub use session::{SessionModule, Subscription, SubscriptionOptions};
pub use storage::StorageModule;
pub use web_extension::WebExtensionModule;

// ============================================================================
// Test Support
// ============================================================================
