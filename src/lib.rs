//! WebDriver BiDi - Typed async client for the W3C WebDriver BiDi protocol.
//!
//! This library speaks BiDi over a WebSocket to any conforming remote end
//! (Firefox, Chromium via a BiDi mapper, a Selenium Grid node).
//!
//! # Architecture
//!
//! The client is split into three layers:
//!
//! - **Wire Codec**: special doubles, three-state nullable fields,
//!   discriminator-driven decoding and path-aware decode errors
//! - **Command Broker**: correlation ids, pending operations, per-call
//!   timeouts, cancellation and event routing
//! - **Module Façades**: one typed façade per protocol domain
//!
//! Key design principles:
//!
//! - One event loop task per connection owns the transport
//! - Responses are correlated by id only and may arrive in any order
//! - Dropping a call future cancels it; a late response is counted and logged
//! - No automatic retries
//!
//! # Quick Start
//!
//! ```no_run
//! use bidi_webdriver::{BiDi, Result};
//! use bidi_webdriver::modules::browsing_context::ReadinessState;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let bidi = BiDi::connect("ws://127.0.0.1:9222/session").await?;
//!
//!     let status = bidi.status().await?;
//!     println!("ready: {}", status.ready);
//!
//!     let contexts = bidi.browsing_context();
//!     let tree = contexts.get_tree(Default::default()).await?;
//!     let context = tree[0].context.clone();
//!     contexts
//!         .navigate(context, "https://example.com", Some(ReadinessState::Complete))
//!         .await?;
//!
//!     bidi.end().await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`BiDi`] hub and [`BiDiBuilder`] |
//! | [`codec`] | JSON wire codec |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`modules`] | Protocol domain façades |
//! | [`protocol`] | Command and message envelopes |
//! | [`transport`] | Broker and transports |

// ============================================================================
// Modules
// ============================================================================

/// Connection hub and configuration.
pub mod client;

/// JSON wire codec.
pub mod codec;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for protocol entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Protocol domain façades.
pub mod modules;

/// Command and message envelopes.
pub mod protocol;

/// Command broker and transports.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{BiDi, BiDiBuilder};

// Codec types
pub use codec::Nullable;

// Error types
pub use error::{Error, Result};

// Façades
pub use modules::{
    BrowserModule, BrowsingContextInputModule, BrowsingContextLogModule, BrowsingContextModule,
    BrowsingContextNetworkModule, EmulationModule, InputModule, LogModule, NetworkModule,
    ScriptModule, SessionModule, StorageModule, Subscription, SubscriptionOptions,
    WebExtensionModule,
};

// Transport types
pub use transport::{Broker, BrokerConfig, MemoryPeer, MemoryTransport, Transport};
