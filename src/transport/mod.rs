//! Transport layer.
//!
//! This module moves text frames between the local end and the remote end
//! and correlates them into command results and event streams.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  execute()   ┌──────────────┐   text frames   ┌──────────────┐
//! │   Façades    │ ───────────► │    Broker    │ ◄─────────────► │  Transport   │
//! │  (modules)   │ ◄─────────── │  event loop  │                 │ (WebSocket / │
//! └──────────────┘   Result<R>  └──────────────┘                 │   memory)    │
//!                                                                └──────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `broker` | Correlation, pending operations, event routing |
//! | `memory` | In-process transport pair |
//! | `websocket` | WebSocket client transport |

// ============================================================================
// Submodules
// ============================================================================

/// Command broker and event loop.
pub mod broker;

/// In-process transport pair.
pub mod memory;

/// WebSocket client transport.
pub mod websocket;

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;

// ============================================================================
// Re-exports
// ============================================================================

pub use broker::{Broker, BrokerConfig, EventStream};
pub use memory::{MemoryPeer, MemoryTransport};
pub use websocket::WebSocketTransport;

// ============================================================================
// Transport
// ============================================================================

/// A bidirectional channel of JSON text frames.
///
/// The broker owns the transport inside its event loop and drops a pending
/// [`Transport::receive`] future whenever it needs to write, so `receive`
/// must be cancel-safe: dropping it must not lose a frame.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Writes one text frame.
    async fn send(&mut self, text: String) -> Result<()>;

    /// Waits for the next inbound text frame.
    ///
    /// Returns `None` once the remote end has closed the channel.
    async fn receive(&mut self) -> Option<Result<String>>;

    /// Closes the channel.
    async fn close(&mut self) -> Result<()>;
}
