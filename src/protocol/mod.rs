//! BiDi message types.
//!
//! This module defines the envelopes exchanged between the local end (this
//! crate) and the remote end (browser or driver).
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Local → Remote | Command request |
//! | `Message::Success` | Remote → Local | Command result |
//! | `Message::Error` | Remote → Local | Command failure |
//! | `Message::Event` | Remote → Local | Subscribed notification |
//!
//! # Command Naming
//!
//! Commands follow `module.methodName` format:
//!
//! - `session.status`
//! - `browsingContext.navigate`
//! - `storage.getCookies`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command wrapper and shared parameter types |
//! | `event` | Untyped event message |
//! | `request` | Request envelope and inbound classification |

// ============================================================================
// Submodules
// ============================================================================

/// Command wrapper and shared parameter types.
pub mod command;

/// Event message types.
pub mod event;

/// Request envelope and inbound message classification.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub(crate) use command::bidi_commands;
pub use command::{Command, EmptyParams, EmptyResult};
pub use event::EventMessage;
pub use request::{Message, Request};
