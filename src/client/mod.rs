//! Client entry point.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`BiDi`] | Connection hub handing out module façades |
//! | [`BiDiBuilder`] | Validated connection settings |

/// Validated connection settings.
pub mod builder;

/// Connection hub.
pub mod core;

pub use builder::BiDiBuilder;
pub use core::BiDi;
