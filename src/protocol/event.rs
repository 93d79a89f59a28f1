//! Event message types.
//!
//! Events are notifications sent from the remote end to the local end after
//! a `session.subscribe`. They carry no correlation id.
//!
//! # Format
//!
//! ```json
//! {
//!   "type": "event",
//!   "method": "module.eventName",
//!   "params": { ... }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// EventMessage
// ============================================================================

/// An untyped event notification from remote end to local end.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventMessage {
    /// Event name in `module.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl EventMessage {
    /// Returns the module name from the method.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let event = EventMessage { method: "browsingContext.load".into(), .. };
    /// assert_eq!(event.module(), "browsingContext");
    /// ```
    #[inline]
    #[must_use]
    pub fn module(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let event = EventMessage { method: "browsingContext.load".into(), .. };
    /// assert_eq!(event.event_name(), "load");
    /// ```
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_event_parsing() {
        let event: EventMessage = serde_json::from_value(json!({
            "type": "event",
            "method": "browsingContext.load",
            "params": {"context": "abc", "url": "https://example.com"}
        }))
        .expect("parse");

        assert_eq!(event.module(), "browsingContext");
        assert_eq!(event.event_name(), "load");
        assert_eq!(event.params["url"], "https://example.com");
    }

    #[test]
    fn test_method_without_dot() {
        let event = EventMessage {
            method: "weird".to_owned(),
            params: Value::Null,
        };
        assert_eq!(event.module(), "weird");
        assert_eq!(event.event_name(), "");
    }
}
