//! The `log` domain. It has no commands, only `log.entryAdded`.

// ============================================================================
// Imports
// ============================================================================

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::identifiers::BrowsingContextId;

use super::script::{RemoteValue, Source, StackTrace};
use super::session::{self, Subscription, SubscriptionOptions};

/// Event method names.
pub mod events {
    pub const ENTRY_ADDED: &str = "log.entryAdded";
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// Fields common to every entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseLogEntry {
    pub level: Level,
    pub source: Source,
    /// `null` when the entry has no text.
    #[serde(default)]
    pub text: Option<String>,
    /// Milliseconds since the epoch.
    pub timestamp: u64,
    #[serde(default)]
    pub stack_trace: Option<StackTrace>,
}

#[derive(Debug, Clone, Deserialize)]
struct ConsoleFields {
    #[serde(flatten)]
    base: BaseLogEntry,
    method: String,
    args: Vec<RemoteValue>,
}

/// A log entry, discriminated by `type`.
///
/// Entry types this client does not know decode as [`LogEntry::Generic`].
#[derive(Debug, Clone)]
pub enum LogEntry {
    /// `console.*` call.
    Console {
        base: BaseLogEntry,
        /// `log`, `warn`, `table`, etc.
        method: String,
        args: Vec<RemoteValue>,
    },
    /// Uncaught error.
    Javascript { base: BaseLogEntry },
    Generic { kind: String, base: BaseLogEntry },
}

impl LogEntry {
    /// Fields shared by every entry kind.
    #[inline]
    #[must_use]
    pub fn base(&self) -> &BaseLogEntry {
        match self {
            Self::Console { base, .. } | Self::Javascript { base } | Self::Generic { base, .. } => {
                base
            }
        }
    }

    /// Severity of the entry.
    #[inline]
    #[must_use]
    pub fn level(&self) -> Level {
        self.base().level
    }

    /// Message text; `None` when the remote end sent `null`.
    #[inline]
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.base().text.as_deref()
    }

    fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        let kind = match value.get("type").and_then(Value::as_str) {
            Some(kind) => kind.to_owned(),
            None => return Err(de::Error::missing_field("type")),
        };

        Ok(match kind.as_str() {
            "console" => {
                let fields: ConsoleFields = serde_json::from_value(value)?;
                Self::Console {
                    base: fields.base,
                    method: fields.method,
                    args: fields.args,
                }
            }
            "javascript" => Self::Javascript {
                base: serde_json::from_value(value)?,
            },
            _ => Self::Generic {
                kind,
                base: serde_json::from_value(value)?,
            },
        })
    }
}

impl<'de> Deserialize<'de> for LogEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(value).map_err(de::Error::custom)
    }
}

// ============================================================================
// LogModule
// ============================================================================

facade! {
    /// `log.*` façade.
    pub struct LogModule;
}

event_subscriptions! {
    impl LogModule {
        /// Every console call and uncaught error, in order.
        fn on_entry_added(events::ENTRY_ADDED) -> LogEntry;
    }
}

impl LogModule {
    /// Entries whose `source.context` is `context`.
    ///
    /// The remote subscription stays session-wide, since remote ends differ
    /// on which entries a context-scoped `log.entryAdded` subscription
    /// covers. Entries are filtered locally instead.
    pub async fn on_entry_added_in(
        &self,
        context: BrowsingContextId,
    ) -> crate::Result<Subscription<LogEntry>> {
        session::subscribe_scoped(
            &self.broker,
            self.timeout,
            events::ENTRY_ADDED,
            SubscriptionOptions::default(),
            Some(vec![context]),
        )
        .await
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

    use crate::modules::testing::{connect, respond};

    fn source() -> Value {
        json!({"realm": "r1", "context": "ctx"})
    }

    #[test]
    fn test_console_entry() {
        let entry: LogEntry = serde_json::from_value(json!({
            "type": "console",
            "level": "warn",
            "source": source(),
            "text": "careful",
            "timestamp": 1_700_000_000_000_u64,
            "method": "warn",
            "args": [{"type": "string", "value": "careful"}],
        }))
        .expect("decode");

        assert_eq!(entry.level(), Level::Warn);
        assert_eq!(entry.text(), Some("careful"));
        match entry {
            LogEntry::Console { method, args, .. } => {
                assert_eq!(method, "warn");
                assert_eq!(args[0].as_str(), Some("careful"));
            }
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn test_javascript_entry_with_null_text() {
        let entry: LogEntry = serde_json::from_value(json!({
            "type": "javascript",
            "level": "error",
            "source": source(),
            "text": null,
            "timestamp": 1,
            "stackTrace": {"callFrames": []},
        }))
        .expect("decode");

        assert!(matches!(entry, LogEntry::Javascript { .. }));
        assert_eq!(entry.text(), None);
        assert!(entry.base().stack_trace.is_some());
    }

    #[test]
    fn test_unknown_type_is_generic() {
        let entry: LogEntry = serde_json::from_value(json!({
            "type": "worker",
            "level": "info",
            "source": source(),
            "text": "x",
            "timestamp": 2,
        }))
        .expect("decode");

        match entry {
            LogEntry::Generic { kind, .. } => assert_eq!(kind, "worker"),
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn test_missing_type_fails() {
        let result: Result<LogEntry, _> =
            serde_json::from_value(json!({"level": "info", "source": source(), "timestamp": 0}));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_entry_added_subscription() {
        let (bidi, mut peer) = connect();
        let log = bidi.log();

        let (subscription, request) = tokio::join!(
            log.on_entry_added(SubscriptionOptions::default()),
            respond(&mut peer, json!({"subscription": "s"}))
        );
        let mut subscription = subscription.expect("subscribe");
        assert_eq!(request["params"]["events"], json!(["log.entryAdded"]));

        peer.emit(
            events::ENTRY_ADDED,
            json!({"type": "console", "level": "info", "source": source(), "text": "hi",
                   "timestamp": 3, "method": "log", "args": []}),
        )
        .expect("emit");

        let entry = subscription.next().await.expect("entry").expect("decode");
        assert_eq!(entry.text(), Some("hi"));
    }

    #[tokio::test]
    async fn test_entries_for_one_context() {
        let (bidi, mut peer) = connect();
        let log = bidi.log();

        let (subscription, request) = tokio::join!(
            log.on_entry_added_in(BrowsingContextId::new("ctx")),
            respond(&mut peer, json!({"subscription": "s"}))
        );
        let mut subscription = subscription.expect("subscribe");
        // Session-wide on the remote end
        assert_eq!(request["params"], json!({"events": ["log.entryAdded"]}));

        for (context, text) in [("other", "skip"), ("ctx", "keep")] {
            peer.emit(
                events::ENTRY_ADDED,
                json!({"type": "console", "level": "info",
                       "source": {"realm": "r1", "context": context}, "text": text,
                       "timestamp": 3, "method": "log", "args": []}),
            )
            .expect("emit");
        }

        let entry = subscription.next().await.expect("entry").expect("decode");
        assert_eq!(entry.text(), Some("keep"));
        assert_eq!(entry.base().source.context, Some(BrowsingContextId::new("ctx")));
    }
}
