//! Command broker and event loop.
//!
//! The broker owns one [`Transport`] and correlates commands with their
//! responses by id, routing unsolicited events to listeners by method name.
//!
//! # Event Loop
//!
//! The broker spawns a tokio task that handles:
//!
//! - Incoming frames from the remote end (responses, errors, events)
//! - Outgoing command frames from façades
//! - Failing every pending command when the transport goes away
//!
//! # Pending Operations
//!
//! Callers register their completion slot in the shared pending map before
//! the frame is handed to the loop. A drop guard removes the slot when the
//! caller times out or stops awaiting, so a late response finds nothing,
//! is logged, counted in [`Broker::unmatched_responses`] and dropped.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, error, trace, warn};

use crate::codec;
use crate::error::{Error, Result};
use crate::identifiers::{BrowsingContextId, CommandId};
use crate::protocol::{Command, EventMessage, Message, Request};

use super::Transport;

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for command execution.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum of commands awaiting a response.
pub const DEFAULT_MAX_PENDING: usize = 256;

// ============================================================================
// Types
// ============================================================================

/// Map of command ids to completion slots.
type PendingMap = FxHashMap<CommandId, PendingOperation>;

/// Map of event method names to listeners.
type ListenerMap = FxHashMap<String, Vec<Listener>>;

/// An in-flight command.
struct PendingOperation {
    /// Wire method, for logging.
    method: &'static str,
    /// Completion slot; consumed by exactly one terminal transition.
    response_tx: oneshot::Sender<Result<Value>>,
}

/// A registered event listener.
struct Listener {
    id: u64,
    /// Contexts the listener is scoped to; `None` accepts every event.
    contexts: Option<FxHashSet<String>>,
    tx: mpsc::UnboundedSender<Value>,
}

impl Listener {
    /// Returns `false` for events from a context outside the listener's scope.
    fn accepts(&self, context: Option<&str>) -> bool {
        match (&self.contexts, context) {
            (Some(scope), Some(context)) => scope.contains(context),
            _ => true,
        }
    }
}

/// State shared between callers and the event loop.
struct Shared {
    pending: Mutex<PendingMap>,
    listeners: Mutex<ListenerMap>,
    next_id: AtomicU64,
    next_listener: AtomicU64,
    unmatched: AtomicU64,
    closed: AtomicBool,
}

impl Shared {
    fn new() -> Self {
        Self {
            pending: Mutex::new(PendingMap::default()),
            listeners: Mutex::new(ListenerMap::default()),
            next_id: AtomicU64::new(1),
            next_listener: AtomicU64::new(1),
            unmatched: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    fn remove_listener(&self, method: &str, listener: u64) {
        let mut listeners = self.listeners.lock();
        if let Some(entries) = listeners.get_mut(method) {
            entries.retain(|entry| entry.id != listener);
            if entries.is_empty() {
                listeners.remove(method);
            }
        }
    }
}

// ============================================================================
// BrokerConfig
// ============================================================================

/// Validated broker settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Deadline applied when a call does not override it.
    pub command_timeout: Duration,
    /// Maximum number of commands awaiting a response.
    pub max_pending: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

// ============================================================================
// BrokerCommand
// ============================================================================

/// Internal commands for the event loop.
enum BrokerCommand {
    /// Write an encoded command frame.
    Send { id: CommandId, text: String },
    /// Close the transport and stop.
    Shutdown,
}

// ============================================================================
// PendingGuard
// ============================================================================

/// Removes a pending entry when the awaiting call ends for any reason.
struct PendingGuard<'a> {
    shared: &'a Shared,
    id: CommandId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.shared.pending.lock().remove(&self.id).is_some() {
            trace!(id = %self.id, "Removed abandoned pending command");
        }
    }
}

// ============================================================================
// Broker
// ============================================================================

/// Correlates commands and responses over one transport.
///
/// # Thread Safety
///
/// `Broker` is cheap to clone, `Send + Sync`, and any number of clones may
/// have commands in flight at once. Responses may complete in any order.
#[derive(Clone)]
pub struct Broker {
    /// Channel for sending frames to the event loop.
    command_tx: mpsc::UnboundedSender<BrokerCommand>,
    /// Pending and listener maps (shared with event loop).
    shared: Arc<Shared>,
    /// Settings.
    config: BrokerConfig,
}

impl fmt::Debug for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("config", &self.config)
            .field("pending", &self.pending_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Broker {
    /// Spawns the event loop on `transport`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<T: Transport>(transport: T, config: BrokerConfig) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::new());

        tokio::spawn(Self::run_event_loop(
            transport,
            command_rx,
            Arc::clone(&shared),
        ));

        debug!(
            timeout_ms = config.command_timeout.as_millis() as u64,
            max_pending = config.max_pending,
            "Broker started"
        );

        Self {
            command_tx,
            shared,
            config,
        }
    }

    /// Returns the broker settings.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Sends a command and decodes its result into `R`.
    ///
    /// `command_timeout` overrides the configured deadline for this call.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the remote end answers with an error envelope
    /// - [`Error::Decode`] if the result does not match `R`
    /// - [`Error::CommandTimeout`] if no response arrives in time
    /// - [`Error::ConnectionClosed`] if the transport closes first
    /// - [`Error::TooManyPending`] if the pending table is full
    pub async fn execute<R: DeserializeOwned>(
        &self,
        command: impl Into<Command>,
        command_timeout: Option<Duration>,
    ) -> Result<R> {
        let value = self.execute_raw(command.into(), command_timeout).await?;
        codec::decode_value(&value)
    }

    /// Sends a command and returns its raw `result` object.
    ///
    /// # Errors
    ///
    /// Same as [`Broker::execute`], minus decoding.
    pub async fn execute_raw(
        &self,
        command: Command,
        command_timeout: Option<Duration>,
    ) -> Result<Value> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        let id = CommandId::new(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let method = command.method();
        let text = codec::encode(&Request::new(id, &command))?;
        let command_timeout = command_timeout.unwrap_or(self.config.command_timeout);

        let (response_tx, response_rx) = oneshot::channel();

        // Register before the frame can reach the wire
        {
            let mut pending = self.shared.pending.lock();
            if pending.len() >= self.config.max_pending {
                warn!(
                    pending = pending.len(),
                    max = self.config.max_pending,
                    "Too many pending commands"
                );
                return Err(Error::TooManyPending {
                    limit: self.config.max_pending,
                });
            }
            pending.insert(
                id,
                PendingOperation {
                    method,
                    response_tx,
                },
            );
        }

        let _guard = PendingGuard {
            shared: &self.shared,
            id,
        };

        trace!(%id, method, "Sending command");

        self.command_tx
            .send(BrokerCommand::Send { id, text })
            .map_err(|_| Error::ConnectionClosed)?;

        match timeout(command_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                let timeout_ms = command_timeout.as_millis() as u64;
                debug!(%id, method, timeout_ms, "Command timed out");
                Err(Error::command_timeout(id, method, timeout_ms))
            }
        }
    }

    /// Registers a listener for events named `method`.
    ///
    /// Events are delivered in arrival order. This only routes events that
    /// reach the connection; use `session.subscribe` to ask the remote end
    /// to send them.
    pub fn listen<E: DeserializeOwned>(&self, method: impl Into<String>) -> EventStream<E> {
        self.register(method.into(), None)
    }

    /// Registers a listener that only receives events from `contexts`.
    ///
    /// An event's context is its `context` field, or `source.context` for
    /// log entries and script messages. Events that carry no context are
    /// delivered regardless of scope.
    pub fn listen_in<E: DeserializeOwned>(
        &self,
        method: impl Into<String>,
        contexts: impl IntoIterator<Item = BrowsingContextId>,
    ) -> EventStream<E> {
        let scope = contexts
            .into_iter()
            .map(|context| context.as_str().to_owned())
            .collect();
        self.register(method.into(), Some(scope))
    }

    fn register<E: DeserializeOwned>(
        &self,
        method: String,
        contexts: Option<FxHashSet<String>>,
    ) -> EventStream<E> {
        let listener = self.shared.next_listener.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let scoped = contexts.as_ref().map(FxHashSet::len);

        {
            let mut listeners = self.shared.listeners.lock();
            // A closed broker drops `tx` here, so the stream ends at once
            if !self.shared.closed.load(Ordering::Acquire) {
                listeners
                    .entry(method.clone())
                    .or_default()
                    .push(Listener {
                        id: listener,
                        contexts,
                        tx,
                    });
            }
        }

        debug!(method = %method, listener, ?scoped, "Event listener registered");

        EventStream {
            rx,
            method,
            listener,
            shared: Arc::clone(&self.shared),
            _marker: PhantomData,
        }
    }

    /// Returns the number of commands awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// Returns the number of listeners registered for `method`.
    #[inline]
    #[must_use]
    pub fn listener_count(&self, method: &str) -> usize {
        self.shared.listeners.lock().get(method).map_or(0, Vec::len)
    }

    /// Returns how many responses arrived with no matching pending command.
    ///
    /// These are late responses to timed out or cancelled calls.
    #[inline]
    #[must_use]
    pub fn unmatched_responses(&self) -> u64 {
        self.shared.unmatched.load(Ordering::Relaxed)
    }

    /// Returns `true` once the event loop has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Closes the transport and stops the event loop.
    ///
    /// Pending commands fail with [`Error::ConnectionClosed`]. New commands
    /// are rejected as soon as this returns.
    pub fn shutdown(&self) {
        self.shared.closed.store(true, Ordering::Release);
        let _ = self.command_tx.send(BrokerCommand::Shutdown);
    }

    /// Event loop that owns the transport.
    async fn run_event_loop<T: Transport>(
        mut transport: T,
        mut command_rx: mpsc::UnboundedReceiver<BrokerCommand>,
        shared: Arc<Shared>,
    ) {
        loop {
            tokio::select! {
                // Incoming frames from the remote end
                frame = transport.receive() => {
                    match frame {
                        Some(Ok(text)) => Self::handle_incoming_message(&text, &shared),

                        Some(Err(e)) => {
                            error!(error = %e, "Transport error");
                            break;
                        }

                        None => {
                            debug!("Transport closed by remote");
                            break;
                        }
                    }
                }

                // Frames from callers
                command = command_rx.recv() => {
                    match command {
                        Some(BrokerCommand::Send { id, text }) => {
                            Self::handle_send_command(id, text, &mut transport, &shared).await;
                        }

                        Some(BrokerCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            if let Err(e) = transport.close().await {
                                warn!(error = %e, "Failed to close transport");
                            }
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        // Reject new work before draining what is left
        shared.closed.store(true, Ordering::Release);
        command_rx.close();

        Self::fail_pending_requests(&shared);
        shared.listeners.lock().clear();

        debug!("Event loop terminated");
    }

    /// Handles an incoming text frame.
    fn handle_incoming_message(text: &str, shared: &Shared) {
        let message = match Message::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Failed to parse incoming message");
                return;
            }
        };

        match message {
            Message::Success { id, result } => Self::complete(shared, id, Ok(result)),

            Message::Error {
                id: Some(id),
                code,
                message,
                stacktrace,
            } => Self::complete(shared, id, Err(Error::protocol(code, message, stacktrace))),

            Message::Error {
                id: None,
                code,
                message,
                ..
            } => {
                error!(code = %code, message = %message, "Error response without command id");
            }

            Message::Event(event) => Self::dispatch_event(shared, event),
        }
    }

    /// Resolves the pending command `id`, or logs and drops the response.
    fn complete(shared: &Shared, id: CommandId, result: Result<Value>) {
        let operation = shared.pending.lock().remove(&id);

        let Some(operation) = operation else {
            shared.unmatched.fetch_add(1, Ordering::Relaxed);
            warn!(%id, "Response for unknown or abandoned command dropped");
            return;
        };

        if operation.response_tx.send(result).is_err() {
            // Caller stopped awaiting between lookup and send
            shared.unmatched.fetch_add(1, Ordering::Relaxed);
            warn!(%id, method = operation.method, "Response for abandoned command dropped");
        } else {
            trace!(%id, method = operation.method, "Response matched");
        }
    }

    /// Routes an event to every listener for its method whose scope
    /// admits the event's context.
    fn dispatch_event(shared: &Shared, event: EventMessage) {
        let mut listeners = shared.listeners.lock();

        let Some(entries) = listeners.get_mut(&event.method) else {
            trace!(method = %event.method, "Event without listener dropped");
            return;
        };

        let context = event_context(&event.params);
        let mut delivered = 0usize;
        entries.retain(|entry| {
            if !entry.accepts(context) {
                return true;
            }
            delivered += 1;
            entry.tx.send(event.params.clone()).is_ok()
        });
        trace!(method = %event.method, context, delivered, "Event dispatched");

        if entries.is_empty() {
            listeners.remove(&event.method);
        }
    }

    /// Writes a command frame to the transport.
    async fn handle_send_command<T: Transport>(
        id: CommandId,
        text: String,
        transport: &mut T,
        shared: &Shared,
    ) {
        if let Err(e) = transport.send(text).await {
            warn!(%id, error = %e, "Failed to write command");
            if let Some(operation) = shared.pending.lock().remove(&id) {
                let _ = operation
                    .response_tx
                    .send(Err(Error::connection(e.to_string())));
            }
            return;
        }

        trace!(%id, "Command written");
    }

    /// Fails all pending requests with ConnectionClosed error.
    fn fail_pending_requests(shared: &Shared) {
        let pending: Vec<_> = shared.pending.lock().drain().collect();
        let count = pending.len();

        for (_, operation) in pending {
            let _ = operation.response_tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending commands on shutdown");
        }
    }
}

/// Returns the browsing context an event originates from, if it names one.
fn event_context(params: &Value) -> Option<&str> {
    params
        .get("context")
        .or_else(|| params.get("source").and_then(|source| source.get("context")))
        .and_then(Value::as_str)
}

// ============================================================================
// EventStream
// ============================================================================

/// Typed stream of events for one method.
///
/// Each item is the event's `params` decoded into `E`. The stream ends when
/// the connection closes. Dropping it unregisters the listener.
pub struct EventStream<E> {
    rx: mpsc::UnboundedReceiver<Value>,
    method: String,
    listener: u64,
    shared: Arc<Shared>,
    _marker: PhantomData<fn() -> E>,
}

impl<E> EventStream<E> {
    /// Returns the event method this stream listens to.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

impl<E: DeserializeOwned> EventStream<E> {
    /// Waits for the next event.
    ///
    /// Returns `None` once the connection is closed. An item is `Err` when
    /// the event payload does not decode into `E`; later events still arrive.
    pub async fn recv(&mut self) -> Option<Result<E>> {
        let params = self.rx.recv().await?;
        Some(codec::decode_value(&params))
    }
}

impl<E: DeserializeOwned> Stream for EventStream<E> {
    type Item = Result<E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx
            .poll_recv(cx)
            .map(|params| params.map(|params| codec::decode_value(&params)))
    }
}

impl<E> Drop for EventStream<E> {
    fn drop(&mut self) {
        self.shared.remove_listener(&self.method, self.listener);
        trace!(method = %self.method, listener = self.listener, "Event listener removed");
    }
}

impl<E> fmt::Debug for EventStream<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("method", &self.method)
            .field("listener", &self.listener)
            .finish()
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
    use tokio_test::assert_ok;

    use crate::modules::session::{SessionCommand, SubscribeParameters};
    use crate::protocol::EmptyParams;
    use crate::transport::{MemoryPeer, MemoryTransport};

    fn spawn_broker(config: BrokerConfig) -> (Broker, MemoryPeer) {
        let (transport, peer) = MemoryTransport::pair();
        (Broker::spawn(transport, config), peer)
    }

    fn status() -> SessionCommand {
        SessionCommand::Status(EmptyParams {})
    }

    fn subscribe(event: &str) -> SessionCommand {
        SessionCommand::Subscribe(SubscribeParameters {
            events: vec![event.to_owned()],
            contexts: None,
            user_contexts: None,
        })
    }

    /// Runs one command/response exchange so earlier frames are processed.
    async fn round_trip(broker: &Broker, peer: &mut MemoryPeer) {
        let call = broker.execute::<Value>(status(), None);
        let remote = async {
            let request = peer.next_request().await.expect("request");
            peer.respond(&request["id"], json!({"ready": true, "message": ""}))
                .expect("respond");
        };
        let (result, ()) = tokio::join!(call, remote);
        assert_ok!(result);
    }

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_COMMAND_TIMEOUT.as_secs(), 30);
        assert_eq!(BrokerConfig::default().max_pending, DEFAULT_MAX_PENDING);
    }

    #[tokio::test]
    async fn test_execute_writes_envelope_and_resolves() {
        let (broker, mut peer) = spawn_broker(BrokerConfig::default());

        let call = broker.execute::<Value>(status(), None);
        let remote = async {
            let request = peer.next_request().await.expect("request");
            assert_eq!(
                request,
                json!({"id": 1, "method": "session.status", "params": {}})
            );
            peer.respond(&request["id"], json!({"ready": true, "message": "ok"}))
                .expect("respond");
        };

        let (result, ()) = tokio::join!(call, remote);
        let result = result.expect("status");
        assert_eq!(result["ready"], true);
        assert_eq!(broker.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_ids_are_monotonic() {
        let (broker, mut peer) = spawn_broker(BrokerConfig::default());

        for expected in 1..=3u64 {
            let call = broker.execute::<Value>(status(), None);
            let remote = async {
                let request = peer.next_request().await.expect("request");
                assert_eq!(request["id"], expected);
                peer.respond(&request["id"], json!({})).expect("respond");
            };
            let (result, ()) = tokio::join!(call, remote);
            assert_ok!(result);
        }
    }

    #[tokio::test]
    async fn test_permuted_responses_resolve_their_own_callers() {
        let (broker, mut peer) = spawn_broker(BrokerConfig::default());

        let first = broker.execute::<Value>(subscribe("a.one"), None);
        let second = broker.execute::<Value>(subscribe("b.two"), None);
        let third = broker.execute::<Value>(subscribe("c.three"), None);

        let remote = async {
            let mut requests = Vec::new();
            for _ in 0..3 {
                requests.push(peer.next_request().await.expect("request"));
            }
            // Answer in order 3, 1, 2, echoing each command's event name
            for index in [2, 0, 1] {
                let request = &requests[index];
                peer.respond(
                    &request["id"],
                    json!({"subscription": request["params"]["events"][0]}),
                )
                .expect("respond");
            }
        };

        let (first, second, third, ()) = tokio::join!(first, second, third, remote);

        assert_eq!(first.expect("first")["subscription"], "a.one");
        assert_eq!(second.expect("second")["subscription"], "b.two");
        assert_eq!(third.expect("third")["subscription"], "c.three");
        assert_eq!(broker.unmatched_responses(), 0);
    }

    #[tokio::test]
    async fn test_error_envelope_becomes_protocol_error() {
        let (broker, mut peer) = spawn_broker(BrokerConfig::default());

        let call = broker.execute::<Value>(status(), None);
        let remote = async {
            let request = peer.next_request().await.expect("request");
            peer.respond_error(&request["id"], "unknown command", "nope")
                .expect("respond");
        };

        let (result, ()) = tokio::join!(call, remote);
        let err = result.expect_err("should fail");
        assert_eq!(err.protocol_code(), Some("unknown command"));
        assert_eq!(broker.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_result_shape_mismatch_is_decode_error() {
        #[derive(Debug, serde::Deserialize)]
        struct Status {
            #[allow(dead_code)]
            ready: bool,
        }

        let (broker, mut peer) = spawn_broker(BrokerConfig::default());

        let call = broker.execute::<Status>(status(), None);
        let remote = async {
            let request = peer.next_request().await.expect("request");
            peer.respond(&request["id"], json!({"ready": "yes"}))
                .expect("respond");
        };

        let (result, ()) = tokio::join!(call, remote);
        assert!(result.expect_err("should fail").is_decode_error());
    }

    #[tokio::test]
    async fn test_cancelled_call_drops_late_response() {
        let (broker, mut peer) = spawn_broker(BrokerConfig::default());

        let task_broker = broker.clone();
        let handle =
            tokio::spawn(async move { task_broker.execute::<Value>(status(), None).await });

        let request = peer.next_request().await.expect("request");
        assert_eq!(broker.pending_count(), 1);

        handle.abort();
        assert!(handle.await.expect_err("aborted").is_cancelled());
        assert_eq!(broker.pending_count(), 0);

        // Late response for the cancelled id
        peer.respond(&request["id"], json!({"ready": true, "message": "late"}))
            .expect("respond");

        // Processed in order, so the late frame is handled by now
        round_trip(&broker, &mut peer).await;

        assert_eq!(broker.unmatched_responses(), 1);
        assert!(!broker.is_closed());
    }

    #[tokio::test]
    async fn test_timeout_removes_pending_entry() {
        let (broker, mut peer) = spawn_broker(BrokerConfig::default());

        let result = broker
            .execute::<Value>(status(), Some(Duration::from_millis(20)))
            .await;

        let err = result.expect_err("should time out");
        assert!(err.is_timeout());
        assert_eq!(broker.pending_count(), 0);

        let request = peer.next_request().await.expect("request");
        peer.respond(&request["id"], json!({})).expect("respond");
        round_trip(&broker, &mut peer).await;

        assert_eq!(broker.unmatched_responses(), 1);
    }

    #[tokio::test]
    async fn test_transport_close_fails_pending_and_later_calls() {
        let (broker, mut peer) = spawn_broker(BrokerConfig::default());

        let call = broker.execute::<Value>(status(), None);
        let remote = async move {
            let _ = peer.next_request().await.expect("request");
            drop(peer);
        };

        let (result, ()) = tokio::join!(call, remote);
        assert!(matches!(result, Err(Error::ConnectionClosed)));

        let later = broker.execute::<Value>(status(), None).await;
        assert!(matches!(later, Err(Error::ConnectionClosed)));
        assert!(broker.is_closed());
    }

    #[tokio::test]
    async fn test_shutdown_fails_pending() {
        let (broker, mut peer) = spawn_broker(BrokerConfig::default());

        let call = broker.execute::<Value>(status(), None);
        let remote = async {
            let _ = peer.next_request().await.expect("request");
            broker.shutdown();
        };

        let (result, ()) = tokio::join!(call, remote);
        assert!(result.expect_err("should fail").is_connection_error());
    }

    #[tokio::test]
    async fn test_too_many_pending() {
        let config = BrokerConfig {
            max_pending: 1,
            ..BrokerConfig::default()
        };
        let (broker, mut peer) = spawn_broker(config);

        let first = broker.execute::<Value>(status(), None);
        let remote = async {
            let request = peer.next_request().await.expect("request");
            let second = broker.execute::<Value>(status(), None).await;
            assert!(matches!(second, Err(Error::TooManyPending { limit: 1 })));
            peer.respond(&request["id"], json!({})).expect("respond");
        };

        let (result, ()) = tokio::join!(first, remote);
        assert_ok!(result);
    }

    #[tokio::test]
    async fn test_events_delivered_in_arrival_order() {
        let (broker, mut peer) = spawn_broker(BrokerConfig::default());
        let mut stream = broker.listen::<Value>("log.entryAdded");
        let mut other = broker.listen::<Value>("browsingContext.load");

        for n in 0..5 {
            peer.emit("log.entryAdded", json!({"n": n})).expect("emit");
        }
        round_trip(&broker, &mut peer).await;

        for n in 0..5 {
            let event = stream.recv().await.expect("event").expect("decoded");
            assert_eq!(event["n"], n);
        }

        drop(peer);
        assert!(other.next().await.is_none());
    }

    #[tokio::test]
    async fn test_event_fan_out_and_unregister() {
        let (broker, peer) = spawn_broker(BrokerConfig::default());
        let mut first = broker.listen::<Value>("script.message");
        let mut second = broker.listen::<Value>("script.message");
        assert_eq!(broker.listener_count("script.message"), 2);

        peer.emit("script.message", json!({"channel": "c"}))
            .expect("emit");

        assert_eq!(first.recv().await.expect("event").expect("ok")["channel"], "c");
        assert_eq!(second.recv().await.expect("event").expect("ok")["channel"], "c");

        drop(first);
        assert_eq!(broker.listener_count("script.message"), 1);
        drop(second);
        assert_eq!(broker.listener_count("script.message"), 0);
    }

    #[tokio::test]
    async fn test_scoped_listener_skips_other_contexts() {
        let (broker, mut peer) = spawn_broker(BrokerConfig::default());
        let mut global = broker.listen::<Value>("browsingContext.load");
        let mut scoped =
            broker.listen_in::<Value>("browsingContext.load", [BrowsingContextId::new("A")]);
        let mut logs = broker.listen_in::<Value>("log.entryAdded", [BrowsingContextId::new("A")]);

        peer.emit("browsingContext.load", json!({"context": "B"}))
            .expect("emit");
        peer.emit("browsingContext.load", json!({"context": "A"}))
            .expect("emit");
        peer.emit("log.entryAdded", json!({"source": {"realm": "r", "context": "B"}, "n": 1}))
            .expect("emit");
        peer.emit("log.entryAdded", json!({"source": {"realm": "r"}, "n": 2}))
            .expect("emit");
        round_trip(&broker, &mut peer).await;

        assert_eq!(global.recv().await.expect("event").expect("ok")["context"], "B");
        assert_eq!(global.recv().await.expect("event").expect("ok")["context"], "A");
        assert_eq!(scoped.recv().await.expect("event").expect("ok")["context"], "A");
        // Context-less events pass the scope
        assert_eq!(logs.recv().await.expect("event").expect("ok")["n"], 2);

        drop(peer);
        assert!(scoped.next().await.is_none());
        assert!(logs.next().await.is_none());
    }

    #[test]
    fn test_event_context_lookup() {
        assert_eq!(event_context(&json!({"context": "A"})), Some("A"));
        assert_eq!(
            event_context(&json!({"source": {"realm": "r", "context": "B"}})),
            Some("B")
        );
        assert_eq!(event_context(&json!({"source": {"realm": "r"}})), None);
        assert_eq!(event_context(&json!({"context": null})), None);
    }

    #[tokio::test]
    async fn test_undecodable_event_yields_error_item() {
        #[derive(Debug, serde::Deserialize)]
        struct Typed {
            #[allow(dead_code)]
            count: u32,
        }

        let (broker, peer) = spawn_broker(BrokerConfig::default());
        let mut stream = broker.listen::<Typed>("x.y");

        peer.emit("x.y", json!({"count": "many"})).expect("emit");
        peer.emit("x.y", json!({"count": 2})).expect("emit");

        assert!(stream.recv().await.expect("event").is_err());
        assert_ok!(stream.recv().await.expect("event"));
    }

    #[tokio::test]
    async fn test_garbage_frames_do_not_stop_the_loop() {
        let (broker, mut peer) = spawn_broker(BrokerConfig::default());

        peer.send("not json").expect("send");
        peer.send(r#"{"unexpected": true}"#).expect("send");
        peer.send(r#"{"id": null, "type": "error", "error": "invalid argument", "message": "x"}"#)
            .expect("send");

        round_trip(&broker, &mut peer).await;
        assert!(!broker.is_closed());
    }
}
