//! In-process transport pair.
//!
//! [`MemoryTransport`] plugs into the broker like any other transport;
//! [`MemoryPeer`] plays the remote end. Useful for tests, benches and for
//! embedding a BiDi remote end in the same process.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::error::{Error, Result};

use super::Transport;

// ============================================================================
// MemoryTransport
// ============================================================================

/// Local half of an in-process channel.
pub struct MemoryTransport {
    /// Frames written by the local end.
    outbound: mpsc::UnboundedSender<String>,
    /// Frames pushed by the peer.
    inbound: mpsc::UnboundedReceiver<String>,
    /// Set by [`Transport::close`].
    closed: bool,
}

impl MemoryTransport {
    /// Creates a connected transport and its remote peer.
    #[must_use]
    pub fn pair() -> (Self, MemoryPeer) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let transport = Self {
            outbound: outbound_tx,
            inbound: inbound_rx,
            closed: false,
        };
        let peer = MemoryPeer {
            frames: outbound_rx,
            inbound: inbound_tx,
        };

        (transport, peer)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }
        self.outbound.send(text).map_err(|_| Error::ConnectionClosed)
    }

    async fn receive(&mut self) -> Option<Result<String>> {
        if self.closed {
            return None;
        }
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.inbound.close();
        Ok(())
    }
}

// ============================================================================
// MemoryPeer
// ============================================================================

/// Remote half of an in-process channel.
///
/// Dropping the peer closes the transport from the remote side.
pub struct MemoryPeer {
    /// Frames written by the local end.
    frames: mpsc::UnboundedReceiver<String>,
    /// Frames delivered to the local end.
    inbound: mpsc::UnboundedSender<String>,
}

impl MemoryPeer {
    /// Waits for the next frame written by the local end.
    ///
    /// Returns `None` once the local end is gone.
    pub async fn next_frame(&mut self) -> Option<String> {
        self.frames.recv().await
    }

    /// Waits for the next command and parses it as JSON.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the local end is gone
    /// - [`Error::Json`] if the frame is not JSON
    pub async fn next_request(&mut self) -> Result<Value> {
        let frame = self.next_frame().await.ok_or(Error::ConnectionClosed)?;
        Ok(serde_json::from_str(&frame)?)
    }

    /// Delivers a raw text frame to the local end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the local end is gone.
    pub fn send(&self, text: impl Into<String>) -> Result<()> {
        self.inbound
            .send(text.into())
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Delivers a JSON frame to the local end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the local end is gone.
    pub fn send_json(&self, frame: &Value) -> Result<()> {
        self.send(frame.to_string())
    }

    /// Sends a success envelope for command `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the local end is gone.
    pub fn respond(&self, id: &Value, result: Value) -> Result<()> {
        self.send_json(&json!({"id": id, "type": "success", "result": result}))
    }

    /// Sends an error envelope for command `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the local end is gone.
    pub fn respond_error(&self, id: &Value, code: &str, message: &str) -> Result<()> {
        self.send_json(&json!({
            "id": id,
            "type": "error",
            "error": code,
            "message": message,
        }))
    }

    /// Sends an event envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the local end is gone.
    pub fn emit(&self, method: &str, params: Value) -> Result<()> {
        self.send_json(&json!({"type": "event", "method": method, "params": params}))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_frames_flow_both_ways() {
        let (mut transport, mut peer) = MemoryTransport::pair();

        assert_ok!(transport.send("{\"id\":1}".to_owned()).await);
        assert_eq!(peer.next_frame().await.as_deref(), Some("{\"id\":1}"));

        assert_ok!(peer.send("hello"));
        let frame = transport.receive().await.expect("frame").expect("ok");
        assert_eq!(frame, "hello");
    }

    #[tokio::test]
    async fn test_dropping_peer_ends_receive() {
        let (mut transport, peer) = MemoryTransport::pair();
        drop(peer);

        assert!(transport.receive().await.is_none());
        assert_err!(transport.send("x".to_owned()).await);
    }

    #[tokio::test]
    async fn test_close_rejects_further_sends() {
        let (mut transport, _peer) = MemoryTransport::pair();
        assert_ok!(transport.close().await);

        assert!(transport.receive().await.is_none());
        assert!(matches!(
            transport.send("x".to_owned()).await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_peer_helpers() {
        let (mut transport, peer) = MemoryTransport::pair();

        assert_ok!(peer.respond(&json!(3), json!({"ok": true})));
        let frame = transport.receive().await.expect("frame").expect("ok");
        let value: Value = serde_json::from_str(&frame).expect("json");
        assert_eq!(value["id"], 3);
        assert_eq!(value["type"], "success");
    }
}
