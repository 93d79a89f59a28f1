//! WebSocket client transport.
//!
//! Connects to a BiDi endpoint such as `ws://127.0.0.1:9222/session` and
//! exchanges text frames over it. `wss://` endpoints (a remote Grid node,
//! a cloud browser) go through rustls with the webpki root store.
//!
//! # Connection Flow
//!
//! 1. TCP connect, TLS handshake for `wss`, WebSocket upgrade (with timeout)
//! 2. [`Broker::spawn`](super::Broker::spawn) takes ownership of the transport
//! 3. Text frames flow until either side closes

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::Transport;

// ============================================================================
// Types
// ============================================================================

/// Client-side WebSocket stream.
type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// WebSocketTransport
// ============================================================================

/// A connected WebSocket carrying BiDi text frames.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use url::Url;
/// use bidi_webdriver::transport::WebSocketTransport;
///
/// let url = Url::parse("ws://127.0.0.1:9222/session")?;
/// let transport = WebSocketTransport::connect(&url, Duration::from_secs(10)).await?;
/// ```
pub struct WebSocketTransport {
    /// Underlying stream.
    stream: ClientStream,
}

impl WebSocketTransport {
    /// Connects to `url` and completes the WebSocket upgrade.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] if the upgrade does not finish within `connect_timeout`
    /// - [`Error::WebSocket`] if the connection or upgrade fails
    pub async fn connect(url: &Url, connect_timeout: Duration) -> Result<Self> {
        if url.scheme() == "wss" {
            install_crypto_provider();
        }

        let (stream, response) = timeout(connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| {
                Error::connection(format!(
                    "Timed out after {}ms connecting to {url}",
                    connect_timeout.as_millis()
                ))
            })??;

        info!(url = %url, status = %response.status(), "WebSocket connection established");

        Ok(Self { stream })
    }

    /// Wraps an already upgraded stream.
    #[inline]
    #[must_use]
    pub fn from_stream(stream: ClientStream) -> Self {
        Self { stream }
    }
}

/// Makes ring the process-wide rustls provider unless one is already set.
fn install_crypto_provider() {
    if rustls::crypto::CryptoProvider::get_default().is_none() {
        // Another thread may install first; its provider is kept
        let _ = rustls::crypto::ring::default_provider().install_default();
    }
}

impl fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tls = matches!(self.stream.get_ref(), MaybeTlsStream::Rustls(_));
        f.debug_struct("WebSocketTransport")
            .field("tls", &tls)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        trace!(bytes = text.len(), "Writing WebSocket frame");
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn receive(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),

                Ok(Message::Close(frame)) => {
                    debug!(?frame, "WebSocket closed by remote");
                    return None;
                }

                Ok(Message::Binary(bytes)) => {
                    warn!(bytes = bytes.len(), "Ignoring binary WebSocket frame");
                }

                // Ping, Pong and raw frames
                Ok(_) => {}

                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return None,

                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use tokio::net::TcpListener;

    /// Binds an echo server on a random port and returns its URL.
    async fn spawn_echo_server() -> Url {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let listener = TcpListener::bind(addr).await.expect("bind should succeed");
        let port = listener.local_addr().expect("local addr").port();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("upgrade");

            while let Some(Ok(message)) = ws.next().await {
                match message {
                    Message::Text(_) => {
                        if ws.send(message).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });

        Url::parse(&format!("ws://127.0.0.1:{port}")).expect("valid url")
    }

    #[tokio::test]
    async fn test_connect_and_echo() {
        let url = spawn_echo_server().await;
        let mut transport = WebSocketTransport::connect(&url, Duration::from_secs(5))
            .await
            .expect("connect");

        transport
            .send(r#"{"id":1,"method":"session.status","params":{}}"#.to_owned())
            .await
            .expect("send");

        let frame = transport
            .receive()
            .await
            .expect("frame")
            .expect("ok frame");
        assert!(frame.contains("session.status"));

        transport.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
            .await
            .expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let url = Url::parse(&format!("ws://127.0.0.1:{port}")).expect("valid url");
        let result = WebSocketTransport::connect(&url, Duration::from_secs(5)).await;

        assert!(result.expect_err("should fail").is_connection_error());
    }

    #[tokio::test]
    async fn test_wss_performs_tls_handshake() {
        let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
            .await
            .expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        // Reads the first byte the client writes, then hangs up
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            tokio::io::AsyncReadExt::read_u8(&mut stream)
                .await
                .expect("first byte")
        });

        let url = Url::parse(&format!("wss://127.0.0.1:{port}/session")).expect("valid url");
        let err = WebSocketTransport::connect(&url, Duration::from_secs(5))
            .await
            .expect_err("no TLS server");

        // 0x16 opens a TLS handshake record
        assert_eq!(server.await.expect("server task"), 0x16);
        assert!(err.is_connection_error());
        assert!(!err.to_string().contains("TLS support not compiled in"));
    }

    #[tokio::test]
    async fn test_debug_reports_plain_stream() {
        let url = spawn_echo_server().await;
        let transport = WebSocketTransport::connect(&url, Duration::from_secs(5))
            .await
            .expect("connect");

        let debug = format!("{transport:?}");
        assert!(debug.starts_with("WebSocketTransport"));
        assert!(debug.contains("tls: false"));
    }
}
