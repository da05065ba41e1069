//! Connection seam between [`SocketClient`](crate::SocketClient) and the network.
//!
//! A [`Transport`] opens a [`Connection`]: a pair of channels carrying text
//! frames in both directions. The inbound side always ends with exactly one
//! [`InboundFrame::Closed`] carrying the close code.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use swarm_core::constants::{ABNORMAL_CLOSE_CODE, SOCKET_CONNECT_TIMEOUT_MS};
use swarm_core::error::{SwarmError, SwarmResult};

/// Close code reported when the peer's close frame carried no status.
const NO_STATUS_CLOSE_CODE: u16 = 1005;

/// Frame received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// A text frame.
    Text(String),
    /// The connection ended with this close code.
    Closed { code: u16 },
}

/// Frame sent to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// A text frame.
    Text(String),
    /// Close the connection with this code.
    Close { code: u16 },
}

/// An open connection.
pub struct Connection {
    pub outbound: mpsc::UnboundedSender<OutboundFrame>,
    pub inbound: mpsc::UnboundedReceiver<InboundFrame>,
}

/// Opens connections to a socket URL.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a connection to `url`. Resolves once the connection is open.
    async fn open(&self, url: &str) -> SwarmResult<Connection>;
}

/// [`Transport`] backed by tokio-tungstenite, with rustls for `wss://`.
#[derive(Debug, Clone, Copy)]
pub struct WebSocketTransport {
    connect_timeout: Duration,
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(SOCKET_CONNECT_TIMEOUT_MS),
        }
    }
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time allowed for the TCP, TLS and WebSocket handshakes together.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Install the ring crypto provider for rustls. Later calls are no-ops.
fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, url: &str) -> SwarmResult<Connection> {
        install_crypto_provider();

        let (stream, _response) =
            tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(url))
                .await
                .map_err(|_| {
                    SwarmError::Socket(format!(
                        "timed out connecting to {url} after {}ms",
                        self.connect_timeout.as_millis()
                    ))
                })?
                .map_err(|e| SwarmError::Socket(format!("failed to connect to {url}: {e}")))?;

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundFrame>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<InboundFrame>();
        let (mut write, mut read) = stream.split();

        tokio::spawn(async move {
            let mut closing = false;
            let code = loop {
                tokio::select! {
                    frame = outbound_rx.recv(), if !closing => {
                        let message = match frame {
                            Some(OutboundFrame::Text(text)) => Message::Text(text.into()),
                            Some(OutboundFrame::Close { code }) => {
                                closing = true;
                                Message::Close(Some(CloseFrame {
                                    code: CloseCode::from(code),
                                    reason: "".into(),
                                }))
                            }
                            None => {
                                closing = true;
                                Message::Close(None)
                            }
                        };
                        if let Err(e) = write.send(message).await {
                            warn!("socket write failed: {e}");
                            break ABNORMAL_CLOSE_CODE;
                        }
                    }

                    message = read.next() => {
                        match message {
                            Some(Ok(Message::Text(text))) => {
                                let _ = inbound_tx.send(InboundFrame::Text(text.to_string()));
                            }
                            Some(Ok(Message::Close(frame))) => {
                                break frame
                                    .map(|f| u16::from(f.code))
                                    .unwrap_or(NO_STATUS_CLOSE_CODE);
                            }
                            Some(Ok(Message::Binary(data))) => {
                                debug!("ignoring {} byte binary frame", data.len());
                            }
                            // Pings are answered by tungstenite
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                debug!("socket read failed: {e}");
                                break ABNORMAL_CLOSE_CODE;
                            }
                            None => break ABNORMAL_CLOSE_CODE,
                        }
                    }
                }
            };

            debug!("socket pump finished with close code {code}");
            let _ = inbound_tx.send(InboundFrame::Closed { code });
        });

        Ok(Connection {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
