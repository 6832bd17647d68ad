//! WebSocket transport.
//!
//! Each frame is one JSON text message `{"event": ..., "data": ...}`. On
//! connect the server sends a `connected` frame carrying the identifier it
//! assigned to this connection; [`SocketTransport::connect`] waits for it
//! before returning.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use duochat_proto::codec;
use duochat_proto::event::{ClientEvent, ServerEvent};

use super::{Transport, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsSender = futures_util::stream::SplitSink<WsStream, Message>;
type WsReader = futures_util::stream::SplitStream<WsStream>;

/// Capacity of the channel between the reader task and [`Transport::recv`].
const INCOMING_BUFFER: usize = 256;

/// WebSocket connection to the chat server.
pub struct SocketTransport {
    local_id: String,
    url: String,
    ws_sender: Arc<Mutex<WsSender>>,
    incoming: Mutex<mpsc::Receiver<ServerEvent>>,
    connected: Arc<AtomicBool>,
    _reader_handle: tokio::task::JoinHandle<()>,
}

impl SocketTransport {
    /// Connect to `url` and wait for the `connected` handshake.
    ///
    /// `timeout` bounds the WebSocket connect and the handshake separately.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Timeout`] if either step times out.
    /// - [`TransportError::Unreachable`] if the server refuses the connection.
    /// - [`TransportError::Handshake`] if the first frame is not `connected`.
    /// - [`TransportError::ConnectionClosed`] if the server hangs up first.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let (ws_stream, _response) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| {
                tracing::warn!(url, "WebSocket connect timed out");
                TransportError::Timeout
            })?
            .map_err(|e| {
                tracing::warn!(url, err = %e, "WebSocket connect failed");
                map_ws_connect_error(url, e)
            })?;

        let (ws_sender, mut ws_reader) = ws_stream.split();

        let local_id = tokio::time::timeout(timeout, await_handshake(&mut ws_reader))
            .await
            .map_err(|_| {
                tracing::warn!(url, "handshake timed out");
                TransportError::Timeout
            })??;
        tracing::info!(local_id = %local_id, url, "connected to chat server");

        let (tx, rx) = mpsc::channel(INCOMING_BUFFER);
        let connected = Arc::new(AtomicBool::new(true));
        let reader_handle = tokio::spawn(reader_loop(ws_reader, tx, Arc::clone(&connected)));

        Ok(Self {
            local_id,
            url: url.to_string(),
            ws_sender: Arc::new(Mutex::new(ws_sender)),
            incoming: Mutex::new(rx),
            connected,
            _reader_handle: reader_handle,
        })
    }

    /// The server URL this transport is connected to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for SocketTransport {
    async fn emit(&self, event: &ClientEvent) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::Relaxed) {
            return Err(TransportError::ConnectionClosed);
        }
        let frame = codec::encode_client(event)?;

        let mut sender = self.ws_sender.lock().await;
        sender.send(Message::text(frame)).await.map_err(|e| {
            tracing::warn!(err = %e, event = event.name(), "send failed");
            self.connected.store(false, Ordering::Relaxed);
            TransportError::ConnectionClosed
        })
    }

    async fn recv(&self) -> Result<ServerEvent, TransportError> {
        let mut rx = self.incoming.lock().await;
        rx.recv().await.ok_or(TransportError::ConnectionClosed)
    }

    fn local_id(&self) -> &str {
        &self.local_id
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

async fn await_handshake(ws_reader: &mut WsReader) -> Result<String, TransportError> {
    loop {
        match ws_reader.next().await {
            Some(Ok(Message::Text(text))) => {
                return match codec::decode_server(text.as_str()) {
                    Ok(ServerEvent::Connected(connected)) => Ok(connected.id),
                    Ok(other) => Err(TransportError::Handshake(format!(
                        "expected connected, got {}",
                        other.name()
                    ))),
                    Err(e) => Err(TransportError::Handshake(e.to_string())),
                };
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) | None => return Err(TransportError::ConnectionClosed),
            Some(Ok(_)) => {
                return Err(TransportError::Handshake(
                    "unexpected non-text frame".to_string(),
                ));
            }
            Some(Err(e)) => {
                return Err(TransportError::Io(std::io::Error::other(format!(
                    "WebSocket error during handshake: {e}"
                ))));
            }
        }
    }
}

/// Read frames until the connection ends, forwarding decoded events.
///
/// Malformed or unknown frames are logged and skipped.
async fn reader_loop(
    mut ws_reader: WsReader,
    tx: mpsc::Sender<ServerEvent>,
    connected: Arc<AtomicBool>,
) {
    while let Some(msg_result) = ws_reader.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match codec::decode_server(text.as_str()) {
                Ok(event) => {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(err = %e, "undecodable frame, skipping");
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("WebSocket closed by server");
                break;
            }
            Ok(Message::Binary(_)) => {
                tracing::debug!("binary frame ignored");
            }
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
            Err(e) => {
                tracing::warn!(err = %e, "WebSocket read error");
                break;
            }
        }
    }
    connected.store(false, Ordering::Relaxed);
    tracing::info!("socket reader task exiting");
}

fn map_ws_connect_error(url: &str, err: tokio_tungstenite::tungstenite::Error) -> TransportError {
    use tokio_tungstenite::tungstenite::Error as WsError;
    match err {
        WsError::Io(io_err)
            if matches!(
                io_err.kind(),
                std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::AddrNotAvailable
            ) =>
        {
            TransportError::Unreachable(url.to_string())
        }
        WsError::Io(io_err) => TransportError::Io(io_err),
        WsError::Http(response) => TransportError::Io(std::io::Error::other(format!(
            "server HTTP error: status {}",
            response.status()
        ))),
        other => TransportError::Io(std::io::Error::other(format!(
            "connection error: {other}"
        ))),
    }
}
