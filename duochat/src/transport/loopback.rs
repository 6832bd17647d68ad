//! Loopback transport for testing.
//!
//! [`LoopbackTransport::connect`] returns the client end plus a
//! [`LoopbackServer`] handle that plays the server. Events cross the
//! channels as encoded JSON frames so the codec is exercised both ways.

use tokio::sync::{Mutex, mpsc};

use duochat_proto::codec;
use duochat_proto::event::{ClientEvent, ServerEvent};

use super::{Transport, TransportError};

/// Client end of an in-process connection.
pub struct LoopbackTransport {
    local_id: String,
    tx: mpsc::Sender<String>,
    rx: Mutex<mpsc::Receiver<String>>,
}

/// Server end of an in-process connection.
pub struct LoopbackServer {
    tx: mpsc::Sender<String>,
    rx: Mutex<mpsc::Receiver<String>>,
}

impl LoopbackTransport {
    /// Create a connected client/server pair.
    ///
    /// `local_id` is the identifier the "server" assigned to this client.
    /// `buffer` is the channel capacity in each direction.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use duochat::transport::Transport;
    /// use duochat::transport::loopback::LoopbackTransport;
    /// use duochat_proto::event::{ClientEvent, CreateRoom, ServerEvent};
    ///
    /// # async fn example() {
    /// let (client, server) = LoopbackTransport::connect("sock-1", 32);
    /// client
    ///     .emit(&ClientEvent::CreateRoom(CreateRoom { username: "Ada".into() }))
    ///     .await
    ///     .unwrap();
    /// let request = server.recv().await.unwrap();
    /// server.send(&ServerEvent::RoomCreated("R1".into())).await.unwrap();
    /// # }
    /// ```
    pub fn connect(local_id: impl Into<String>, buffer: usize) -> (Self, LoopbackServer) {
        let (to_server, from_client) = mpsc::channel(buffer);
        let (to_client, from_server) = mpsc::channel(buffer);

        let client = Self {
            local_id: local_id.into(),
            tx: to_server,
            rx: Mutex::new(from_server),
        };
        let server = LoopbackServer {
            tx: to_client,
            rx: Mutex::new(from_client),
        };
        (client, server)
    }
}

impl Transport for LoopbackTransport {
    async fn emit(&self, event: &ClientEvent) -> Result<(), TransportError> {
        let frame = codec::encode_client(event)?;
        self.tx
            .send(frame)
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    async fn recv(&self) -> Result<ServerEvent, TransportError> {
        let mut rx = self.rx.lock().await;
        let frame = rx.recv().await.ok_or(TransportError::ConnectionClosed)?;
        Ok(codec::decode_server(&frame)?)
    }

    fn local_id(&self) -> &str {
        &self.local_id
    }

    fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

impl LoopbackServer {
    /// Push an event to the client.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionClosed`] once the client is gone.
    pub async fn send(&self, event: &ServerEvent) -> Result<(), TransportError> {
        let frame = codec::encode_server(event)?;
        self.send_raw(frame).await
    }

    /// Push a raw frame to the client, bypassing the encoder.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionClosed`] once the client is gone.
    pub async fn send_raw(&self, frame: impl Into<String>) -> Result<(), TransportError> {
        self.tx
            .send(frame.into())
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    /// Wait for the next event the client emitted.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionClosed`] once the client is gone
    /// and [`TransportError::Codec`] for an undecodable frame.
    pub async fn recv(&self) -> Result<ClientEvent, TransportError> {
        let mut rx = self.rx.lock().await;
        let frame = rx.recv().await.ok_or(TransportError::ConnectionClosed)?;
        Ok(codec::decode_client(&frame)?)
    }

    /// Take the next client event if one is already queued.
    pub fn try_recv(&self) -> Option<ClientEvent> {
        let mut rx = self.rx.try_lock().ok()?;
        let frame = rx.try_recv().ok()?;
        codec::decode_client(&frame).ok()
    }
}
