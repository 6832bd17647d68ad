//! Transport layer abstraction.
//!
//! A [`Transport`] carries named events between the client and the chat
//! server. Implementations:
//! - [`socket::SocketTransport`]: WebSocket connection with JSON frames
//! - [`loopback::LoopbackTransport`]: in-process channels for tests

pub mod loopback;
pub mod socket;

use duochat_proto::codec::CodecError;
use duochat_proto::event::{ClientEvent, ServerEvent};

/// Errors that can occur during transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection to the server has been closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Connecting or the handshake did not finish in time.
    #[error("transport operation timed out")]
    Timeout,

    /// The server could not be reached.
    #[error("server {0} is unreachable")]
    Unreachable(String),

    /// The server sent something other than the expected handshake.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// An event could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// An underlying I/O error occurred.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Async transport for named events.
///
/// Delivery is fire-and-forget: `emit` returning `Ok` only means the event
/// was handed to the connection.
pub trait Transport: Send + Sync {
    /// Send one event to the server.
    fn emit(
        &self,
        event: &ClientEvent,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Receive the next event from the server.
    ///
    /// Returns [`TransportError::ConnectionClosed`] once the connection is
    /// gone.
    fn recv(&self) -> impl std::future::Future<Output = Result<ServerEvent, TransportError>> + Send;

    /// Identifier the server assigned to this connection.
    fn local_id(&self) -> &str;

    /// Whether the connection is still up.
    fn is_connected(&self) -> bool;
}
