//! Notification socket transport port

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

/// Errors opening the notification socket.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The socket could not be opened.
    #[error("connect failed: {0}")]
    Connect(String),

    /// The connection is not open.
    #[error("socket is not open")]
    NotOpen,
}

/// Something that happened on an open socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// A text frame.
    Message(String),
    /// A transport error. A `Closed` event follows when the socket dies.
    Error(String),
    /// The socket closed.
    Closed {
        /// Close code, if the peer sent one.
        code: Option<u16>,
        /// Close reason.
        reason: String,
    },
}

/// Both directions of an open socket.
///
/// Dropping `outbound` closes the socket. When `inbound` yields `None` the
/// socket is gone.
#[derive(Debug)]
pub struct SocketChannel {
    /// Text frames to send.
    pub outbound: mpsc::UnboundedSender<String>,
    /// Events received.
    pub inbound: mpsc::UnboundedReceiver<SocketEvent>,
}

/// Opens duplex text sockets.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Opens a socket to `url`. Returning `Ok` means the socket is open.
    async fn connect(&self, url: &Url) -> Result<SocketChannel, TransportError>;
}
