//! WebSocket transport using tokio-tungstenite.
//!
//! Each open socket is bridged to a [`SocketChannel`] by two tasks: a writer
//! draining the outbound channel into the sink, and a reader forwarding
//! frames until the socket closes.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use galleria_application::ports::{NotificationTransport, SocketChannel, SocketEvent, TransportError};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};
use url::Url;

/// Opens notification sockets with tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteTransport;

impl TungsteniteTransport {
    /// Creates the transport.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Maps one inbound frame to an event. `None` means the frame is not surfaced.
fn frame_event(message: Message) -> Option<SocketEvent> {
    match message {
        Message::Text(text) => Some(SocketEvent::Message(text)),
        Message::Binary(bytes) => Some(SocketEvent::Message(
            String::from_utf8_lossy(&bytes).into_owned(),
        )),
        Message::Close(frame) => Some(SocketEvent::Closed {
            code: frame.as_ref().map(|f| u16::from(f.code)),
            reason: frame.map(|f| f.reason.into_owned()).unwrap_or_default(),
        }),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
    }
}

#[async_trait]
impl NotificationTransport for TungsteniteTransport {
    async fn connect(&self, url: &Url) -> Result<SocketChannel, TransportError> {
        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        debug!(%url, "WebSocket opened");

        let (mut sink, mut stream) = stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(text)).await {
                    debug!(error = %e, "WebSocket write failed");
                    return;
                }
            }
            // Outbound sender dropped: close from our side.
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(message) => match frame_event(message) {
                        Some(closed @ SocketEvent::Closed { .. }) => {
                            let _ = inbound_tx.send(closed);
                            return;
                        }
                        Some(event) => {
                            if inbound_tx.send(event).is_err() {
                                trace!("Inbound receiver gone, stopping reader");
                                return;
                            }
                        }
                        None => {}
                    },
                    Err(e) => {
                        let _ = inbound_tx.send(SocketEvent::Error(e.to_string()));
                        break;
                    }
                }
            }
            let _ = inbound_tx.send(SocketEvent::Closed {
                code: None,
                reason: "connection lost".to_string(),
            });
        });

        Ok(SocketChannel { outbound, inbound })
    }
}
