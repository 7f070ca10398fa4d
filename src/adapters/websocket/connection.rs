//! Axum WebSocket implementations of the connection ports.
//!
//! An upgraded socket is split in two: the sink becomes the member's
//! [`Connection`], the stream feeds the handshake and read loop.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};

use crate::domain::relay::TransportError;
use crate::ports::{Connection, MessageSource};

/// Split an upgraded socket into its write and read halves.
///
/// `write_timeout` bounds every send and the close handshake from the
/// start, so a connection closed before its first delivery is still bounded.
pub fn split_socket(
    socket: WebSocket,
    write_timeout: Duration,
) -> (WebSocketConnection, WebSocketSource) {
    let (sink, stream) = socket.split();
    (
        WebSocketConnection::new(sink, write_timeout),
        WebSocketSource::new(stream),
    )
}

/// Write half of a WebSocket.
///
/// The write deadline persists until changed and also bounds the close
/// handshake.
pub struct WebSocketConnection {
    sink: SplitSink<WebSocket, Message>,
    write_timeout: Duration,
    closed: bool,
}

impl WebSocketConnection {
    pub fn new(sink: SplitSink<WebSocket, Message>, write_timeout: Duration) -> Self {
        Self {
            sink,
            write_timeout,
            closed: false,
        }
    }
}

/// UTF-8 payloads go out as text frames, anything else as binary.
fn frame_for(payload: &[u8]) -> Message {
    match std::str::from_utf8(payload) {
        Ok(text) => Message::Text(text.to_owned()),
        Err(_) => Message::Binary(payload.to_vec()),
    }
}

/// Runs a sink operation under the write deadline.
async fn within_deadline<F>(deadline: Duration, op: F) -> Result<Result<(), axum::Error>, TransportError>
where
    F: Future<Output = Result<(), axum::Error>>,
{
    tokio::time::timeout(deadline, op)
        .await
        .map_err(|_| TransportError::DeadlineExceeded(deadline))
}

#[async_trait]
impl Connection for WebSocketConnection {
    fn set_write_deadline(&mut self, deadline: Duration) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.write_timeout = deadline;
        Ok(())
    }

    async fn send_message(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        let frame = frame_for(payload);
        within_deadline(self.write_timeout, self.sink.send(frame))
            .await?
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let sink = &mut self.sink;
        let shutdown = async move {
            sink.send(Message::Close(None)).await?;
            sink.close().await
        };
        within_deadline(self.write_timeout, shutdown)
            .await?
            .map_err(|e| TransportError::Close(e.to_string()))
    }
}

/// Read half of a WebSocket.
///
/// Text and binary frames surface as bytes. Ping/pong are answered by axum
/// and skipped here; a close frame ends the stream.
pub struct WebSocketSource {
    stream: SplitStream<WebSocket>,
}

impl WebSocketSource {
    pub fn new(stream: SplitStream<WebSocket>) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl MessageSource for WebSocketSource {
    async fn next_message(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.into_bytes())),
                Ok(Message::Binary(bytes)) => return Some(Ok(bytes)),
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Ok(Message::Close(frame)) => {
                    tracing::trace!(?frame, "client sent close frame");
                    return None;
                }
                Err(e) => return Some(Err(TransportError::Receive(e.to_string()))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn stuck_close_is_cut_off_at_the_deadline() {
        let deadline = Duration::from_secs(10);

        let result = within_deadline(deadline, std::future::pending::<Result<(), axum::Error>>()).await;

        assert!(matches!(result, Err(TransportError::DeadlineExceeded(d)) if d == deadline));
    }

    #[tokio::test]
    async fn completed_operation_passes_through() {
        let result = within_deadline(Duration::from_secs(1), async { Ok::<(), axum::Error>(()) }).await;

        assert!(matches!(result, Ok(Ok(()))));
    }

    #[test]
    fn utf8_payload_becomes_text_frame() {
        assert!(matches!(frame_for(br#"{"type":"chat"}"#), Message::Text(t) if t == r#"{"type":"chat"}"#));
    }

    #[test]
    fn non_utf8_payload_becomes_binary_frame() {
        let payload = [0xff, 0xfe, 0x00];
        assert!(matches!(frame_for(&payload), Message::Binary(b) if b == payload));
    }
}
