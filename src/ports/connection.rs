//! Connection ports - the transport seen from the relay core.
//!
//! The core never touches a socket directly. The write half of a client is a
//! [`Connection`]; the read half is a [`MessageSource`]. Any duplex,
//! message-oriented channel can implement both.
//!
//! ```text
//!                ┌──────────────┐
//!   client ───▶  │ MessageSource│ ──▶ handshake ──▶ read loop ──▶ RoomManager
//!                └──────────────┘                                   │
//!                ┌──────────────┐                                   │
//!   client ◀───  │  Connection  │ ◀──── per-member write lock ◀─────┘
//!                └──────────────┘
//! ```

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::relay::TransportError;

/// Write side of a client connection.
///
/// Methods take `&mut self`: callers hold exclusive access for the duration
/// of one deadline + send sequence, which is what keeps frames from
/// interleaving on the wire.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Bounds the next `send_message` call.
    ///
    /// A send that has not completed within `deadline` fails with
    /// [`TransportError::DeadlineExceeded`].
    fn set_write_deadline(&mut self, deadline: Duration) -> Result<(), TransportError>;

    /// Sends one discrete message.
    async fn send_message(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Terminates the connection. Further sends fail with
    /// [`TransportError::Closed`].
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read side of a client connection.
#[async_trait]
pub trait MessageSource: Send {
    /// Waits for the next application message.
    ///
    /// Returns `None` on orderly close. Transport control frames are
    /// handled by the implementation and never surfaced.
    async fn next_message(&mut self) -> Option<Result<Vec<u8>, TransportError>>;
}
