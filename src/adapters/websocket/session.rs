//! Per-connection lifecycle: handshake, join, read loop, leave.
//!
//! ```text
//! accept ─▶ handshake ─▶ join ─▶ read loop ─▶ leave
//!              │
//!              └─ failed ─▶ close (never joins)
//! ```

use std::net::SocketAddr;

use metrics::{counter, gauge};

use crate::adapters::metrics::{WS_CONNECTIONS_ACTIVE, WS_HANDSHAKE_FAILURES_TOTAL};
use crate::domain::relay::{HandshakeError, UserIdentity};
use crate::ports::{Connection, MessageSource};

use super::handshake::{perform_handshake, HandshakeConfig};
use super::rooms::RoomManager;

/// Keeps the active-connections gauge in step with joined sessions.
struct ActiveConnection;

impl ActiveConnection {
    fn open() -> Self {
        gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
        Self
    }
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    }
}

/// Drive one accepted connection from handshake to leave.
///
/// Returns the handshake error if the client never became ready; the
/// connection has already been closed in that case. Once joined, the
/// session always ends with exactly one `leave`.
pub async fn serve_connection<C, S>(
    mut connection: C,
    mut source: S,
    manager: &RoomManager,
    handshake: &HandshakeConfig,
    peer: Option<SocketAddr>,
) -> Result<(), HandshakeError>
where
    C: Connection + 'static,
    S: MessageSource,
{
    let identity = match perform_handshake(&mut source, handshake).await {
        Ok(identity) => identity,
        Err(e) => {
            counter!(WS_HANDSHAKE_FAILURES_TOTAL, "reason" => e.kind()).increment(1);
            tracing::warn!(peer = ?peer, reason = e.kind(), "failed to initialize user: {}", e);
            if let Err(close_err) = connection.close().await {
                tracing::debug!(peer = ?peer, "failed to close connection after handshake: {}", close_err);
            }
            return Err(e);
        }
    };

    let _active = ActiveConnection::open();
    let room_id = identity.room_id.clone();

    manager.join(&room_id, identity.clone(), connection).await;
    let routed = run_read_loop(&mut source, manager, &identity).await;
    manager.leave(&room_id, &identity).await;

    tracing::info!(
        peer = ?peer,
        connection_id = %identity.connection_id,
        room_id = %room_id,
        routed,
        "session ended"
    );
    Ok(())
}

/// Read messages until the source closes or errors, routing each one.
///
/// Each read is awaited in turn; routing only dispatches deliveries, so a
/// slow recipient never holds up the next read. Returns the number of
/// messages routed.
pub async fn run_read_loop<S>(source: &mut S, manager: &RoomManager, identity: &UserIdentity) -> u64
where
    S: MessageSource + ?Sized,
{
    let mut routed = 0u64;

    loop {
        match source.next_message().await {
            Some(Ok(message)) => {
                tracing::trace!(
                    connection_id = %identity.connection_id,
                    room_id = %identity.room_id,
                    bytes = message.len(),
                    "received message"
                );
                manager
                    .route_message(&identity.room_id, &identity.connection_id, &message)
                    .await;
                routed += 1;
            }
            Some(Err(e)) => {
                tracing::debug!(
                    connection_id = %identity.connection_id,
                    "read error, ending session: {}",
                    e
                );
                break;
            }
            None => {
                tracing::debug!(connection_id = %identity.connection_id, "client disconnected");
                break;
            }
        }
    }

    routed
}
