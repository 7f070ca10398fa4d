//! Room management and message routing.
//!
//! Rooms are keyed by room ID and hold the members currently joined to
//! them. A room exists exactly as long as it has at least one member.
//!
//! # Architecture
//!
//! ```text
//! Room: r1                 Room: r2
//! ├── c1 (alice) [lock]    └── c4 (dave) [lock]
//! ├── c2 (bob)   [lock]
//! └── c3 (carol) [lock]
//! ```
//!
//! A message from c1 in r1 is either broadcast to c2 and c3, or relayed to
//! the single member named in its `target`. Every member has its own write
//! lock so that concurrent deliveries to it are serialized.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::{Mutex, RwLock, Semaphore};
use tracing::{debug, info, warn};

use crate::adapters::metrics::{WS_DELIVERY_FAILURES_TOTAL, WS_MESSAGES_ROUTED_TOTAL};
use crate::domain::relay::{ConnectionId, RoomId, TransportError, UserIdentity};
use crate::ports::Connection;

use super::messages::{RoutedMessage, ServerMessage};

/// Tuning for outbound delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryConfig {
    /// Deadline applied to every individual send.
    pub write_timeout: Duration,
    /// Upper bound on sends in flight across all rooms.
    pub max_concurrent_deliveries: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_secs(10),
            max_concurrent_deliveries: 1024,
        }
    }
}

/// A joined connection plus the lock that serializes writes to it.
struct Member {
    identity: UserIdentity,
    connection: Mutex<Box<dyn Connection>>,
}

impl Member {
    fn new(identity: UserIdentity, connection: Box<dyn Connection>) -> Self {
        Self {
            identity,
            connection: Mutex::new(connection),
        }
    }

    /// Performs one deadline-bounded send while holding the write lock.
    async fn deliver(
        &self,
        payload: &[u8],
        write_timeout: Duration,
        permits: &Semaphore,
    ) -> Result<(), TransportError> {
        let mut connection = self.connection.lock().await;
        // Permits are taken under the write lock so they only count sends
        // that are actually on the wire.
        let _permit = permits.acquire().await.map_err(|_| TransportError::Closed)?;
        connection.set_write_deadline(write_timeout)?;
        connection.send_message(payload).await
    }

    async fn close(&self) {
        let mut connection = self.connection.lock().await;
        if let Err(e) = connection.close().await {
            debug!(
                connection_id = %self.identity.connection_id,
                error = %e,
                "error closing connection"
            );
        }
    }
}

type Room = HashMap<ConnectionId, Arc<Member>>;

/// Owns all room membership and routes messages between members.
///
/// Provides:
/// - Join/leave with lazy room creation and eager empty-room deletion
/// - Broadcast, targeted relay and raw fallback routing
/// - Membership snapshots pushed on every join and leave
///
/// # Thread Safety
///
/// A single `RwLock` guards the registry. Structural edits take the write
/// lock; routing takes the read lock only long enough to snapshot its
/// recipients. No network I/O ever happens while the registry lock is held.
/// Each recipient's send runs on its own task behind that member's write
/// lock, so a stuck peer delays nobody but itself.
pub struct RoomManager {
    rooms: RwLock<HashMap<RoomId, Room>>,
    write_timeout: Duration,
    delivery_permits: Arc<Semaphore>,
}

impl RoomManager {
    /// Create a room manager with the given delivery tuning.
    pub fn new(config: DeliveryConfig) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            write_timeout: config.write_timeout,
            delivery_permits: Arc::new(Semaphore::new(config.max_concurrent_deliveries.max(1))),
        }
    }

    /// Deadline applied to every write and close on a member's connection.
    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Add a connection to a room, creating the room if needed.
    ///
    /// A member already registered under the same connection ID is silently
    /// replaced. Every member of the room then receives a fresh user list.
    pub async fn join<C>(&self, room_id: &RoomId, identity: UserIdentity, connection: C)
    where
        C: Connection + 'static,
    {
        let connection_id = identity.connection_id.clone();
        let username = identity.username.clone();
        let member = Arc::new(Member::new(identity, Box::new(connection)));

        {
            let mut rooms = self.rooms.write().await;
            let room = rooms.entry(room_id.clone()).or_insert_with(|| {
                info!(room_id = %room_id, "room created");
                HashMap::new()
            });
            if room.insert(connection_id.clone(), member).is_some() {
                warn!(
                    room_id = %room_id,
                    connection_id = %connection_id,
                    "duplicate connection id, previous member replaced"
                );
            }
        }

        info!(
            room_id = %room_id,
            connection_id = %connection_id,
            username = %username,
            "user joined room"
        );
        self.broadcast_user_list(room_id).await;
    }

    /// Remove a connection from a room and close it.
    ///
    /// No-op when the room or member is already gone, so calling it twice
    /// is safe. The room is deleted once its last member leaves; otherwise
    /// the remaining members receive a fresh user list.
    pub async fn leave(&self, room_id: &RoomId, identity: &UserIdentity) {
        let (member, remaining) = {
            let mut rooms = self.rooms.write().await;
            let Some(room) = rooms.get_mut(room_id) else {
                debug!(room_id = %room_id, "leave for unknown room, nothing to do");
                return;
            };
            let member = room.remove(&identity.connection_id);
            let remaining = room.len();
            if remaining == 0 {
                rooms.remove(room_id);
                info!(room_id = %room_id, "room empty, deleted");
            }
            (member, remaining)
        };

        let Some(member) = member else {
            debug!(
                room_id = %room_id,
                connection_id = %identity.connection_id,
                "connection not in room, nothing to remove"
            );
            return;
        };

        member.close().await;
        info!(
            room_id = %room_id,
            connection_id = %identity.connection_id,
            username = %identity.username,
            "user left room"
        );

        if remaining > 0 {
            self.broadcast_user_list(room_id).await;
        }
    }

    /// Route one inbound message from `sender`.
    ///
    /// - Not a JSON object: the original bytes go to every other member.
    /// - Non-empty `target`: relayed to that member only, dropped if the
    ///   target is not in the room.
    /// - Otherwise: broadcast to every other member.
    ///
    /// The `sender` field is always overwritten. Returns once deliveries
    /// are dispatched, not when they complete.
    pub async fn route_message(&self, room_id: &RoomId, sender: &ConnectionId, raw: &[u8]) {
        let mut message = match RoutedMessage::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                debug!(
                    room_id = %room_id,
                    sender = %sender,
                    error = %e,
                    "unstructured message, relaying raw bytes"
                );
                counter!(WS_MESSAGES_ROUTED_TOTAL, "mode" => "raw").increment(1);
                self.broadcast_except(room_id, sender, Arc::from(raw)).await;
                return;
            }
        };

        message.stamp_sender(sender);
        let payload: Arc<[u8]> = match message.to_bytes() {
            Ok(bytes) => bytes.into(),
            Err(e) => {
                warn!(room_id = %room_id, sender = %sender, error = %e, "failed to serialize message");
                return;
            }
        };

        match message.delivery_target() {
            Some(target) => {
                counter!(WS_MESSAGES_ROUTED_TOTAL, "mode" => "targeted").increment(1);
                self.send_to(room_id, sender, target, payload).await;
            }
            None => {
                counter!(WS_MESSAGES_ROUTED_TOTAL, "mode" => "broadcast").increment(1);
                self.broadcast_except(room_id, sender, payload).await;
            }
        }
    }

    /// Number of rooms that currently exist.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// All room IDs that currently exist (for monitoring/debugging).
    pub async fn active_rooms(&self) -> Vec<RoomId> {
        self.rooms.read().await.keys().cloned().collect()
    }

    /// Number of members in a room (0 if the room doesn't exist).
    pub async fn member_count(&self, room_id: &RoomId) -> usize {
        self.rooms.read().await.get(room_id).map_or(0, HashMap::len)
    }

    /// Total members across all rooms.
    pub async fn total_member_count(&self) -> usize {
        self.rooms.read().await.values().map(HashMap::len).sum()
    }

    /// Identities of a room's members, in unspecified order.
    pub async fn members(&self, room_id: &RoomId) -> Vec<UserIdentity> {
        self.rooms
            .read()
            .await
            .get(room_id)
            .map(|room| room.values().map(|m| m.identity.clone()).collect())
            .unwrap_or_default()
    }

    async fn send_to(
        &self,
        room_id: &RoomId,
        sender: &ConnectionId,
        target: &ConnectionId,
        payload: Arc<[u8]>,
    ) {
        let recipient = {
            let rooms = self.rooms.read().await;
            rooms.get(room_id).and_then(|room| room.get(target)).cloned()
        };

        match recipient {
            Some(member) => self.dispatch(room_id, member, payload),
            None => warn!(
                room_id = %room_id,
                sender = %sender,
                target = %target,
                "unknown target, message dropped"
            ),
        }
    }

    async fn broadcast_except(&self, room_id: &RoomId, sender: &ConnectionId, payload: Arc<[u8]>) {
        let recipients: Vec<Arc<Member>> = {
            let rooms = self.rooms.read().await;
            match rooms.get(room_id) {
                Some(room) => room
                    .iter()
                    .filter(|(id, _)| *id != sender)
                    .map(|(_, member)| Arc::clone(member))
                    .collect(),
                None => return,
            }
        };

        for member in recipients {
            self.dispatch(room_id, member, Arc::clone(&payload));
        }
    }

    async fn broadcast_user_list(&self, room_id: &RoomId) {
        let recipients: Vec<Arc<Member>> = {
            let rooms = self.rooms.read().await;
            match rooms.get(room_id) {
                Some(room) => room.values().cloned().collect(),
                None => {
                    debug!(room_id = %room_id, "room gone before user list broadcast");
                    return;
                }
            }
        };

        let users = recipients.iter().map(|m| m.identity.clone()).collect();
        let payload: Arc<[u8]> = match ServerMessage::user_list(users).to_bytes() {
            Ok(bytes) => bytes.into(),
            Err(e) => {
                warn!(room_id = %room_id, error = %e, "failed to serialize user list");
                return;
            }
        };

        debug!(room_id = %room_id, members = recipients.len(), "broadcasting user list");
        for member in recipients {
            self.dispatch(room_id, member, Arc::clone(&payload));
        }
    }

    /// Fire one send to one member on its own task.
    fn dispatch(&self, room_id: &RoomId, member: Arc<Member>, payload: Arc<[u8]>) {
        let permits = Arc::clone(&self.delivery_permits);
        let write_timeout = self.write_timeout;
        let room_id = room_id.clone();

        tokio::spawn(async move {
            if let Err(e) = member.deliver(&payload, write_timeout, &permits).await {
                counter!(WS_DELIVERY_FAILURES_TOTAL).increment(1);
                warn!(
                    room_id = %room_id,
                    connection_id = %member.identity.connection_id,
                    username = %member.identity.username,
                    error = %e,
                    "delivery failed"
                );
            }
        });
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(DeliveryConfig::default())
    }
}
