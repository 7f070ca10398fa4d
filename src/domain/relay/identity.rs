//! Client identity established by the connection handshake.

use serde::{Deserialize, Serialize};

use super::ids::{ConnectionId, RoomId};
use crate::domain::foundation::ValidationError;

/// Who a connection is and which room it wants.
///
/// Parsed once from the first inbound message and never mutated afterwards.
/// A reconnecting client gets a fresh identity even if the username repeats.
///
/// Missing fields deserialize to empty strings. The browser client sends
/// PascalCase keys plus a `"type": "init"` marker, so both spellings are
/// accepted and unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    #[serde(default, alias = "ConnectionId")]
    pub connection_id: ConnectionId,

    #[serde(default, alias = "Username")]
    pub username: String,

    #[serde(default, alias = "RoomId")]
    pub room_id: RoomId,
}

impl UserIdentity {
    /// Creates an identity from its parts.
    pub fn new(
        connection_id: impl Into<ConnectionId>,
        username: impl Into<String>,
        room_id: impl Into<RoomId>,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            username: username.into(),
            room_id: room_id.into(),
        }
    }

    /// Rejects identities that cannot be routed: an empty connection ID or
    /// an empty room ID.
    ///
    /// Only enforced when `relay.require_identity_fields` is on; by default
    /// empty values are accepted as-is.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.connection_id.is_empty() {
            return Err(ValidationError::empty_field("connectionId"));
        }
        if self.room_id.is_empty() {
            return Err(ValidationError::empty_field("roomId"));
        }
        Ok(())
    }
}
