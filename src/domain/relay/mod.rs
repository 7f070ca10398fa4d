//! Relay domain - identities, identifiers and connection-level errors.

mod errors;
mod identity;
mod ids;
mod phase;

pub use errors::{HandshakeError, TransportError};
pub use identity::UserIdentity;
pub use ids::{ConnectionId, RoomId};
pub use phase::HandshakePhase;
