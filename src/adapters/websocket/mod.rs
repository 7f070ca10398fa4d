//! WebSocket adapters for the room relay.
//!
//! Clients join named rooms over WebSocket, broadcast state-sync messages
//! to the rest of the room, and relay signaling messages to one peer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       ws_handler (axum)                              │
//! │   - Upgrades GET /stream                                            │
//! │   - Splits socket → WebSocketConnection + WebSocketSource           │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       serve_connection                               │
//! │   handshake (bounded) → join → read loop → leave                    │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         RoomManager                                  │
//! │   Room: r1             Room: r2                                     │
//! │   ├── c1 [write lock]  └── c4 [write lock]                          │
//! │   └── c2 [write lock]                                               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - Routed envelope and user list wire types
//! - [`rooms`] - Room membership, routing and per-member write serialization
//! - [`handshake`] - Bounded wait for the identity payload
//! - [`session`] - Per-connection lifecycle and read loop
//! - [`connection`] - Axum socket halves implementing the connection ports
//! - [`handler`] - Axum upgrade handler and router

pub mod connection;
pub mod handler;
pub mod handshake;
pub mod messages;
pub mod rooms;
pub mod session;

pub use connection::{split_socket, WebSocketConnection, WebSocketSource};
pub use handler::{relay_router, ws_handler, WebSocketState};
pub use handshake::{perform_handshake, HandshakeConfig};
pub use messages::{RoutedMessage, ServerMessage, UserListPayload, USER_LIST_UPDATE};
pub use rooms::{DeliveryConfig, RoomManager};
pub use session::{run_read_loop, serve_connection};
