//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the relay core to the outside world:
//! - `websocket` - Axum WebSocket transport, room manager and routes
//! - `metrics` - Prometheus recorder and metric names

pub mod metrics;
pub mod websocket;

pub use websocket::{relay_router, RoomManager, WebSocketState};
