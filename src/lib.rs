//! Room Relay - real-time room-based WebSocket relay
//!
//! Clients join named rooms, broadcast state-sync messages to everyone else
//! in the room, and relay signaling messages (e.g. WebRTC offers) to one
//! specific peer.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
