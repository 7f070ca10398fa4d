//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the relay core and the transport it runs on. Adapters implement these
//! ports.
//!
//! - `Connection` - Write side of a client (deadline, send, close)
//! - `MessageSource` - Read side of a client (one message at a time)

mod connection;

pub use connection::{Connection, MessageSource};
