//! Domain layer containing relay vocabulary and rules.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (validation errors, state machine trait)
//! - `relay` - Identities, identifiers, handshake phases and connection errors

pub mod foundation;
pub mod relay;
