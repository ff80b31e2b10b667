//! Network subsystem.
//!
//! # Responsibilities
//! - Bind the TCP listener with a distinguishable address-in-use error
//! - Accept connections under a concurrency limit
//! - Track active connections for graceful drain

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{Listener, StartError};
