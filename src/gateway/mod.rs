//! Connection Gateway Module
//!
//! WebSocket termination: authenticates connections, registers them with
//! the presence registry, and routes events between the socket and the
//! delivery channel.

/// WebSocket upgrade handler and connection tasks
pub mod connection;

pub use connection::ws_handler;
