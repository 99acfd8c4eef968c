//! Presence Module
//!
//! The process-wide registry of live connections and the presence-changed
//! event stream.

/// Connection registry and presence events
pub mod registry;

pub use registry::{ConnectionHandle, ConnectionId, PresenceEvent, PresenceRegistry};
