//! Message Delivery Module
//!
//! Persistent message storage, the delivery channel that allocates
//! sequence numbers and fans messages out to live connections, and the
//! history REST handler.
//!
//! ```text
//! delivery/
//! ├── mod.rs      - Module exports
//! ├── store.rs    - MessageStore trait, PgMessageStore, MemoryMessageStore
//! ├── channel.rs  - DeliveryChannel (sequencing, persistence, fan-out)
//! └── handlers.rs - REST handler for history fetch
//! ```

/// Message storage
pub mod store;

/// Send + fan-out pipeline
pub mod channel;

/// REST handlers
pub mod handlers;

pub use channel::DeliveryChannel;
pub use store::{MemoryMessageStore, MessageStore, PgMessageStore};
