//! Social Graph Module
//!
//! Follow/unfollow graph: the storage trait with its PostgreSQL and
//! in-memory implementations, the manager that enforces the dual-write
//! protocol, and the REST handlers.
//!
//! ```text
//! graph/
//! ├── mod.rs      - Module exports
//! ├── store.rs    - GraphStore trait, PgGraphStore, MemoryGraphStore
//! ├── manager.rs  - SocialGraphManager (atomicity + idempotency)
//! └── handlers.rs - REST handlers for follow routes
//! ```

/// Edge set storage
pub mod store;

/// Follow/unfollow operations
pub mod manager;

/// REST handlers
pub mod handlers;

pub use manager::{EdgeChange, SocialGraphManager};
pub use store::{GraphStore, MemoryGraphStore, PgGraphStore};
