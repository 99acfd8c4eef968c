//! Huddle - Social Networking Backend Core
//!
//! Huddle is the core of a social-networking backend: a bidirectional
//! follow/unfollow graph maintained under concurrent mutation, and
//! real-time message delivery with live presence tracking across multiple
//! simultaneous connections per user.
//!
//! # Overview
//!
//! The crate provides:
//! - A Social Graph Manager with atomic dual-write follow edges
//! - A process-wide Presence Registry with online/offline events
//! - A Message Delivery Channel with per-conversation sequence numbers,
//!   durable persistence, and best-effort fan-out push
//! - A WebSocket Connection Gateway with heartbeat-based liveness
//! - A REST surface for follow operations and history fetch
//!
//! # Module Structure
//!
//! - **`shared`** - Wire types: messages, conversation keys, event enums
//! - **`error`** - Error taxonomy and HTTP response conversion
//! - **`server`** - Configuration, application state, initialization
//! - **`routes`** - Router assembly
//! - **`auth`** - Bearer token verification (issuance is external)
//! - **`directory`** - Read-only seam to the external account service
//! - **`graph`** - Graph store and Social Graph Manager
//! - **`presence`** - Presence Registry
//! - **`delivery`** - Message store and delivery channel
//! - **`gateway`** - WebSocket connection handling
//!
//! # Storage
//!
//! Graph edges and messages persist in PostgreSQL when `DATABASE_URL` is
//! configured; otherwise the same components run over in-memory stores
//! (used by tests and local development). Presence is always in-memory
//! and advisory: it rebuilds from zero connections on restart.
//!
//! # Usage
//!
//! ```rust,no_run
//! use huddle::server::create_app;
//!
//! # async fn example() {
//! let app = create_app().await;
//! // Serve with axum
//! # }
//! ```

/// Wire types shared with clients
pub mod shared;

/// Error types and conversions
pub mod error;

/// Server setup and state
pub mod server;

/// Route configuration
pub mod routes;

/// Token verification and middleware
pub mod auth;

/// External account directory seam
pub mod directory;

/// Follow/unfollow graph
pub mod graph;

/// Live connection tracking
pub mod presence;

/// Message persistence and fan-out
pub mod delivery;

/// WebSocket gateway
pub mod gateway;

pub use error::{CoreError, CoreResult};
pub use server::{create_app, AppState};
