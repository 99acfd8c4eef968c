//! Server Module
//!
//! Configuration, application state, and initialization.
//!
//! ```text
//! server/
//! ├── mod.rs    - Module exports
//! ├── config.rs - Environment configuration, database pool
//! ├── state.rs  - AppState and FromRef extraction
//! └── init.rs   - create_app / assemble_state
//! ```

/// Environment configuration
pub mod config;

/// Application state
pub mod state;

/// Application assembly
pub mod init;

pub use config::ServerConfig;
pub use init::{assemble_state, create_app};
pub use state::AppState;
