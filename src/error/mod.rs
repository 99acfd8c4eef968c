//! Error Module
//!
//! Error taxonomy for the core components and its conversion into HTTP
//! responses.
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports
//! ├── types.rs      - Error type definitions
//! └── conversion.rs - IntoResponse implementation
//! ```

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

pub use types::CoreError;

/// Convenience alias used throughout the core components.
pub type CoreResult<T> = Result<T, CoreError>;
