//! Authentication Module
//!
//! Bearer token verification and the middleware/extractor that guard the
//! REST surface. Issuing credentials is the external auth service's job.

/// JWT verification
pub mod sessions;

/// Request middleware and extractor
pub mod middleware;

pub use middleware::{auth_middleware, AuthUser, AuthenticatedUser};
pub use sessions::{create_token, user_id_from_token, verify_token};
