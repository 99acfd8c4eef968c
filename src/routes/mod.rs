//! Route Configuration Module

/// Router assembly
pub mod router;

/// Authenticated REST routes
pub mod api_routes;

pub use router::create_router;
