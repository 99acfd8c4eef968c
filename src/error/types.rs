/**
 * Core Error Types
 *
 * This module defines the error taxonomy for the social graph, delivery,
 * and gateway components. Every error maps to an HTTP status code so
 * handlers can return `CoreError` directly.
 *
 * # Error Categories
 *
 * - `InvalidOperation` - rejected synchronously, never retried
 *   (self-follow, self-message, empty body)
 * - `NotFound` - unknown user or resource, surfaced to the caller
 * - `Unauthorized` - missing or invalid bearer token
 * - `Conflict` - internal inconsistency (dual-write rollback failure);
 *   logged as a critical internal error, surfaced as a generic failure
 * - `Store` - underlying database failure
 * - `Serialization` - JSON encode/decode failure
 */

use axum::http::StatusCode;
use thiserror::Error;

/// Errors surfaced by the core components.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Structurally invalid request (self-follow, self-message, empty body).
    /// Rejected synchronously; never retried.
    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    /// Referenced user or resource does not exist.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Missing or invalid credentials.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Internal inconsistency, e.g. a dual-write rollback that itself
    /// failed. Indicates a store-level defect; must never be silently
    /// swallowed.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Underlying store failure.
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// JSON serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new invalid-operation error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create a new not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a new unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a new conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidOperation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            // Internal inconsistency is surfaced generically to the caller.
            Self::Conflict { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the human-readable message for this error.
    ///
    /// `Conflict` and `Store` details stay in the logs; the caller only
    /// sees a generic failure.
    pub fn message(&self) -> String {
        match self {
            Self::InvalidOperation { message } => message.clone(),
            Self::NotFound { message } => message.clone(),
            Self::Unauthorized { message } => message.clone(),
            Self::Conflict { .. } | Self::Store(_) | Self::Serialization(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_operation_status() {
        let err = CoreError::invalid("You cannot follow yourself");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "You cannot follow yourself");
    }

    #[test]
    fn test_not_found_status() {
        let err = CoreError::not_found("User not found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unauthorized_status() {
        let err = CoreError::unauthorized("Missing token");
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_conflict_is_generic_to_caller() {
        let err = CoreError::conflict("edge rollback failed for A->B");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        // Details must not leak out of the process.
        assert_eq!(err.message(), "Internal server error");
    }

    #[test]
    fn test_store_error_conversion() {
        let err: CoreError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
