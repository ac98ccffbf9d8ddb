//! Error types for the authorization pipeline.
//!
//! # Security Note
//! A failed requirement is not an error: it yields a `Deny` decision. Errors
//! are reserved for situations where no decision can be made at all, and
//! callers must treat them as a denial (fail closed).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthzError {
    /// Neither the permission provider nor the fallback knows this policy.
    #[error("Authorization policy not found: {0}")]
    PolicyNotFound(String),
}

/// A specialized Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthzError>;
