//! Fatal error types for the permission store and manager.
//!
//! Business-rule outcomes (invalid names, duplicates, concurrency conflicts)
//! are not errors; they come back as [`crate::PermissionResult`] values. The
//! variants here signal either an infrastructure failure or a caller bug.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PermissionError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller's cancellation token was already signalled.
    #[error("Operation was cancelled")]
    Cancelled,

    /// The store was torn down and can no longer be used.
    #[error("Permission store has been closed")]
    Closed,

    /// A write would break the id or normalized-name uniqueness constraint.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// The store does not implement an optional capability.
    #[error("Unsupported capability: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, PermissionError>;
