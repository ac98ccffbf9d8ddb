//! Persisted permission entities and the manager that maintains them.
//!
//! Permissions are data, not compile-time constants. This crate stores them
//! behind the [`PermissionStore`] trait and funnels every change through
//! [`PermissionManager`], which:
//!
//! 1. runs every registered [`PermissionValidator`] and aggregates the
//!    violations,
//! 2. recomputes the normalized name with [`normalize_key`],
//! 3. persists through the store, which rejects stale writes by comparing
//!    concurrency stamps.
//!
//! Rule violations and concurrency conflicts are returned as
//! [`PermissionResult`] values. [`PermissionError`] is reserved for
//! cancellation, use after close, unsupported capabilities and database
//! failures.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use permissions::{MemoryPermissionStore, PermissionEntity, PermissionManager};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> permissions::Result<()> {
//! let manager = PermissionManager::with_default_validators(Arc::new(MemoryPermissionStore::new()));
//! let cancel = CancellationToken::new();
//!
//! let mut permission = PermissionEntity::new("Orders.Read");
//! let result = manager.create(&mut permission, &cancel).await?;
//! assert!(result.succeeded());
//! # Ok(())
//! # }
//! ```

pub mod entity;
pub mod error;
pub mod manager;
pub mod memory_store;
pub mod result;
pub mod sqlite_store;
pub mod store;
pub mod validator;

pub use entity::{PermissionEntity, MAX_NAME_LENGTH};
pub use error::{PermissionError, Result};
pub use manager::{normalize_key, PermissionManager};
pub use memory_store::MemoryPermissionStore;
pub use result::{FailureCode, PermissionFailure, PermissionResult};
pub use sqlite_store::{SqlitePermissionStore, SqliteStoreConfig};
pub use store::{PermissionStore, QueryablePermissionStore, StoreLifecycle};
pub use validator::{PermissionNameValidator, PermissionValidator};
