//! Persistence abstraction over [`PermissionEntity`].
//!
//! Every operation takes the caller's [`CancellationToken`] and checks it,
//! together with the store's lifecycle state, before doing any work. A
//! signalled token fails with [`PermissionError::Cancelled`]; a closed store
//! fails with [`PermissionError::Closed`]. Neither performs a partial write.

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

use crate::entity::PermissionEntity;
use crate::error::{PermissionError, Result};
use crate::result::PermissionResult;

#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Fail fast if the token is signalled or the store has been closed.
    fn ensure_usable(&self, cancel: &CancellationToken) -> Result<()>;

    async fn create(
        &self,
        permission: &PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<PermissionResult>;

    /// Persist `permission` if its stamp still matches the stored one.
    ///
    /// On success the entity carries the newly generated stamp. A stale stamp
    /// yields a `ConcurrencyFailure` result and leaves the entity untouched.
    async fn update(
        &self,
        permission: &mut PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<PermissionResult>;

    /// Remove `permission` if its stamp still matches the stored one.
    async fn delete(
        &self,
        permission: &PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<PermissionResult>;

    async fn find_by_id(
        &self,
        permission_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PermissionEntity>>;

    async fn find_by_normalized_name(
        &self,
        normalized_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PermissionEntity>>;

    /// All entities whose normalized name is in `normalized_names`.
    /// Implementations return an empty list for empty input without querying.
    async fn find_by_normalized_names(
        &self,
        normalized_names: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<PermissionEntity>>;

    async fn get_all(&self, cancel: &CancellationToken) -> Result<Vec<PermissionEntity>>;

    /// Tear the store down. Later calls fail with [`PermissionError::Closed`].
    async fn close(&self) -> Result<()>;

    /// Capability check for the streaming view.
    fn as_queryable(&self) -> Option<&dyn QueryablePermissionStore> {
        None
    }

    async fn permission_id(
        &self,
        permission: &PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.ensure_usable(cancel)?;
        Ok(permission.id.clone())
    }

    async fn permission_name(
        &self,
        permission: &PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.ensure_usable(cancel)?;
        Ok(permission.name.clone())
    }

    async fn set_permission_name(
        &self,
        permission: &mut PermissionEntity,
        name: String,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.ensure_usable(cancel)?;
        permission.name = name;
        Ok(())
    }

    async fn normalized_permission_name(
        &self,
        permission: &PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        self.ensure_usable(cancel)?;
        Ok(permission.normalized_name.clone())
    }

    async fn set_normalized_permission_name(
        &self,
        permission: &mut PermissionEntity,
        normalized_name: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.ensure_usable(cancel)?;
        permission.normalized_name = normalized_name;
        Ok(())
    }
}

/// A store that can stream every persisted entity for ad-hoc filtering.
pub trait QueryablePermissionStore: PermissionStore {
    fn permissions<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> BoxStream<'a, Result<PermissionEntity>>;
}

/// Open/closed state shared by the store implementations.
#[derive(Debug, Default)]
pub struct StoreLifecycle {
    closed: AtomicBool,
}

impl StoreLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(PermissionError::Cancelled);
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(PermissionError::Closed);
        }
        Ok(())
    }

    /// Mark closed. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
