//! In-process permission store.
//!
//! Keeps entities in a map keyed by id and applies the same uniqueness and
//! stamp checks as the SQLite store. It does not offer the streaming view.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::entity::PermissionEntity;
use crate::error::{PermissionError, Result};
use crate::result::{PermissionFailure, PermissionResult};
use crate::store::{PermissionStore, StoreLifecycle};

#[derive(Debug, Default)]
pub struct MemoryPermissionStore {
    permissions: RwLock<HashMap<String, PermissionEntity>>,
    lifecycle: StoreLifecycle,
}

impl MemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn name_taken(
        permissions: &HashMap<String, PermissionEntity>,
        permission: &PermissionEntity,
    ) -> bool {
        permission.normalized_name.is_some()
            && permissions.values().any(|p| {
                p.id != permission.id && p.normalized_name == permission.normalized_name
            })
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    fn ensure_usable(&self, cancel: &CancellationToken) -> Result<()> {
        self.lifecycle.check(cancel)
    }

    async fn create(
        &self,
        permission: &PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<PermissionResult> {
        self.ensure_usable(cancel)?;

        let mut permissions = self.permissions.write().await;
        if permissions.contains_key(&permission.id) {
            return Err(PermissionError::UniqueViolation(format!(
                "permissions.id = {}",
                permission.id
            )));
        }
        if Self::name_taken(&permissions, permission) {
            return Err(PermissionError::UniqueViolation(format!(
                "permissions.normalized_name = {}",
                permission.normalized_name.as_deref().unwrap_or_default()
            )));
        }

        permissions.insert(permission.id.clone(), permission.clone());
        info!("Created permission {} with id: {}", permission.name, permission.id);
        Ok(PermissionResult::Success)
    }

    async fn update(
        &self,
        permission: &mut PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<PermissionResult> {
        self.ensure_usable(cancel)?;

        let mut permissions = self.permissions.write().await;
        let current_stamp = permissions
            .get(&permission.id)
            .map(|p| p.concurrency_stamp.clone());
        if current_stamp.as_deref() != Some(permission.concurrency_stamp.as_str()) {
            warn!(
                "Concurrency conflict updating permission {}: stamp {} is stale",
                permission.id, permission.concurrency_stamp
            );
            return Ok(PermissionResult::failed(vec![PermissionFailure::concurrency()]));
        }
        if Self::name_taken(&permissions, permission) {
            return Err(PermissionError::UniqueViolation(format!(
                "permissions.normalized_name = {}",
                permission.normalized_name.as_deref().unwrap_or_default()
            )));
        }

        permission.concurrency_stamp = uuid::Uuid::new_v4().to_string();
        permissions.insert(permission.id.clone(), permission.clone());
        info!("Updated permission with id: {}", permission.id);
        Ok(PermissionResult::Success)
    }

    async fn delete(
        &self,
        permission: &PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<PermissionResult> {
        self.ensure_usable(cancel)?;

        let mut permissions = self.permissions.write().await;
        match permissions.get(&permission.id) {
            Some(stored) if stored.concurrency_stamp == permission.concurrency_stamp => {
                permissions.remove(&permission.id);
                info!("Deleted permission with id: {}", permission.id);
                Ok(PermissionResult::Success)
            }
            _ => {
                warn!(
                    "Concurrency conflict deleting permission {}: stamp {} is stale",
                    permission.id, permission.concurrency_stamp
                );
                Ok(PermissionResult::failed(vec![PermissionFailure::concurrency()]))
            }
        }
    }

    async fn find_by_id(
        &self,
        permission_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PermissionEntity>> {
        self.ensure_usable(cancel)?;
        Ok(self.permissions.read().await.get(permission_id).cloned())
    }

    async fn find_by_normalized_name(
        &self,
        normalized_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PermissionEntity>> {
        self.ensure_usable(cancel)?;
        Ok(self
            .permissions
            .read()
            .await
            .values()
            .find(|p| p.normalized_name.as_deref() == Some(normalized_name))
            .cloned())
    }

    async fn find_by_normalized_names(
        &self,
        normalized_names: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<PermissionEntity>> {
        self.ensure_usable(cancel)?;

        if normalized_names.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .permissions
            .read()
            .await
            .values()
            .filter(|p| {
                p.normalized_name
                    .as_ref()
                    .is_some_and(|n| normalized_names.contains(n))
            })
            .cloned()
            .collect())
    }

    async fn get_all(&self, cancel: &CancellationToken) -> Result<Vec<PermissionEntity>> {
        self.ensure_usable(cancel)?;
        Ok(self.permissions.read().await.values().cloned().collect())
    }

    async fn close(&self) -> Result<()> {
        if self.lifecycle.close() {
            self.permissions.write().await.clear();
        }
        Ok(())
    }
}
