//! Store backend registry.
//!
//! Maps a backend key from [`StoreConfig::backend`] to an async constructor.
//! `sqlite` and `memory` are registered by [`StoreRegistry::with_defaults`];
//! hosts may register their own stores under new keys.

use futures::future::BoxFuture;
use permissions::{MemoryPermissionStore, PermissionStore, SqlitePermissionStore};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{RbacError, Result};

pub type StoreConstructor = Box<
    dyn Fn(StoreConfig) -> BoxFuture<'static, permissions::Result<Arc<dyn PermissionStore>>>
        + Send
        + Sync,
>;

#[derive(Default)]
pub struct StoreRegistry {
    constructors: HashMap<String, StoreConstructor>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("sqlite", |config| {
            Box::pin(async move {
                let store = SqlitePermissionStore::connect(&config.sqlite()).await?;
                Ok(Arc::new(store) as Arc<dyn PermissionStore>)
            })
        });
        registry.register("memory", |_config| {
            Box::pin(async move {
                Ok(Arc::new(MemoryPermissionStore::new()) as Arc<dyn PermissionStore>)
            })
        });
        registry
    }

    /// Register `constructor` under `backend`, replacing any previous entry.
    pub fn register<F>(&mut self, backend: impl Into<String>, constructor: F)
    where
        F: Fn(StoreConfig) -> BoxFuture<'static, permissions::Result<Arc<dyn PermissionStore>>>
            + Send
            + Sync
            + 'static,
    {
        let backend = backend.into();
        debug!("Registering permission store backend: {}", backend);
        self.constructors.insert(backend, Box::new(constructor));
    }

    pub fn contains(&self, backend: &str) -> bool {
        self.constructors.contains_key(backend)
    }

    pub fn backends(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub async fn build(&self, config: &StoreConfig) -> Result<Arc<dyn PermissionStore>> {
        let constructor = self
            .constructors
            .get(&config.backend)
            .ok_or_else(|| RbacError::UnknownBackend(config.backend.clone()))?;

        let store = constructor(config.clone()).await?;
        info!("Permission store backend '{}' ready", config.backend);
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(backend: &str) -> StoreConfig {
        StoreConfig {
            backend: backend.to_string(),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn test_default_backends() {
        let registry = StoreRegistry::with_defaults();
        assert_eq!(registry.backends(), vec!["memory", "sqlite"]);
    }

    #[tokio::test]
    async fn test_build_memory_store() {
        let registry = StoreRegistry::with_defaults();
        let store = registry.build(&config("memory")).await.unwrap();
        assert!(store.as_queryable().is_none());
    }

    #[tokio::test]
    async fn test_build_sqlite_store() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig {
            database_path: temp_dir.path().join("nested").join("permissions.db"),
            ..config("sqlite")
        };

        let store = StoreRegistry::with_defaults().build(&config).await.unwrap();
        assert!(store.as_queryable().is_some());
        assert!(config.database_path.exists());
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_backend() {
        let result = StoreRegistry::with_defaults().build(&config("postgres")).await;
        assert!(matches!(result, Err(RbacError::UnknownBackend(key)) if key == "postgres"));
    }

    #[tokio::test]
    async fn test_custom_backend() {
        let mut registry = StoreRegistry::new();
        registry.register("scratch", |_config| {
            Box::pin(async move {
                Ok(Arc::new(MemoryPermissionStore::new()) as Arc<dyn PermissionStore>)
            })
        });

        assert!(registry.contains("scratch"));
        assert!(!registry.contains("sqlite"));
        assert!(registry.build(&config("scratch")).await.is_ok());
    }
}
