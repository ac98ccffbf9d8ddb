//! SQLite-backed permission store.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::entity::PermissionEntity;
use crate::error::{PermissionError, Result};
use crate::result::{PermissionFailure, PermissionResult};
use crate::store::{PermissionStore, QueryablePermissionStore, StoreLifecycle};

const SELECT_COLUMNS: &str = "SELECT id, name, normalized_name, concurrency_stamp FROM permissions";

/// Configuration for the SQLite permission store
#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    /// Path to the database file
    pub database_path: PathBuf,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// How long to wait for a pooled connection
    pub acquire_timeout: Duration,
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/rbac/permissions.db"),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Permission store persisting to a `permissions` table.
///
/// Uniqueness of `normalized_name` is enforced by a unique index, and
/// optimistic concurrency by comparing `concurrency_stamp` in the `WHERE`
/// clause of every update and delete.
pub struct SqlitePermissionStore {
    pool: SqlitePool,
    lifecycle: StoreLifecycle,
}

impl SqlitePermissionStore {
    /// Open (creating if needed) the database described by `config`.
    pub async fn connect(config: &SqliteStoreConfig) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!(
            "Opening permission database at: {}",
            config.database_path.display()
        );

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(&config.database_path)
                    .create_if_missing(true),
            )
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the permission table if missing.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self {
            pool,
            lifecycle: StoreLifecycle::new(),
        };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        debug!("Creating permissions table if missing");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS permissions (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                normalized_name TEXT,
                concurrency_stamp TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS permission_name_index ON permissions(normalized_name)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl PermissionStore for SqlitePermissionStore {
    fn ensure_usable(&self, cancel: &CancellationToken) -> Result<()> {
        self.lifecycle.check(cancel)
    }

    async fn create(
        &self,
        permission: &PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<PermissionResult> {
        self.ensure_usable(cancel)?;

        sqlx::query(
            "INSERT INTO permissions (id, name, normalized_name, concurrency_stamp) VALUES (?, ?, ?, ?)",
        )
        .bind(&permission.id)
        .bind(&permission.name)
        .bind(&permission.normalized_name)
        .bind(&permission.concurrency_stamp)
        .execute(&self.pool)
        .await?;

        info!("Created permission {} with id: {}", permission.name, permission.id);
        Ok(PermissionResult::Success)
    }

    async fn update(
        &self,
        permission: &mut PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<PermissionResult> {
        self.ensure_usable(cancel)?;

        let new_stamp = uuid::Uuid::new_v4().to_string();
        let result = sqlx::query(
            r#"
            UPDATE permissions
            SET name = ?, normalized_name = ?, concurrency_stamp = ?
            WHERE id = ? AND concurrency_stamp = ?
            "#,
        )
        .bind(&permission.name)
        .bind(&permission.normalized_name)
        .bind(&new_stamp)
        .bind(&permission.id)
        .bind(&permission.concurrency_stamp)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(
                "Concurrency conflict updating permission {}: stamp {} is stale",
                permission.id, permission.concurrency_stamp
            );
            return Ok(PermissionResult::failed(vec![PermissionFailure::concurrency()]));
        }

        permission.concurrency_stamp = new_stamp;
        info!("Updated permission with id: {}", permission.id);
        Ok(PermissionResult::Success)
    }

    async fn delete(
        &self,
        permission: &PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<PermissionResult> {
        self.ensure_usable(cancel)?;

        let result = sqlx::query("DELETE FROM permissions WHERE id = ? AND concurrency_stamp = ?")
            .bind(&permission.id)
            .bind(&permission.concurrency_stamp)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            warn!(
                "Concurrency conflict deleting permission {}: stamp {} is stale",
                permission.id, permission.concurrency_stamp
            );
            return Ok(PermissionResult::failed(vec![PermissionFailure::concurrency()]));
        }

        info!("Deleted permission with id: {}", permission.id);
        Ok(PermissionResult::Success)
    }

    async fn find_by_id(
        &self,
        permission_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PermissionEntity>> {
        self.ensure_usable(cancel)?;

        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
        let permission = sqlx::query_as::<_, PermissionEntity>(&sql)
            .bind(permission_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(permission)
    }

    async fn find_by_normalized_name(
        &self,
        normalized_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PermissionEntity>> {
        self.ensure_usable(cancel)?;

        let sql = format!("{} WHERE normalized_name = ?", SELECT_COLUMNS);
        let permission = sqlx::query_as::<_, PermissionEntity>(&sql)
            .bind(normalized_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(permission)
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

        let placeholders = vec!["?"; normalized_names.len()].join(", ");
        let sql = format!(
            "{} WHERE normalized_name IN ({})",
            SELECT_COLUMNS, placeholders
        );
        debug!("Executing SQL: {}", sql);

        let mut query = sqlx::query_as::<_, PermissionEntity>(&sql);
        for name in normalized_names {
            query = query.bind(name);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn get_all(&self, cancel: &CancellationToken) -> Result<Vec<PermissionEntity>> {
        self.ensure_usable(cancel)?;

        let permissions = sqlx::query_as::<_, PermissionEntity>(SELECT_COLUMNS)
            .fetch_all(&self.pool)
            .await?;
        Ok(permissions)
    }

    async fn close(&self) -> Result<()> {
        if self.lifecycle.close() {
            self.pool.close().await;
            info!("Permission database connection closed");
        }
        Ok(())
    }

    fn as_queryable(&self) -> Option<&dyn QueryablePermissionStore> {
        Some(self)
    }
}

impl QueryablePermissionStore for SqlitePermissionStore {
    fn permissions<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> BoxStream<'a, Result<PermissionEntity>> {
        if let Err(e) = self.ensure_usable(cancel) {
            return stream::once(async move { Err(e) }).boxed();
        }

        sqlx::query_as::<_, PermissionEntity>(SELECT_COLUMNS)
            .fetch(&self.pool)
            .map_err(PermissionError::from)
            .take_until(cancel.cancelled())
            .boxed()
    }
}
