use futures::stream::BoxStream;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Level};
use unicode_normalization::UnicodeNormalization;

use crate::entity::PermissionEntity;
use crate::error::{PermissionError, Result};
use crate::result::PermissionResult;
use crate::store::PermissionStore;
use crate::validator::{PermissionNameValidator, PermissionValidator};

/// Canonical lookup form of a permission name.
///
/// Unicode NFC composition followed by upper-casing. Every write path and
/// every read path goes through this function, so a name stored as
/// `Orders.Read` is found when looked up as `orders.read`, and a composed
/// `é` matches `e` plus a combining acute.
pub fn normalize_key(key: &str) -> String {
    key.nfc().collect::<String>().to_uppercase()
}

/// The single entry point for creating, changing, removing and finding
/// permissions.
///
/// The manager validates, normalizes and then delegates persistence to the
/// injected [`PermissionStore`]. It never locks: concurrent writers to the
/// same entity are arbitrated by the store's stamp comparison, and a caller
/// that receives `ConcurrencyFailure` re-reads and retries.
pub struct PermissionManager {
    store: Arc<dyn PermissionStore>,
    validators: Vec<Arc<dyn PermissionValidator>>,
}

impl PermissionManager {
    /// Create a manager over `store` running `validators` on every write.
    pub fn new(
        store: Arc<dyn PermissionStore>,
        validators: Vec<Arc<dyn PermissionValidator>>,
    ) -> Self {
        debug!(
            "Permission manager created with {} validator(s)",
            validators.len()
        );
        Self { store, validators }
    }

    /// Create a manager with the built-in [`PermissionNameValidator`].
    pub fn with_default_validators(store: Arc<dyn PermissionStore>) -> Self {
        let validators: Vec<Arc<dyn PermissionValidator>> = vec![Arc::new(PermissionNameValidator)];
        Self::new(store, validators)
    }

    pub fn validators(&self) -> &[Arc<dyn PermissionValidator>] {
        &self.validators
    }

    pub fn store(&self) -> &Arc<dyn PermissionStore> {
        &self.store
    }

    pub fn supports_queryable_permissions(&self) -> bool {
        self.store.as_queryable().is_some()
    }

    /// Stream every persisted permission.
    ///
    /// Fails with [`PermissionError::Unsupported`] when the store lacks the
    /// streaming capability.
    pub fn permissions<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> Result<BoxStream<'a, Result<PermissionEntity>>> {
        match self.store.as_queryable() {
            Some(queryable) => Ok(queryable.permissions(cancel)),
            None => Err(PermissionError::Unsupported(
                "store does not implement QueryablePermissionStore".to_string(),
            )),
        }
    }

    pub fn normalize_key(&self, key: &str) -> String {
        normalize_key(key)
    }

    pub async fn create(
        &self,
        permission: &mut PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<PermissionResult> {
        let result = self.validate_permission(permission, cancel).await?;
        if !result.succeeded() {
            return Ok(result);
        }
        self.update_normalized_permission_name(permission, cancel)
            .await?;
        self.store.create(permission, cancel).await
    }

    pub async fn update(
        &self,
        permission: &mut PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<PermissionResult> {
        let result = self.validate_permission(permission, cancel).await?;
        if !result.succeeded() {
            return Ok(result);
        }
        self.update_normalized_permission_name(permission, cancel)
            .await?;
        self.store.update(permission, cancel).await
    }

    pub async fn delete(
        &self,
        permission: &PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<PermissionResult> {
        self.store.delete(permission, cancel).await
    }

    /// Recompute the normalized name from the current name.
    pub async fn update_normalized_permission_name(
        &self,
        permission: &mut PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let name = self.permission_name(permission, cancel).await?;
        self.store
            .set_normalized_permission_name(permission, Some(normalize_key(&name)), cancel)
            .await
    }

    pub async fn permission_exists(
        &self,
        permission_name: &str,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        Ok(self.find_by_name(permission_name, cancel).await?.is_some())
    }

    pub async fn find_by_id(
        &self,
        permission_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PermissionEntity>> {
        self.store.find_by_id(permission_id, cancel).await
    }

    pub async fn find_by_name(
        &self,
        permission_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PermissionEntity>> {
        self.store
            .find_by_normalized_name(&normalize_key(permission_name), cancel)
            .await
    }

    pub async fn find_by_names<S: AsRef<str>>(
        &self,
        names: &[S],
        cancel: &CancellationToken,
    ) -> Result<Vec<PermissionEntity>> {
        let normalized: Vec<String> = names.iter().map(|n| normalize_key(n.as_ref())).collect();
        self.store.find_by_normalized_names(&normalized, cancel).await
    }

    pub async fn get_all(&self, cancel: &CancellationToken) -> Result<Vec<PermissionEntity>> {
        self.store.get_all(cancel).await
    }

    pub async fn permission_id(
        &self,
        permission: &PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.store.permission_id(permission, cancel).await
    }

    pub async fn permission_name(
        &self,
        permission: &PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.store.permission_name(permission, cancel).await
    }

    /// Rename `permission` in memory, keeping the normalized name in step.
    /// Call [`PermissionManager::update`] to persist.
    pub async fn set_permission_name(
        &self,
        permission: &mut PermissionEntity,
        name: impl Into<String>,
        cancel: &CancellationToken,
    ) -> Result<PermissionResult> {
        self.store
            .set_permission_name(permission, name.into(), cancel)
            .await?;
        self.update_normalized_permission_name(permission, cancel)
            .await?;
        Ok(PermissionResult::Success)
    }

    /// Consume the manager and tear down its store.
    pub async fn close(self) -> Result<()> {
        self.store.close().await?;
        info!("Permission manager closed");
        Ok(())
    }

    async fn validate_permission(
        &self,
        permission: &PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<PermissionResult> {
        let mut failures = Vec::new();
        for validator in &self.validators {
            failures.extend(validator.validate(self, permission, cancel).await?);
        }

        if failures.is_empty() {
            return Ok(PermissionResult::Success);
        }

        if tracing::enabled!(Level::WARN) {
            let permission_id = self.permission_id(permission, cancel).await?;
            let codes: Vec<&str> = failures.iter().map(|f| f.code.as_str()).collect();
            warn!(
                "Permission {} validation failed: {}.",
                permission_id,
                codes.join(";")
            );
        }
        Ok(PermissionResult::failed(failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryPermissionStore;
    use crate::result::PermissionFailure;
    use crate::sqlite_store::{SqlitePermissionStore, SqliteStoreConfig};
    use crate::FailureCode;
    use async_trait::async_trait;
    use futures::TryStreamExt;
    use rstest::rstest;
    use tempfile::TempDir;

    async fn sqlite_manager(temp_dir: &TempDir) -> PermissionManager {
        let config = SqliteStoreConfig {
            database_path: temp_dir.path().join("permissions.db"),
            ..SqliteStoreConfig::default()
        };
        let store = SqlitePermissionStore::connect(&config).await.unwrap();
        PermissionManager::with_default_validators(Arc::new(store))
    }

    /// Rejects every name containing a space.
    struct NoSpacesValidator;

    #[async_trait]
    impl PermissionValidator for NoSpacesValidator {
        async fn validate(
            &self,
            _manager: &PermissionManager,
            permission: &PermissionEntity,
            _cancel: &CancellationToken,
        ) -> Result<Vec<PermissionFailure>> {
            if permission.name.contains(' ') {
                Ok(vec![PermissionFailure::invalid_name(&permission.name)])
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[rstest]
    #[case("Read", "READ")]
    #[case("orders.read", "Orders.Read")]
    #[case("Straße", "STRASSE")]
    #[case("", "")]
    #[case("Caf\u{e9}.Read", "Cafe\u{301}.read")]
    fn test_normalize_key_is_case_insensitive(#[case] a: &str, #[case] b: &str) {
        assert_eq!(normalize_key(a), normalize_key(b));
    }

    #[rstest]
    #[case("Orders.Read")]
    #[case("ÉCLAIR.view")]
    #[case("  padded  ")]
    fn test_normalize_key_is_idempotent(#[case] key: &str) {
        let once = normalize_key(key);
        assert_eq!(normalize_key(&once), once);
    }

    #[tokio::test]
    async fn test_create_normalizes_and_is_findable() {
        let temp_dir = TempDir::new().unwrap();
        let manager = sqlite_manager(&temp_dir).await;
        let cancel = CancellationToken::new();

        let mut permission = PermissionEntity::new("Orders.Read");
        let result = manager.create(&mut permission, &cancel).await.unwrap();
        assert!(result.succeeded());
        assert_eq!(permission.normalized_name.as_deref(), Some("ORDERS.READ"));

        let found = manager
            .find_by_name(&normalize_key(&permission.name), &cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, permission.id);
        assert!(manager.permission_exists("orders.read", &cancel).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_name_leaves_one_entity() {
        let temp_dir = TempDir::new().unwrap();
        let manager = sqlite_manager(&temp_dir).await;
        let cancel = CancellationToken::new();

        let mut first = PermissionEntity::new("Orders.Read");
        assert!(manager.create(&mut first, &cancel).await.unwrap().succeeded());

        let mut second = PermissionEntity::new("orders.read");
        let result = manager.create(&mut second, &cancel).await.unwrap();
        assert_eq!(result.codes(), vec![FailureCode::DuplicatePermissionName]);
        assert!(second.normalized_name.is_none());

        assert_eq!(manager.get_all(&cancel).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_decomposed_twin_is_a_duplicate() {
        let manager = PermissionManager::with_default_validators(Arc::new(MemoryPermissionStore::new()));
        let cancel = CancellationToken::new();

        let mut composed = PermissionEntity::new("Caf\u{e9}.Read");
        assert!(manager.create(&mut composed, &cancel).await.unwrap().succeeded());

        let mut decomposed = PermissionEntity::new("Cafe\u{301}.Read");
        let result = manager.create(&mut decomposed, &cancel).await.unwrap();
        assert_eq!(result.codes(), vec![FailureCode::DuplicatePermissionName]);
        assert_eq!(manager.get_all(&cancel).await.unwrap().len(), 1);

        let found = manager
            .find_by_name("CAFE\u{301}.READ", &cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, composed.id);
    }

    #[tokio::test]
    async fn test_all_validator_failures_are_aggregated() {
        let store = Arc::new(MemoryPermissionStore::new());
        let validators: Vec<Arc<dyn PermissionValidator>> =
            vec![Arc::new(PermissionNameValidator), Arc::new(NoSpacesValidator)];
        let manager = PermissionManager::new(store, validators);
        let cancel = CancellationToken::new();

        let mut permission = PermissionEntity::new("   ");
        let result = manager.create(&mut permission, &cancel).await.unwrap();
        assert_eq!(
            result.codes(),
            vec![
                FailureCode::InvalidPermissionName,
                FailureCode::InvalidPermissionName
            ]
        );
        assert!(manager.get_all(&cancel).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_update_fails_then_retry_succeeds() {
        let temp_dir = TempDir::new().unwrap();
        let manager = sqlite_manager(&temp_dir).await;
        let cancel = CancellationToken::new();

        let mut permission = PermissionEntity::new("Orders.Read");
        manager.create(&mut permission, &cancel).await.unwrap();

        let mut stale = manager.find_by_id(&permission.id, &cancel).await.unwrap().unwrap();

        manager
            .set_permission_name(&mut permission, "Orders.View", &cancel)
            .await
            .unwrap();
        assert!(manager.update(&mut permission, &cancel).await.unwrap().succeeded());

        stale.name = "Orders.List".to_string();
        let result = manager.update(&mut stale, &cancel).await.unwrap();
        assert_eq!(result.codes(), vec![FailureCode::ConcurrencyFailure]);

        let mut fresh = manager.find_by_id(&permission.id, &cancel).await.unwrap().unwrap();
        assert_eq!(fresh.name, "Orders.View");
        manager
            .set_permission_name(&mut fresh, "Orders.List", &cancel)
            .await
            .unwrap();
        assert!(manager.update(&mut fresh, &cancel).await.unwrap().succeeded());

        let stored = manager.find_by_name("ORDERS.LIST", &cancel).await.unwrap().unwrap();
        assert_eq!(stored.id, permission.id);
        assert!(manager.find_by_name("Orders.View", &cancel).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_keeps_own_name_without_duplicate_error() {
        let temp_dir = TempDir::new().unwrap();
        let manager = sqlite_manager(&temp_dir).await;
        let cancel = CancellationToken::new();

        let mut permission = PermissionEntity::new("Orders.Read");
        manager.create(&mut permission, &cancel).await.unwrap();
        manager
            .set_permission_name(&mut permission, "ORDERS.READ", &cancel)
            .await
            .unwrap();
        assert!(manager.update(&mut permission, &cancel).await.unwrap().succeeded());
    }

    #[tokio::test]
    async fn test_delete_removes_entity() {
        let temp_dir = TempDir::new().unwrap();
        let manager = sqlite_manager(&temp_dir).await;
        let cancel = CancellationToken::new();

        let mut permission = PermissionEntity::new("Orders.Read");
        manager.create(&mut permission, &cancel).await.unwrap();
        assert!(manager.delete(&permission, &cancel).await.unwrap().succeeded());
        assert!(manager.find_by_id(&permission.id, &cancel).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_names_normalizes_inputs() {
        let temp_dir = TempDir::new().unwrap();
        let manager = sqlite_manager(&temp_dir).await;
        let cancel = CancellationToken::new();

        for name in ["Orders.Read", "Orders.Write", "Billing.View"] {
            manager
                .create(&mut PermissionEntity::new(name), &cancel)
                .await
                .unwrap();
        }

        let found = manager
            .find_by_names(&["orders.read", "BILLING.view"], &cancel)
            .await
            .unwrap();
        assert_eq!(found.len(), 2);

        let empty: [&str; 0] = [];
        assert!(manager.find_by_names(&empty, &cancel).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queryable_capability() {
        let temp_dir = TempDir::new().unwrap();
        let manager = sqlite_manager(&temp_dir).await;
        let cancel = CancellationToken::new();
        manager
            .create(&mut PermissionEntity::new("Orders.Read"), &cancel)
            .await
            .unwrap();

        assert!(manager.supports_queryable_permissions());
        let all: Vec<PermissionEntity> = manager
            .permissions(&cancel)
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(all.len(), 1);

        let memory = PermissionManager::with_default_validators(Arc::new(MemoryPermissionStore::new()));
        assert!(!memory.supports_queryable_permissions());
        assert!(matches!(
            memory.permissions(&cancel),
            Err(PermissionError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_create_writes_nothing() {
        let store = Arc::new(MemoryPermissionStore::new());
        let manager = PermissionManager::with_default_validators(store.clone());
        let cancelled = CancellationToken::new();
        cancelled.cancel();

        let result = manager
            .create(&mut PermissionEntity::new("Orders.Read"), &cancelled)
            .await;
        assert!(matches!(result, Err(PermissionError::Cancelled)));

        let live = CancellationToken::new();
        assert!(store.get_all(&live).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close_tears_down_shared_store() {
        let store = Arc::new(MemoryPermissionStore::new());
        let manager = PermissionManager::with_default_validators(store.clone());
        manager.close().await.unwrap();

        let result = store.get_all(&CancellationToken::new()).await;
        assert!(matches!(result, Err(PermissionError::Closed)));
    }
}
