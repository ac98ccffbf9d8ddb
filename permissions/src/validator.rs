//! Rule checks run by the manager before every create and update.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::entity::{PermissionEntity, MAX_NAME_LENGTH};
use crate::error::Result;
use crate::manager::PermissionManager;
use crate::result::PermissionFailure;

/// A pluggable validation rule.
///
/// Returns every violation it finds; an empty list means the entity passes.
/// Errors are reserved for infrastructure failures during lookups.
#[async_trait]
pub trait PermissionValidator: Send + Sync {
    async fn validate(
        &self,
        manager: &PermissionManager,
        permission: &PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<Vec<PermissionFailure>>;
}

/// Default rule: the name must be non-blank, fit [`MAX_NAME_LENGTH`] before
/// and after normalization, and not be owned by another entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionNameValidator;

#[async_trait]
impl PermissionValidator for PermissionNameValidator {
    async fn validate(
        &self,
        manager: &PermissionManager,
        permission: &PermissionEntity,
        cancel: &CancellationToken,
    ) -> Result<Vec<PermissionFailure>> {
        let mut failures = Vec::new();
        let name = manager.permission_name(permission, cancel).await?;

        // Upper-casing can grow a name (`ß` becomes `SS`); both forms are bounded
        let too_long = name.chars().count() > MAX_NAME_LENGTH
            || manager.normalize_key(&name).chars().count() > MAX_NAME_LENGTH;

        if name.trim().is_empty() || too_long {
            failures.push(PermissionFailure::invalid_name(&name));
        } else if let Some(owner) = manager.find_by_name(&name, cancel).await? {
            let owner_id = manager.permission_id(&owner, cancel).await?;
            if owner_id != manager.permission_id(permission, cancel).await? {
                failures.push(PermissionFailure::duplicate_name(&name));
            }
        }

        Ok(failures)
    }
}
