use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a permission name and its normalized form.
pub const MAX_NAME_LENGTH: usize = 256;

/// A named, persisted capability a principal may hold.
///
/// `normalized_name` and `concurrency_stamp` are maintained by the
/// [`crate::PermissionManager`] and the store; callers only set `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PermissionEntity {
    pub id: String,
    pub name: String,
    pub normalized_name: Option<String>,
    pub concurrency_stamp: String,
}

impl PermissionEntity {
    /// Create a new permission with a fresh id and concurrency stamp.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            normalized_name: None,
            concurrency_stamp: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl fmt::Display for PermissionEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
