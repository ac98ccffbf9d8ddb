use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{RbacError, Result};

/// Top-level configuration for the hosting facade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RbacConfig {
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// Which permission store to build and how to connect it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Registry key of the store backend ("sqlite", "memory", ...)
    pub backend: String,
    /// Path to the database file for file-backed stores
    pub database_path: PathBuf,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection acquire timeout in seconds
    pub acquire_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            database_path: PathBuf::from("data/rbac/permissions.db"),
            max_connections: 5,
            acquire_timeout_secs: 30,
        }
    }
}

impl StoreConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn sqlite(&self) -> permissions::SqliteStoreConfig {
        permissions::SqliteStoreConfig {
            database_path: self.database_path.clone(),
            max_connections: self.max_connections,
            acquire_timeout: self.acquire_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,
    /// Directory for daily rolling log files; console only when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl RbacConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: RbacConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load configuration from `path` (or defaults) and apply `RBAC_*`
    /// environment overrides, reading `.env` first if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup such as the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("RBAC_STORE_BACKEND") {
            debug!("Overriding store backend from environment: {}", backend);
            self.store.backend = backend;
        }
        if let Some(path) = lookup("RBAC_DATABASE_PATH") {
            self.store.database_path = PathBuf::from(path);
        }
        if let Some(value) = lookup("RBAC_MAX_CONNECTIONS") {
            self.store.max_connections = value.parse().map_err(|_| {
                RbacError::Configuration(format!("RBAC_MAX_CONNECTIONS is not a number: {}", value))
            })?;
        }
        if let Some(level) = lookup("RBAC_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(dir) = lookup("RBAC_LOG_DIR") {
            self.logging.log_dir = Some(PathBuf::from(dir));
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.backend.trim().is_empty() {
            return Err(RbacError::Configuration(
                "store.backend cannot be empty".to_string(),
            ));
        }
        if self.store.max_connections == 0 {
            return Err(RbacError::Configuration(
                "store.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
