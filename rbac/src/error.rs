use thiserror::Error;

#[derive(Error, Debug)]
pub enum RbacError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown permission store backend: {0}")]
    UnknownBackend(String),

    #[error("Permission store error: {0}")]
    Permission(#[from] permissions::PermissionError),

    #[error("Authorization error: {0}")]
    Authorization(#[from] authz::error::AuthzError),

    #[error("Logging initialization error: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, RbacError>;
