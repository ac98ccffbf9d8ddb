//! Hosting facade for data-driven RBAC.
//!
//! [`Rbac`] wires a [`PermissionManager`] over the store selected by
//! configuration together with an [`AuthzEngine`] that understands
//! `Rbac:`-prefixed policy identifiers.
//!
//! ```no_run
//! use rbac::{Rbac, RbacConfig};
//! use authz::{HasPermissions, ProtectedOperation};
//! use authz::types::Principal;
//!
//! # async fn run() -> rbac::Result<()> {
//! let config = RbacConfig::load(None)?;
//! let _guard = rbac::logging::init_logging(&config.logging)?;
//! let rbac = Rbac::builder(config).build().await?;
//!
//! let operation = ProtectedOperation::new("edit_order")
//!     .requires(HasPermissions::new(["Orders.Write"]));
//! let principal = Principal::user("alice").with_permission("Orders.Write");
//! assert!(rbac.authorize_operation(&principal, &operation)?.is_allowed());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod registry;

use authz::types::Principal;
use authz::{AuthzEngine, Decision, DefaultPolicyProvider, ProtectedOperation, RbacPolicyProvider};
use permissions::{
    PermissionEntity, PermissionFailure, PermissionManager, PermissionNameValidator,
    PermissionResult, PermissionValidator,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use config::{LoggingConfig, RbacConfig, StoreConfig};
pub use error::{RbacError, Result};
pub use registry::StoreRegistry;

/// Permission management and authorization for one host.
pub struct Rbac {
    manager: PermissionManager,
    engine: AuthzEngine,
}

impl Rbac {
    pub fn builder(config: RbacConfig) -> RbacBuilder {
        RbacBuilder::new(config)
    }

    /// Build with the default registry, validators and policy fallback.
    pub async fn from_config(config: RbacConfig) -> Result<Self> {
        Self::builder(config).build().await
    }

    pub fn manager(&self) -> &PermissionManager {
        &self.manager
    }

    pub fn engine(&self) -> &AuthzEngine {
        &self.engine
    }

    pub fn authorize<S: AsRef<str>>(
        &self,
        principal: &Principal,
        policy_names: &[S],
    ) -> Result<Decision> {
        Ok(self.engine.authorize(principal, policy_names)?)
    }

    pub fn authorize_operation(
        &self,
        principal: &Principal,
        operation: &ProtectedOperation,
    ) -> Result<Decision> {
        Ok(self.engine.authorize_operation(principal, operation)?)
    }

    /// Create each named permission that does not exist yet.
    ///
    /// Existing permissions are left untouched. Validation failures from all
    /// names are collected into one result.
    pub async fn seed_permissions<I, S>(
        &self,
        names: I,
        cancel: &CancellationToken,
    ) -> Result<PermissionResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut failures: Vec<PermissionFailure> = Vec::new();
        let mut created = 0usize;

        for name in names {
            let name = name.into();
            if self.manager.find_by_name(&name, cancel).await?.is_some() {
                continue;
            }
            let mut permission = PermissionEntity::new(name);
            match self.manager.create(&mut permission, cancel).await? {
                PermissionResult::Success => created += 1,
                PermissionResult::Failed(errors) => failures.extend(errors),
            }
        }

        info!("Seeded {} permission(s)", created);
        if failures.is_empty() {
            Ok(PermissionResult::Success)
        } else {
            warn!("{} permission(s) could not be seeded", failures.len());
            Ok(PermissionResult::failed(failures))
        }
    }

    pub async fn close(self) -> Result<()> {
        self.manager.close().await?;
        Ok(())
    }
}

/// Assembles an [`Rbac`] from configuration plus optional extensions.
pub struct RbacBuilder {
    config: RbacConfig,
    registry: StoreRegistry,
    validators: Vec<Arc<dyn PermissionValidator>>,
    fallback: DefaultPolicyProvider,
}

impl RbacBuilder {
    pub fn new(config: RbacConfig) -> Self {
        let validators: Vec<Arc<dyn PermissionValidator>> = vec![Arc::new(PermissionNameValidator)];
        Self {
            config,
            registry: StoreRegistry::with_defaults(),
            validators,
            fallback: DefaultPolicyProvider::new(),
        }
    }

    /// Replace the store registry, e.g. to add a custom backend.
    pub fn registry(mut self, registry: StoreRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Run `validator` after the built-in ones.
    pub fn add_validator(mut self, validator: Arc<dyn PermissionValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    /// Provider consulted for policy names without the `Rbac` prefix.
    pub fn fallback_policies(mut self, fallback: DefaultPolicyProvider) -> Self {
        self.fallback = fallback;
        self
    }

    pub async fn build(self) -> Result<Rbac> {
        self.config.validate()?;

        let store = self.registry.build(&self.config.store).await?;
        let manager = PermissionManager::new(store, self.validators);
        let engine =
            AuthzEngine::with_default_handlers(Arc::new(RbacPolicyProvider::new(self.fallback)));

        info!(
            "RBAC ready with '{}' permission store",
            self.config.store.backend
        );
        Ok(Rbac { manager, engine })
    }
}
