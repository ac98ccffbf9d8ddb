//! Permission-based authorization engine.
//!
//! This crate turns declared permission requirements into allow/deny
//! decisions against a principal's permission claims.
//!
//! # Architecture Overview
//!
//! The authorization flow follows this pattern:
//!
//! 1. **Declaration**: a protected operation carries one or more
//!    [`HasPermissions`] declarations, each rendering to a policy identifier
//!    such as `Rbac:Orders.Read,Orders.Write`
//! 2. **Policy lookup**: [`RbacPolicyProvider`] parses each identifier into a
//!    policy holding one [`PermissionsRequirement`] (memoized); other
//!    identifiers go to the fallback provider
//! 3. **Evaluation**: requirement handlers mark the requirements the
//!    principal satisfies
//! 4. **Decision**: Allow only if every requirement of every policy succeeded
//!
//! Within one declaration the listed permissions are alternatives (OR).
//! Across declarations every one must be satisfied (AND). Both halves of
//! this are load-bearing.
//!
//! # Security Notes
//!
//! - Deny-by-default: an unsatisfied requirement leaves the decision at Deny
//! - An operation with no declarations gets the provider's fallback policy,
//!   or its default policy when no fallback is configured
//! - Unknown policy identifiers are errors; callers must fail closed
//! - Every decision is logged

pub mod declaration;
pub mod error;
pub mod handler;
pub mod provider;
pub mod requirement;
pub mod types;

use std::sync::Arc;
use tracing::{debug, info, warn};

pub use declaration::{HasPermissions, ProtectedOperation};
use error::{AuthzError, Result};
pub use handler::{
    AuthenticatedUserHandler, AuthorizationContext, HasPermissionsHandler, RequirementHandler,
};
pub use provider::{DefaultPolicyProvider, PolicyProvider, RbacPolicyProvider};
pub use requirement::{AuthorizationPolicy, PermissionsRequirement, Requirement};
use types::Principal;

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Resolves policies and runs the requirement handlers over them.
///
/// # Example
///
/// ```rust
/// use authz::{AuthzEngine, HasPermissions, ProtectedOperation, RbacPolicyProvider};
/// use authz::types::Principal;
/// use std::sync::Arc;
///
/// let engine = AuthzEngine::with_default_handlers(Arc::new(RbacPolicyProvider::default()));
/// let principal = Principal::user("alice").with_permission("Orders.Write");
/// let operation = ProtectedOperation::new("edit_order")
///     .requires(HasPermissions::new(["Orders.Read", "Orders.Write"]));
///
/// match engine.authorize_operation(&principal, &operation) {
///     Ok(decision) if decision.is_allowed() => println!("Access granted"),
///     Ok(_) => println!("Access denied"),
///     Err(e) => eprintln!("Authorization error: {}", e),
/// }
/// ```
pub struct AuthzEngine {
    provider: Arc<dyn PolicyProvider>,
    handlers: Vec<Arc<dyn RequirementHandler>>,
}

impl AuthzEngine {
    pub fn new(
        provider: Arc<dyn PolicyProvider>,
        handlers: Vec<Arc<dyn RequirementHandler>>,
    ) -> Self {
        Self { provider, handlers }
    }

    /// Engine with [`HasPermissionsHandler`] and [`AuthenticatedUserHandler`].
    pub fn with_default_handlers(provider: Arc<dyn PolicyProvider>) -> Self {
        let handlers: Vec<Arc<dyn RequirementHandler>> =
            vec![Arc::new(HasPermissionsHandler), Arc::new(AuthenticatedUserHandler)];
        Self::new(provider, handlers)
    }

    pub fn provider(&self) -> &Arc<dyn PolicyProvider> {
        &self.provider
    }

    /// Authorize `principal` against every named policy.
    ///
    /// An empty list evaluates the provider's fallback policy, or its default
    /// policy when none is set.
    ///
    /// # Returns
    ///
    /// - `Ok(Decision::Allow)` if all requirements of all policies succeeded
    /// - `Ok(Decision::Deny)` otherwise
    /// - `Err(AuthzError::PolicyNotFound)` if a name resolves to nothing
    pub fn authorize<S: AsRef<str>>(
        &self,
        principal: &Principal,
        policy_names: &[S],
    ) -> Result<Decision> {
        let policy = self.combined_policy(policy_names)?;
        Ok(self.evaluate(principal, &policy))
    }

    pub fn authorize_operation(
        &self,
        principal: &Principal,
        operation: &ProtectedOperation,
    ) -> Result<Decision> {
        let decision = self.authorize(principal, operation.policy_names().as_slice())?;
        match decision {
            Decision::Allow => info!(
                "Access ALLOWED for {} on {}",
                principal.id, operation.name
            ),
            Decision::Deny => warn!(
                "Access DENIED for {} on {}",
                principal.id, operation.name
            ),
        }
        Ok(decision)
    }

    /// Run every handler over `policy` and decide.
    pub fn evaluate(&self, principal: &Principal, policy: &AuthorizationPolicy) -> Decision {
        let mut context = AuthorizationContext::new(principal, &policy.requirements);
        for handler in &self.handlers {
            handler.handle(&mut context);
        }

        if context.has_succeeded() {
            Decision::Allow
        } else {
            debug!(
                "{} of {} requirement(s) unmet for {}",
                context.pending().len(),
                policy.requirements.len(),
                principal.id
            );
            Decision::Deny
        }
    }

    fn combined_policy<S: AsRef<str>>(&self, policy_names: &[S]) -> Result<AuthorizationPolicy> {
        if policy_names.is_empty() {
            let policy = self
                .provider
                .fallback_policy()
                .unwrap_or_else(|| self.provider.default_policy());
            return Ok((*policy).clone());
        }

        let policies = policy_names
            .iter()
            .map(|name| {
                self.provider
                    .get_policy(name.as_ref())
                    .ok_or_else(|| AuthzError::PolicyNotFound(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(AuthorizationPolicy::combine(policies.iter().map(|p| &**p)))
    }
}
