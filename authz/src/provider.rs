//! Policy lookup by identifier.
//!
//! [`RbacPolicyProvider`] recognises identifiers of the form
//! `Rbac:<name1>,<name2>,...` and synthesises a policy holding one
//! [`PermissionsRequirement`]. Any other identifier is passed unchanged to the
//! fallback provider.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::requirement::{AuthorizationPolicy, PermissionsRequirement};

/// Prefix marking a permission policy identifier.
pub const PERMISSIONS_POLICY_PREFIX: &str = "Rbac";
/// Separates the prefix from the permission list.
pub const POLICY_SEPARATOR: char = ':';
/// Separates permission names within the list.
pub const PERMISSION_DELIMITER: char = ',';

/// Resolves policy identifiers to policies.
pub trait PolicyProvider: Send + Sync {
    /// Policy applied to undeclared operations when no fallback policy is set.
    fn default_policy(&self) -> Arc<AuthorizationPolicy>;

    /// Policy applied to operations with no authorization metadata at all;
    /// takes precedence over [`PolicyProvider::default_policy`].
    fn fallback_policy(&self) -> Option<Arc<AuthorizationPolicy>>;

    fn get_policy(&self, policy_name: &str) -> Option<Arc<AuthorizationPolicy>>;
}

/// Registry of named policies configured by the host.
#[derive(Debug, Clone)]
pub struct DefaultPolicyProvider {
    policies: HashMap<String, Arc<AuthorizationPolicy>>,
    default_policy: Arc<AuthorizationPolicy>,
    fallback_policy: Option<Arc<AuthorizationPolicy>>,
}

impl DefaultPolicyProvider {
    /// Default policy requires an authenticated user; no fallback policy.
    pub fn new() -> Self {
        Self {
            policies: HashMap::new(),
            default_policy: Arc::new(AuthorizationPolicy::require_authenticated_user()),
            fallback_policy: None,
        }
    }

    pub fn add_policy(mut self, name: impl Into<String>, policy: AuthorizationPolicy) -> Self {
        self.policies.insert(name.into(), Arc::new(policy));
        self
    }

    pub fn with_default_policy(mut self, policy: AuthorizationPolicy) -> Self {
        self.default_policy = Arc::new(policy);
        self
    }

    pub fn with_fallback_policy(mut self, policy: AuthorizationPolicy) -> Self {
        self.fallback_policy = Some(Arc::new(policy));
        self
    }
}

impl Default for DefaultPolicyProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyProvider for DefaultPolicyProvider {
    fn default_policy(&self) -> Arc<AuthorizationPolicy> {
        self.default_policy.clone()
    }

    fn fallback_policy(&self) -> Option<Arc<AuthorizationPolicy>> {
        self.fallback_policy.clone()
    }

    fn get_policy(&self, policy_name: &str) -> Option<Arc<AuthorizationPolicy>> {
        self.policies.get(policy_name).cloned()
    }
}

/// Parse a permission policy identifier.
///
/// Returns `None` when the identifier does not start with
/// [`PERMISSIONS_POLICY_PREFIX`] (ASCII case-insensitive) immediately
/// followed by [`POLICY_SEPARATOR`]. Blank names in the list are dropped.
pub fn parse_policy_name(policy_name: &str) -> Option<PermissionsRequirement> {
    let prefix_len = PERMISSIONS_POLICY_PREFIX.len();
    let prefix = policy_name.get(..prefix_len)?;
    if !prefix.eq_ignore_ascii_case(PERMISSIONS_POLICY_PREFIX) {
        return None;
    }

    let list = policy_name[prefix_len..].strip_prefix(POLICY_SEPARATOR)?;
    Some(PermissionsRequirement::new(
        list.split(PERMISSION_DELIMITER)
            .map(str::trim)
            .filter(|name| !name.is_empty()),
    ))
}

/// Policy provider for permission identifiers, memoizing parsed policies.
///
/// The memo may be populated concurrently. Parsing is deterministic, so two
/// callers racing on the same identifier compute equal policies and
/// whichever insert lands first is kept.
pub struct RbacPolicyProvider<F = DefaultPolicyProvider> {
    fallback: F,
    cache: DashMap<String, Arc<AuthorizationPolicy>>,
}

impl<F: PolicyProvider> RbacPolicyProvider<F> {
    pub fn new(fallback: F) -> Self {
        Self {
            fallback,
            cache: DashMap::new(),
        }
    }

    pub fn fallback(&self) -> &F {
        &self.fallback
    }

    /// Number of memoized permission policies.
    pub fn cached_policies(&self) -> usize {
        self.cache.len()
    }
}

impl Default for RbacPolicyProvider<DefaultPolicyProvider> {
    fn default() -> Self {
        Self::new(DefaultPolicyProvider::new())
    }
}

impl<F: PolicyProvider> PolicyProvider for RbacPolicyProvider<F> {
    fn default_policy(&self) -> Arc<AuthorizationPolicy> {
        self.fallback.default_policy()
    }

    fn fallback_policy(&self) -> Option<Arc<AuthorizationPolicy>> {
        self.fallback.fallback_policy()
    }

    fn get_policy(&self, policy_name: &str) -> Option<Arc<AuthorizationPolicy>> {
        if let Some(policy) = self.cache.get(policy_name) {
            return Some(policy.clone());
        }

        match parse_policy_name(policy_name) {
            Some(requirement) => {
                debug!("Synthesised permission policy for {}", policy_name);
                let policy = Arc::new(AuthorizationPolicy::require_permissions(requirement));
                Some(
                    self.cache
                        .entry(policy_name.to_string())
                        .or_insert(policy)
                        .clone(),
                )
            }
            None => self.fallback.get_policy(policy_name),
        }
    }
}
