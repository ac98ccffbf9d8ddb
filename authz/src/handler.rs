//! Requirement evaluation.
//!
//! Handlers inspect the pending requirements of an [`AuthorizationContext`]
//! and mark the ones they can satisfy. A requirement nobody marks stays
//! pending, and the engine denies. Handlers never deny explicitly.

use crate::requirement::{PermissionsRequirement, Requirement};
use crate::types::{fold_case, Principal};

/// Tracks which requirements of one authorization check have succeeded.
#[derive(Debug)]
pub struct AuthorizationContext<'a> {
    principal: &'a Principal,
    requirements: &'a [Requirement],
    succeeded: Vec<bool>,
}

impl<'a> AuthorizationContext<'a> {
    pub fn new(principal: &'a Principal, requirements: &'a [Requirement]) -> Self {
        Self {
            principal,
            requirements,
            succeeded: vec![false; requirements.len()],
        }
    }

    pub fn principal(&self) -> &'a Principal {
        self.principal
    }

    /// Requirements not yet marked as succeeded, with their positions.
    pub fn pending(&self) -> Vec<(usize, &'a Requirement)> {
        let requirements = self.requirements;
        requirements
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.succeeded[*i])
            .collect()
    }

    pub fn succeed(&mut self, index: usize) {
        if let Some(flag) = self.succeeded.get_mut(index) {
            *flag = true;
        }
    }

    /// True when there is at least one requirement and all have succeeded.
    pub fn has_succeeded(&self) -> bool {
        !self.succeeded.is_empty() && self.succeeded.iter().all(|s| *s)
    }
}

/// Evaluates requirements against the principal held by the context.
pub trait RequirementHandler: Send + Sync {
    fn handle(&self, context: &mut AuthorizationContext<'_>);
}

/// Satisfies a [`PermissionsRequirement`] when the principal holds at least
/// one of its permissions.
#[derive(Debug, Clone, Copy, Default)]
pub struct HasPermissionsHandler;

impl HasPermissionsHandler {
    /// OR semantics: one held permission out of the required list suffices.
    pub fn evaluate(requirement: &PermissionsRequirement, principal: &Principal) -> bool {
        let held = principal.permission_set();
        requirement
            .required_permissions()
            .iter()
            .any(|p| held.contains(&fold_case(p)))
    }
}

impl RequirementHandler for HasPermissionsHandler {
    fn handle(&self, context: &mut AuthorizationContext<'_>) {
        let principal = context.principal();
        for (index, requirement) in context.pending() {
            if let Requirement::Permissions(requirement) = requirement {
                if Self::evaluate(requirement, principal) {
                    context.succeed(index);
                }
            }
        }
    }
}

/// Satisfies [`Requirement::AuthenticatedUser`] for authenticated principals.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticatedUserHandler;

impl RequirementHandler for AuthenticatedUserHandler {
    fn handle(&self, context: &mut AuthorizationContext<'_>) {
        if !context.principal().authenticated {
            return;
        }
        for (index, requirement) in context.pending() {
            if matches!(requirement, Requirement::AuthenticatedUser) {
                context.succeed(index);
            }
        }
    }
}
