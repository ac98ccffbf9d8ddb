//! Requirements and the policies that group them.

use serde::{Deserialize, Serialize};

/// The principal must hold at least one of the listed permissions.
///
/// Built once from a parsed policy identifier and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsRequirement {
    required: Vec<String>,
}

impl PermissionsRequirement {
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: permissions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn required_permissions(&self) -> &[String] {
        &self.required
    }
}

/// A single condition a policy places on the principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Requirement {
    /// The principal must be authenticated.
    AuthenticatedUser,
    Permissions(PermissionsRequirement),
}

/// A set of requirements that must all succeed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthorizationPolicy {
    pub requirements: Vec<Requirement>,
}

impl AuthorizationPolicy {
    pub fn new(requirements: Vec<Requirement>) -> Self {
        Self { requirements }
    }

    pub fn require_authenticated_user() -> Self {
        Self::new(vec![Requirement::AuthenticatedUser])
    }

    pub fn require_permissions(requirement: PermissionsRequirement) -> Self {
        Self::new(vec![Requirement::Permissions(requirement)])
    }

    /// Merge several policies into one whose requirements are all of theirs.
    pub fn combine<'a, I>(policies: I) -> Self
    where
        I: IntoIterator<Item = &'a AuthorizationPolicy>,
    {
        Self::new(
            policies
                .into_iter()
                .flat_map(|p| p.requirements.iter().cloned())
                .collect(),
        )
    }
}
