//! Principal and claim types consumed by the authorization pipeline.
//!
//! The authentication layer builds a [`Principal`] and attaches one
//! [`Claim`] of type [`PERMISSION_CLAIM_TYPE`] per permission the principal
//! holds. Permission claims are compared case-insensitively.
//!
//! # Security Note
//! Principals must come from an authenticated session only. Nothing in this
//! crate verifies where the claims came from.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// Claim type carrying a held permission name.
pub const PERMISSION_CLAIM_TYPE: &str = "permission";

/// Fold used for every permission-name comparison in this crate: NFC
/// composition, then upper case. Matches the stored normalized name.
pub fn fold_case(name: &str) -> String {
    name.nfc().collect::<String>().to_uppercase()
}

/// An assertion attached to a principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }

    /// A claim stating the principal holds `permission`.
    pub fn permission(permission: impl Into<String>) -> Self {
        Self::new(PERMISSION_CLAIM_TYPE, permission)
    }
}

/// The authenticated (or anonymous) caller of a protected operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// The unique identifier for this principal
    pub id: String,

    /// Whether the authentication layer verified this principal
    pub authenticated: bool,

    #[serde(default)]
    pub claims: Vec<Claim>,
}

impl Principal {
    /// Creates an authenticated principal with no claims.
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            authenticated: true,
            claims: Vec::new(),
        }
    }

    /// Creates a Principal representing an anonymous/unauthenticated user.
    pub fn anonymous() -> Self {
        Self {
            id: "anonymous".to_string(),
            authenticated: false,
            claims: Vec::new(),
        }
    }

    pub fn with_claim(mut self, claim: Claim) -> Self {
        self.claims.push(claim);
        self
    }

    pub fn with_permission(self, permission: impl Into<String>) -> Self {
        self.with_claim(Claim::permission(permission))
    }

    pub fn with_permissions<I, S>(self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        permissions
            .into_iter()
            .fold(self, |principal, p| principal.with_permission(p))
    }

    /// Case-folded set of every permission claim the principal carries.
    pub fn permission_set(&self) -> HashSet<String> {
        self.claims
            .iter()
            .filter(|c| c.claim_type == PERMISSION_CLAIM_TYPE)
            .map(|c| fold_case(&c.value))
            .collect()
    }
}
