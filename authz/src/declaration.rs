//! Declarative permission requirements for protected operations.

use serde::{Deserialize, Serialize};

use crate::provider::{PERMISSIONS_POLICY_PREFIX, PERMISSION_DELIMITER, POLICY_SEPARATOR};

/// Declares that the caller must hold at least one of `permissions`.
///
/// Renders to the policy identifier understood by
/// [`crate::provider::RbacPolicyProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasPermissions {
    permissions: Vec<String>,
}

impl HasPermissions {
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    /// `Rbac:<name1>,<name2>,...`
    pub fn policy_name(&self) -> String {
        let delimiter = PERMISSION_DELIMITER.to_string();
        format!(
            "{}{}{}",
            PERMISSIONS_POLICY_PREFIX,
            POLICY_SEPARATOR,
            self.permissions.join(delimiter.as_str())
        )
    }
}

/// An operation guarded by any number of [`HasPermissions`] declarations.
///
/// Each declaration is satisfied by any one of its permissions; the
/// operation is allowed only when every declaration is satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProtectedOperation {
    pub name: String,
    pub declarations: Vec<HasPermissions>,
}

impl ProtectedOperation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declarations: Vec::new(),
        }
    }

    pub fn requires(mut self, declaration: HasPermissions) -> Self {
        self.declarations.push(declaration);
        self
    }

    pub fn policy_names(&self) -> Vec<String> {
        self.declarations.iter().map(HasPermissions::policy_name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::parse_policy_name;

    #[test]
    fn test_policy_name_format() {
        let declaration = HasPermissions::new(["Orders.Read", "Orders.Write"]);
        assert_eq!(declaration.policy_name(), "Rbac:Orders.Read,Orders.Write");
    }

    #[test]
    fn test_policy_name_parses_back() {
        let declaration = HasPermissions::new(["Billing.View"]);
        let requirement = parse_policy_name(&declaration.policy_name()).unwrap();
        assert_eq!(requirement.required_permissions(), declaration.permissions());
    }

    #[test]
    fn test_operation_collects_declarations() {
        let operation = ProtectedOperation::new("export_invoices")
            .requires(HasPermissions::new(["Orders.Read"]))
            .requires(HasPermissions::new(["Billing.View"]));

        assert_eq!(
            operation.policy_names(),
            vec!["Rbac:Orders.Read", "Rbac:Billing.View"]
        );
    }
}
