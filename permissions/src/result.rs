//! Structured outcomes for permission writes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable code of a rule violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureCode {
    InvalidPermissionName,
    DuplicatePermissionName,
    ConcurrencyFailure,
}

impl FailureCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCode::InvalidPermissionName => "InvalidPermissionName",
            FailureCode::DuplicatePermissionName => "DuplicatePermissionName",
            FailureCode::ConcurrencyFailure => "ConcurrencyFailure",
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single rule violation with a human-readable description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionFailure {
    pub code: FailureCode,
    pub description: String,
}

impl PermissionFailure {
    pub fn new(code: FailureCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }

    pub fn invalid_name(name: &str) -> Self {
        Self::new(
            FailureCode::InvalidPermissionName,
            format!("Permission name '{}' is invalid.", name),
        )
    }

    pub fn duplicate_name(name: &str) -> Self {
        Self::new(
            FailureCode::DuplicatePermissionName,
            format!("Permission name '{}' is already taken.", name),
        )
    }

    pub fn concurrency() -> Self {
        Self::new(
            FailureCode::ConcurrencyFailure,
            "Optimistic concurrency failure, object has been modified.",
        )
    }
}

/// Outcome of a create, update or delete.
///
/// Callers branch on [`PermissionResult::succeeded`]; a failed result carries
/// every violation found, not just the first one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionResult {
    Success,
    Failed(Vec<PermissionFailure>),
}

impl PermissionResult {
    pub fn failed(failures: Vec<PermissionFailure>) -> Self {
        Self::Failed(failures)
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, PermissionResult::Success)
    }

    pub fn failures(&self) -> &[PermissionFailure] {
        match self {
            PermissionResult::Success => &[],
            PermissionResult::Failed(failures) => failures,
        }
    }

    /// Codes of all failures, in the order they were reported.
    pub fn codes(&self) -> Vec<FailureCode> {
        self.failures().iter().map(|f| f.code).collect()
    }

    pub fn has_code(&self, code: FailureCode) -> bool {
        self.failures().iter().any(|f| f.code == code)
    }
}

impl fmt::Display for PermissionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionResult::Success => f.write_str("Succeeded"),
            PermissionResult::Failed(failures) => {
                let codes: Vec<&str> = failures.iter().map(|e| e.code.as_str()).collect();
                write!(f, "Failed : {}", codes.join(","))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_has_no_failures() {
        let result = PermissionResult::Success;
        assert!(result.succeeded());
        assert!(result.failures().is_empty());
        assert_eq!(result.to_string(), "Succeeded");
    }

    #[test]
    fn test_failed_lists_codes_in_order() {
        let result = PermissionResult::failed(vec![
            PermissionFailure::invalid_name(" "),
            PermissionFailure::duplicate_name("x"),
        ]);
        assert!(!result.succeeded());
        assert_eq!(
            result.codes(),
            vec![
                FailureCode::InvalidPermissionName,
                FailureCode::DuplicatePermissionName
            ]
        );
        assert!(result.has_code(FailureCode::DuplicatePermissionName));
        assert!(!result.has_code(FailureCode::ConcurrencyFailure));
        assert_eq!(
            result.to_string(),
            "Failed : InvalidPermissionName,DuplicatePermissionName"
        );
    }

    #[test]
    fn test_failure_descriptions() {
        assert_eq!(
            PermissionFailure::duplicate_name("Orders.Read").description,
            "Permission name 'Orders.Read' is already taken."
        );
        assert_eq!(
            PermissionFailure::concurrency().code.to_string(),
            "ConcurrencyFailure"
        );
    }

    #[test]
    fn test_json_shape() {
        let result = PermissionResult::failed(vec![PermissionFailure::concurrency()]);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["Failed"][0]["code"], "ConcurrencyFailure");

        let back: PermissionResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
    }
}
