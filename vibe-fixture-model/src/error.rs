//! Error types for corpus construction

use thiserror::Error;

/// Errors raised while building a catalog or corpus.
///
/// Every variant is a construction-time validation failure. A corpus that
/// fails to build is unusable, so callers are expected to abort rather than
/// continue with a partial corpus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A defect kind identifier is not registered in the catalog
    #[error("Unknown defect kind: {id}")]
    UnknownKind {
        id: String,
    },

    /// A defect kind identifier was registered twice
    #[error("Defect kind '{id}' is already registered")]
    DuplicateKind {
        id: String,
    },

    /// A defect kind identifier is not kebab-case
    #[error("Invalid defect kind identifier '{id}': expected kebab-case")]
    InvalidKindId {
        id: String,
    },

    /// Two units in one file share the same name and signature
    #[error("Duplicate unit '{unit}' in file '{file}'")]
    DuplicateUnit {
        file: String,
        unit: String,
    },

    /// A unit repeats a declaration that must be unique
    #[error("Structural collision in '{file}::{unit}': key '{key}' declared more than once")]
    StructuralCollision {
        file: String,
        unit: String,
        key: String,
    },

    /// Suppressed kinds are not a subset of the record's kinds
    #[error("Invalid suppression on '{unit}': '{id}' is not one of the unit's defect kinds")]
    InvalidSuppression {
        unit: String,
        id: String,
    },

    /// Expected detections drop a live kind or name a foreign one
    #[error("Invalid expectation on '{unit}': {reason}")]
    InvalidExpectation {
        unit: String,
        reason: String,
    },

    /// A record names no defect kinds at all
    #[error("Unit '{unit}' does not instantiate any defect kind")]
    EmptyDefectSet {
        unit: String,
    },

    /// Sibling files differ in coverage without a declared reduction
    #[error("Undeclared drift in group '{group}': '{file}' does not cover [{}]", .missing.join(", "))]
    UndeclaredDrift {
        group: String,
        file: String,
        missing: Vec<String>,
    },

    /// A file with the same name is already in the store
    #[error("Duplicate corpus file: {file}")]
    DuplicateFile {
        file: String,
    },

    /// A variant group id is already in use
    #[error("Duplicate variant group: {group}")]
    DuplicateGroup {
        group: String,
    },

    /// A variant group names no member files
    #[error("Variant group '{group}' has no member files")]
    EmptyGroup {
        group: String,
    },

    /// A file name does not resolve in the store
    #[error("Unknown corpus file: {file}")]
    UnknownFile {
        file: String,
    },

    /// A variant group id does not resolve in the store
    #[error("Unknown variant group: {group}")]
    UnknownGroup {
        group: String,
    },
}

impl ModelError {
    /// Creates an unknown kind error
    pub fn unknown_kind<S: Into<String>>(id: S) -> Self {
        Self::UnknownKind { id: id.into() }
    }

    /// Creates a duplicate kind error
    pub fn duplicate_kind<S: Into<String>>(id: S) -> Self {
        Self::DuplicateKind { id: id.into() }
    }

    /// Creates an invalid kind identifier error
    pub fn invalid_kind_id<S: Into<String>>(id: S) -> Self {
        Self::InvalidKindId { id: id.into() }
    }

    /// Creates a duplicate unit error
    pub fn duplicate_unit<S: Into<String>>(file: S, unit: S) -> Self {
        Self::DuplicateUnit {
            file: file.into(),
            unit: unit.into(),
        }
    }

    /// Creates a structural collision error
    pub fn structural_collision<S: Into<String>>(file: S, unit: S, key: S) -> Self {
        Self::StructuralCollision {
            file: file.into(),
            unit: unit.into(),
            key: key.into(),
        }
    }

    /// Creates an invalid suppression error
    pub fn invalid_suppression<S: Into<String>>(unit: S, id: S) -> Self {
        Self::InvalidSuppression {
            unit: unit.into(),
            id: id.into(),
        }
    }

    /// Creates an invalid expectation error
    pub fn invalid_expectation<S: Into<String>>(unit: S, reason: S) -> Self {
        Self::InvalidExpectation {
            unit: unit.into(),
            reason: reason.into(),
        }
    }

    /// Creates an undeclared drift error
    pub fn undeclared_drift<S: Into<String>>(group: S, file: S, missing: Vec<String>) -> Self {
        Self::UndeclaredDrift {
            group: group.into(),
            file: file.into(),
            missing,
        }
    }

    /// Returns the stable error code used in machine-readable output
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownKind { .. } => "UnknownKind",
            Self::DuplicateKind { .. } => "DuplicateKind",
            Self::InvalidKindId { .. } => "InvalidKindId",
            Self::DuplicateUnit { .. } => "DuplicateUnit",
            Self::StructuralCollision { .. } => "StructuralCollision",
            Self::InvalidSuppression { .. } => "InvalidSuppression",
            Self::InvalidExpectation { .. } => "InvalidExpectation",
            Self::EmptyDefectSet { .. } => "EmptyDefectSet",
            Self::UndeclaredDrift { .. } => "UndeclaredDrift",
            Self::DuplicateFile { .. } => "DuplicateFile",
            Self::DuplicateGroup { .. } => "DuplicateGroup",
            Self::EmptyGroup { .. } => "EmptyGroup",
            Self::UnknownFile { .. } => "UnknownFile",
            Self::UnknownGroup { .. } => "UnknownGroup",
        }
    }

    /// Returns a user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownKind { id } => {
                format!("The defect kind '{id}' is not in the catalog. Register it before using it in a fixture.")
            }
            Self::DuplicateKind { id } => {
                format!("The defect kind '{id}' is defined more than once")
            }
            Self::InvalidKindId { id } => {
                format!("'{id}' is not a valid defect kind identifier. Use kebab-case, e.g. 'sql-injection'")
            }
            Self::DuplicateUnit { file, unit } => {
                format!("The unit '{unit}' appears more than once in {file}")
            }
            Self::StructuralCollision { file, unit, key } => {
                format!("The key '{key}' is repeated in {file}::{unit}. Only 'duplicate-key' fixtures may repeat keys")
            }
            Self::InvalidSuppression { unit, id } => {
                format!("The unit '{unit}' suppresses '{id}' but does not exhibit it")
            }
            Self::InvalidExpectation { unit, reason } => {
                format!("The expected detections for '{unit}' are invalid: {reason}")
            }
            Self::EmptyDefectSet { unit } => {
                format!("The unit '{unit}' must exhibit at least one defect kind")
            }
            Self::UndeclaredDrift { group, file, missing } => {
                format!(
                    "Variant '{file}' in group '{group}' silently drops: {}. Declare the reduction explicitly",
                    missing.join(", ")
                )
            }
            Self::DuplicateFile { file } => {
                format!("The corpus already contains a file named {file}")
            }
            Self::DuplicateGroup { group } => {
                format!("The variant group '{group}' is defined more than once")
            }
            Self::EmptyGroup { group } => {
                format!("The variant group '{group}' must list at least one file")
            }
            Self::UnknownFile { file } => {
                format!("Could not find the corpus file: {file}")
            }
            Self::UnknownGroup { group } => {
                format!("Could not find the variant group: {group}")
            }
        }
    }
}

/// Result type for corpus model operations
pub type ModelResult<T> = Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_kind_error() {
        let error = ModelError::unknown_kind("sqli");

        match &error {
            ModelError::UnknownKind { id } => assert_eq!(id, "sqli"),
            _ => panic!("Expected UnknownKind error"),
        }

        assert_eq!(error.code(), "UnknownKind");
        assert!(error.user_message().contains("not in the catalog"));
    }

    #[test]
    fn test_structural_collision_display() {
        let error = ModelError::structural_collision("main.go", "config", "apiKey");
        let display_string = format!("{error}");
        assert!(display_string.contains("main.go::config"));
        assert!(display_string.contains("apiKey"));
    }

    #[test]
    fn test_undeclared_drift_lists_missing_kinds() {
        let error = ModelError::undeclared_drift(
            "go-main",
            "main_reduced.go",
            vec!["duplicate-key".to_string(), "xss".to_string()],
        );

        assert_eq!(
            error.to_string(),
            "Undeclared drift in group 'go-main': 'main_reduced.go' does not cover [duplicate-key, xss]"
        );
        assert!(error.user_message().contains("Declare the reduction"));
    }

    #[test]
    fn test_invalid_suppression_message() {
        let error = ModelError::invalid_suppression("WeakHash", "xss");
        assert_eq!(error.code(), "InvalidSuppression");
        assert!(error.user_message().contains("does not exhibit"));
    }
}
