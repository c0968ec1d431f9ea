//! # Error Types
//!
//! Domain-specific error types for factura-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  factura-core errors (this file)                                       │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Field-level input failures                     │
//! │                                                                         │
//! │  factura-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  factura-fiscal errors                                                 │
//! │  └── FiscalError      - What callers of the services see               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → FiscalError → ApiError → client   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::permissions::{Permission, Role};
use crate::validation::ConfigIssues;

// =============================================================================
// Core Error
// =============================================================================

/// Core business rule errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A sequence configuration failed one or more rules.
    ///
    /// ## When This Occurs
    /// - `padding_length` outside 1..=20
    /// - `initial_number` below zero
    /// - prefix/suffix too long or containing control characters
    #[error("Invalid sequence configuration: {0}")]
    InvalidSequenceConfig(ConfigIssues),

    /// The caller's role does not grant the permission.
    #[error("Role {role} is not allowed to {permission}")]
    PermissionDenied { role: Role, permission: Permission },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Each variant names the offending field so it can be reported back to the
/// form that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID, bad characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Name of the field this error refers to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::Negative { field }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ConfigIssue;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "code".to_string(),
        };
        assert_eq!(err.to_string(), "code is required");

        let err = ValidationError::OutOfRange {
            field: "padding_length".to_string(),
            min: 1,
            max: 20,
        };
        assert_eq!(err.to_string(), "padding_length must be between 1 and 20");
        assert_eq!(err.field(), "padding_length");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Negative {
            field: "initial_number".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_invalid_config_lists_every_issue() {
        let err = CoreError::InvalidSequenceConfig(ConfigIssues(vec![
            ConfigIssue::new("padding_length", "must be between 1 and 20"),
            ConfigIssue::new("initial_number", "must not be negative"),
        ]));
        assert_eq!(
            err.to_string(),
            "Invalid sequence configuration: padding_length: must be between 1 and 20; \
             initial_number: must not be negative"
        );
    }

    #[test]
    fn test_permission_denied_message() {
        let err = CoreError::PermissionDenied {
            role: Role::Viewer,
            permission: Permission::ResetSequences,
        };
        assert_eq!(err.to_string(), "Role viewer is not allowed to reset_sequences");
    }
}
