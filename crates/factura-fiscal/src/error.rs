//! # Fiscal Error Types
//!
//! The error every fiscal service returns.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Fiscal Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────┐  ┌─────────────────────┐ │
//! │  │   Validation    │  │      Conflict       │  │    Precondition     │ │
//! │  │                 │  │                     │  │                     │ │
//! │  │  bad padding    │  │  DuplicateActive    │  │  NoActiveSequence   │ │
//! │  │  bad prefix     │  │  SequenceInUse      │  │  SequenceInactive   │ │
//! │  │  bad code       │  │  duplicate code     │  │  (+ redirect_url)   │ │
//! │  └─────────────────┘  └─────────────────────┘  └─────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────┐  ┌─────────────────────┐ │
//! │  │    NotFound     │  │     Transient       │  │      Internal       │ │
//! │  │   Forbidden     │  │  db locked, pool    │  │  store, config      │ │
//! │  │                 │  │  timeout (retried)  │  │                     │ │
//! │  └─────────────────┘  └─────────────────────┘  └─────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use factura_core::{ConfigIssue, ConfigIssues, CoreError, Permission, Role, ValidationError};
use factura_db::DbError;
use thiserror::Error;

/// Result type alias for fiscal operations.
pub type FiscalResult<T> = Result<T, FiscalError>;

/// Coarse category of a [`FiscalError`], used for HTTP mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Precondition,
    NotFound,
    Forbidden,
    Transient,
    Internal,
}

#[derive(Debug, Error)]
pub enum FiscalError {
    // =========================================================================
    // Validation
    // =========================================================================
    #[error("Validation failed: {0}")]
    Validation(ConfigIssues),

    // =========================================================================
    // Conflicts
    // =========================================================================
    /// Another active sequence exists for the document type.
    #[error("Document type {document_type_id} already has an active sequence")]
    DuplicateActiveSequence { document_type_id: String },

    /// Documents reference the sequence, so it cannot be deleted.
    #[error("Sequence {sequence_id} is used by {documents} document(s) and cannot be deleted")]
    SequenceInUse { sequence_id: String, documents: i64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    // =========================================================================
    // Preconditions
    // =========================================================================
    /// Documents of this type cannot be created until a sequence is active.
    #[error("No active fiscal sequence for document type {document_type_id}")]
    NoActiveSequence {
        document_type_id: String,
        redirect_url: String,
    },

    #[error("Fiscal sequence {sequence_id} is not active")]
    SequenceInactive {
        sequence_id: String,
        redirect_url: String,
    },

    /// The sequence has issued its last representable number.
    #[error("Fiscal sequence {sequence_id} has no numbers left")]
    SequenceExhausted {
        sequence_id: String,
        redirect_url: String,
    },

    // =========================================================================
    // Lookup / Access
    // =========================================================================
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Role {role} is not allowed to {permission}")]
    PermissionDenied { role: Role, permission: Permission },

    // =========================================================================
    // Infrastructure
    // =========================================================================
    /// The store stayed busy past the retry budget. Nothing was committed.
    #[error("Fiscal store temporarily unavailable: {0}")]
    TransientStore(String),

    #[error("Store error: {0}")]
    Store(DbError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FiscalError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        FiscalError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// A single-field validation failure.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        FiscalError::Validation(ConfigIssues(vec![ConfigIssue::new(field, message)]))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FiscalError::Validation(_) => ErrorKind::Validation,
            FiscalError::DuplicateActiveSequence { .. }
            | FiscalError::SequenceInUse { .. }
            | FiscalError::Conflict(_) => ErrorKind::Conflict,
            FiscalError::NoActiveSequence { .. }
            | FiscalError::SequenceInactive { .. }
            | FiscalError::SequenceExhausted { .. } => ErrorKind::Precondition,
            FiscalError::NotFound { .. } => ErrorKind::NotFound,
            FiscalError::PermissionDenied { .. } => ErrorKind::Forbidden,
            FiscalError::TransientStore(_) => ErrorKind::Transient,
            FiscalError::Store(_) | FiscalError::Config(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FiscalError::TransientStore(_))
    }

    /// Where the user can fix a blocking precondition.
    pub fn redirect_url(&self) -> Option<&str> {
        match self {
            FiscalError::NoActiveSequence { redirect_url, .. }
            | FiscalError::SequenceInactive { redirect_url, .. }
            | FiscalError::SequenceExhausted { redirect_url, .. } => Some(redirect_url),
            _ => None,
        }
    }

    /// Validation issues, if this is a validation error.
    pub fn issues(&self) -> &[ConfigIssue] {
        match self {
            FiscalError::Validation(ConfigIssues(issues)) => issues,
            _ => &[],
        }
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<DbError> for FiscalError {
    fn from(err: DbError) -> Self {
        if err.is_transient() {
            return FiscalError::TransientStore(err.to_string());
        }
        match err {
            DbError::NotFound { entity, id } => FiscalError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => {
                FiscalError::Conflict(format!("{} '{}' already exists", field, value))
            }
            other => FiscalError::Store(other),
        }
    }
}

impl From<CoreError> for FiscalError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidSequenceConfig(issues) => FiscalError::Validation(issues),
            CoreError::PermissionDenied { role, permission } => {
                FiscalError::PermissionDenied { role, permission }
            }
            CoreError::Validation(v) => v.into(),
        }
    }
}

impl From<ValidationError> for FiscalError {
    fn from(err: ValidationError) -> Self {
        FiscalError::Validation(ConfigIssues(vec![err.into()]))
    }
}

impl From<std::io::Error> for FiscalError {
    fn from(err: std::io::Error) -> Self {
        FiscalError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for FiscalError {
    fn from(err: toml::de::Error) -> Self {
        FiscalError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_db_errors_become_retryable() {
        let err: FiscalError = DbError::Busy("database is locked".into()).into();
        assert!(err.is_retryable());
        assert_eq!(err.kind(), ErrorKind::Transient);

        let err: FiscalError = DbError::QueryFailed("syntax".into()).into();
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_db_not_found_keeps_entity() {
        let err: FiscalError = DbError::not_found("FiscalSequence", "abc").into();
        assert_eq!(err.to_string(), "FiscalSequence not found: abc");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_precondition_carries_redirect() {
        let err = FiscalError::NoActiveSequence {
            document_type_id: "dt".into(),
            redirect_url: "/settings/fiscal-sequences?document_type=dt".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(
            err.redirect_url(),
            Some("/settings/fiscal-sequences?document_type=dt")
        );
        assert!(FiscalError::Conflict("x".into()).redirect_url().is_none());
    }

    #[test]
    fn test_core_errors_convert() {
        let err: FiscalError = CoreError::PermissionDenied {
            role: Role::Seller,
            permission: Permission::ResetSequences,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err: FiscalError = ValidationError::Negative {
            field: "initial_number".into(),
        }
        .into();
        assert_eq!(err.issues()[0].field, "initial_number");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
