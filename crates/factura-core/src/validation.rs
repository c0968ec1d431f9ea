//! # Validation Module
//!
//! Input validation for sequence configurations and document types.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Front-end form                                               │
//! │  └── Calls POST /sequences/validate for live feedback                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Sequence Manager (Rust)                                      │
//! │  └── THIS MODULE: rejects the write with every issue found             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on padding/initial number                       │
//! │  ├── Partial UNIQUE index (one active sequence per type)               │
//! │  └── Foreign key RESTRICT (no delete while in use)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Single-field validators return the first [`ValidationError`]. Whole-config
//! checks never fail; they collect a [`ConfigIssue`] per broken rule.

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::SequenceConfig;
use crate::{
    MAX_AFFIX_LENGTH, MAX_DOCUMENT_TYPE_CODE_LENGTH, MAX_DOCUMENT_TYPE_NAME_LENGTH,
    MAX_PADDING_LENGTH, MAX_SEQUENCE_NUMBER,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Config Issues
// =============================================================================

/// One broken rule in a sequence configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ConfigIssue {
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigIssue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<ValidationError> for ConfigIssue {
    fn from(err: ValidationError) -> Self {
        let field = err.field().to_string();
        // Display already starts with the field name; keep only the rule.
        let full = err.to_string();
        let message = full
            .strip_prefix(field.as_str())
            .map(str::trim_start)
            .unwrap_or(full.as_str())
            .to_string();
        ConfigIssue { field, message }
    }
}

/// A non-empty list of issues, carried by [`CoreError::InvalidSequenceConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssues(pub Vec<ConfigIssue>);

impl fmt::Display for ConfigIssues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", issue.field, issue.message)?;
        }
        Ok(())
    }
}

// =============================================================================
// Sequence Field Validators
// =============================================================================

fn validate_affix(field: &str, value: &str) -> ValidationResult<()> {
    if value.chars().count() > MAX_AFFIX_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_AFFIX_LENGTH,
        });
    }

    if value.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not contain control characters".to_string(),
        });
    }

    Ok(())
}

/// Validates a sequence prefix. Empty is allowed.
///
/// ## Example
/// ```rust
/// use factura_core::validation::validate_prefix;
///
/// assert!(validate_prefix("B01-").is_ok());
/// assert!(validate_prefix("").is_ok());
/// assert!(validate_prefix("tab\there").is_err());
/// ```
pub fn validate_prefix(prefix: &str) -> ValidationResult<()> {
    validate_affix("prefix", prefix)
}

/// Validates a sequence suffix. Empty is allowed.
pub fn validate_suffix(suffix: &str) -> ValidationResult<()> {
    validate_affix("suffix", suffix)
}

/// Validates the minimum digit width.
///
/// ## Rules
/// - Must be at least 1
/// - Must not exceed MAX_PADDING_LENGTH (20)
pub fn validate_padding_length(padding_length: i64) -> ValidationResult<()> {
    if !(1..=MAX_PADDING_LENGTH).contains(&padding_length) {
        return Err(ValidationError::OutOfRange {
            field: "padding_length".to_string(),
            min: 1,
            max: MAX_PADDING_LENGTH,
        });
    }

    Ok(())
}

/// Validates the starting number of a sequence.
///
/// ## Rules
/// - Zero is allowed, negatives are not
/// - Must not exceed MAX_SEQUENCE_NUMBER, so the counter can move past it
pub fn validate_initial_number(initial_number: i64) -> ValidationResult<()> {
    if initial_number < 0 {
        return Err(ValidationError::Negative {
            field: "initial_number".to_string(),
        });
    }

    if initial_number > MAX_SEQUENCE_NUMBER {
        return Err(ValidationError::OutOfRange {
            field: "initial_number".to_string(),
            min: 0,
            max: MAX_SEQUENCE_NUMBER,
        });
    }

    Ok(())
}

// =============================================================================
// Document Type Validators
// =============================================================================

/// Validates a document type code such as `B01` or `QUOTE`.
///
/// ## Rules
/// - Must not be empty
/// - At most 20 characters
/// - Only ASCII letters, digits, hyphens, underscores
///
/// ## Example
/// ```rust
/// use factura_core::validation::validate_document_type_code;
///
/// assert!(validate_document_type_code("B01").is_ok());
/// assert!(validate_document_type_code("").is_err());
/// assert!(validate_document_type_code("B 01").is_err());
/// ```
pub fn validate_document_type_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() > MAX_DOCUMENT_TYPE_CODE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_DOCUMENT_TYPE_CODE_LENGTH,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a document type display name.
pub fn validate_document_type_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_DOCUMENT_TYPE_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_DOCUMENT_TYPE_NAME_LENGTH,
        });
    }

    Ok(())
}

/// Validates that a string is a UUID.
pub fn validate_uuid(field: &str, value: &str) -> ValidationResult<()> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a valid UUID".to_string(),
        })
}

// =============================================================================
// Whole-Config Validation
// =============================================================================

/// Checks every rule of a sequence configuration.
///
/// Returns an empty list when the configuration is valid. Never fails.
///
/// ## Example
/// ```rust
/// use factura_core::types::SequenceConfig;
/// use factura_core::validation::validate_sequence_config;
///
/// let mut config = SequenceConfig::default();
/// assert!(validate_sequence_config(&config).is_empty());
///
/// config.padding_length = 0;
/// config.initial_number = -1;
/// assert_eq!(validate_sequence_config(&config).len(), 2);
/// ```
pub fn validate_sequence_config(config: &SequenceConfig) -> Vec<ConfigIssue> {
    [
        validate_prefix(&config.prefix),
        validate_suffix(&config.suffix),
        validate_initial_number(config.initial_number),
        validate_padding_length(config.padding_length),
    ]
    .into_iter()
    .filter_map(Result::err)
    .map(ConfigIssue::from)
    .collect()
}

/// Like [`validate_sequence_config`], but turns issues into an error.
pub fn ensure_valid_config(config: &SequenceConfig) -> CoreResult<()> {
    let issues = validate_sequence_config(config);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(CoreError::InvalidSequenceConfig(ConfigIssues(issues)))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SequenceConfig {
        SequenceConfig {
            prefix: "B01-".to_string(),
            suffix: String::new(),
            initial_number: 1,
            padding_length: 8,
            is_active: true,
        }
    }

    #[test]
    fn test_valid_config_has_no_issues() {
        assert!(validate_sequence_config(&config()).is_empty());
        assert!(ensure_valid_config(&config()).is_ok());
    }

    #[test]
    fn test_padding_bounds() {
        assert!(validate_padding_length(1).is_ok());
        assert!(validate_padding_length(20).is_ok());
        assert!(validate_padding_length(0).is_err());
        assert!(validate_padding_length(21).is_err());
    }

    #[test]
    fn test_initial_number_zero_allowed() {
        assert!(validate_initial_number(0).is_ok());
        assert!(validate_initial_number(-5).is_err());
    }

    #[test]
    fn test_initial_number_leaves_room_to_increment() {
        assert!(validate_initial_number(MAX_SEQUENCE_NUMBER).is_ok());
        assert!(matches!(
            validate_initial_number(i64::MAX),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_affix_rules() {
        assert!(validate_prefix(&"X".repeat(20)).is_ok());
        assert!(validate_prefix(&"X".repeat(21)).is_err());
        assert!(validate_suffix("ñ-Ü").is_ok());
        assert!(validate_suffix("a\nb").is_err());
    }

    #[test]
    fn test_collects_every_issue() {
        let mut cfg = config();
        cfg.prefix = "P".repeat(30);
        cfg.padding_length = 0;
        cfg.initial_number = -1;

        let issues = validate_sequence_config(&cfg);
        let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["prefix", "initial_number", "padding_length"]);
        assert_eq!(issues[2].message, "must be between 1 and 20");

        match ensure_valid_config(&cfg) {
            Err(CoreError::InvalidSequenceConfig(ConfigIssues(list))) => assert_eq!(list.len(), 3),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_document_type_code() {
        assert!(validate_document_type_code("QUOTE").is_ok());
        assert!(validate_document_type_code("B_01-x").is_ok());
        assert!(validate_document_type_code("   ").is_err());
        assert!(validate_document_type_code(&"A".repeat(21)).is_err());
        assert!(validate_document_type_code("B01!").is_err());
    }

    #[test]
    fn test_document_type_name() {
        assert!(validate_document_type_name("Crédito Fiscal").is_ok());
        assert!(validate_document_type_name("").is_err());
        assert!(validate_document_type_name(&"n".repeat(101)).is_err());
    }

    #[test]
    fn test_uuid() {
        assert!(validate_uuid("id", "6f1c7a52-3f4e-4d8a-9b9a-2f0f5e2c1d11").is_ok());
        assert!(validate_uuid("id", "not-a-uuid").is_err());
    }
}
