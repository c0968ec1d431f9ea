//! # Domain Types
//!
//! Core domain types used throughout FacturaSaaS fiscal numbering.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌─────────────────┐      │
//! │  │  DocumentType   │   │  FiscalSequence  │   │ FiscalDocument  │      │
//! │  │  ─────────────  │   │  ──────────────  │   │  ─────────────  │      │
//! │  │  id (UUID)      │◄──│  document_type_id│◄──│  sequence_id    │      │
//! │  │  code "B01"     │ 1 │  prefix / suffix │ 1 │  number         │      │
//! │  │  category       │ : │  current_number  │ : │  fiscal_number  │      │
//! │  │                 │ N │  is_active       │ N │                 │      │
//! │  └─────────────────┘   └──────────────────┘   └─────────────────┘      │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐      │
//! │  │ SequenceConfig   │  │ SequenceState    │  │ SequenceValidation│     │
//! │  │ (create input)   │  │ Unconfigured     │  │ is_valid          │     │
//! │  │ SequencePatch    │  │ Configured       │  │ missing_sequences │     │
//! │  │ (update input)   │  │ Active           │  │ redirect_url      │     │
//! │  └──────────────────┘  └──────────────────┘  └──────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Counter Convention
//! `current_number` is the NEXT number to be issued. Allocation returns it
//! and stores `current_number + 1`. A fresh sequence starts with
//! `current_number = initial_number`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::numbering::preview_fiscal_number;
use crate::{DEFAULT_INITIAL_NUMBER, DEFAULT_PADDING_LENGTH};

// =============================================================================
// Document Category
// =============================================================================

/// Broad family a document type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Invoice,
    CreditNote,
    DebitNote,
    Quote,
    Receipt,
}

impl DocumentCategory {
    /// Categories checked by the invoice validation scope.
    pub const INVOICING: &'static [DocumentCategory] = &[
        DocumentCategory::Invoice,
        DocumentCategory::CreditNote,
        DocumentCategory::DebitNote,
    ];

    /// Categories checked by the quote validation scope.
    pub const QUOTING: &'static [DocumentCategory] = &[DocumentCategory::Quote];

    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::Invoice => "invoice",
            DocumentCategory::CreditNote => "credit_note",
            DocumentCategory::DebitNote => "debit_note",
            DocumentCategory::Quote => "quote",
            DocumentCategory::Receipt => "receipt",
        }
    }

    /// Invoices and the notes that amend them.
    pub fn is_invoice(&self) -> bool {
        Self::INVOICING.contains(self)
    }

    pub fn is_quote(&self) -> bool {
        matches!(self, DocumentCategory::Quote)
    }
}

// =============================================================================
// Document Type
// =============================================================================

/// A kind of fiscal document an organization can issue (e.g. `B01`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DocumentType {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this document type belongs to.
    pub organization_id: String,

    /// Short business code, unique per organization ("B01", "QUOTE").
    pub code: String,

    /// Display name ("Crédito Fiscal").
    pub name: String,

    pub category: DocumentCategory,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Entry of the default document type catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentTypeTemplate {
    pub code: &'static str,
    pub name: &'static str,
    pub category: DocumentCategory,
}

/// Document types registered for a new organization.
pub const DEFAULT_DOCUMENT_TYPES: &[DocumentTypeTemplate] = &[
    DocumentTypeTemplate {
        code: "B01",
        name: "Crédito Fiscal",
        category: DocumentCategory::Invoice,
    },
    DocumentTypeTemplate {
        code: "B02",
        name: "Consumo",
        category: DocumentCategory::Invoice,
    },
    DocumentTypeTemplate {
        code: "B04",
        name: "Nota de Crédito",
        category: DocumentCategory::CreditNote,
    },
    DocumentTypeTemplate {
        code: "B14",
        name: "Regímenes Especiales",
        category: DocumentCategory::Invoice,
    },
    DocumentTypeTemplate {
        code: "B15",
        name: "Gubernamental",
        category: DocumentCategory::Invoice,
    },
    DocumentTypeTemplate {
        code: "QUOTE",
        name: "Cotización",
        category: DocumentCategory::Quote,
    },
];

// =============================================================================
// Fiscal Sequence
// =============================================================================

/// A per-organization, per-document-type counter plus its formatting rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct FiscalSequence {
    pub id: String,
    pub organization_id: String,
    pub document_type_id: String,

    /// Text placed before the digits. May be empty.
    pub prefix: String,

    /// Text placed after the digits. May be empty.
    pub suffix: String,

    /// Value restored by a reset.
    pub initial_number: i64,

    /// Next number to be issued.
    pub current_number: i64,

    /// Minimum digit width of the numeric part.
    pub padding_length: i64,

    /// Only active sequences can be allocated from.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl FiscalSequence {
    /// Formats `number` with this sequence's prefix, suffix and padding.
    pub fn format_number(&self, number: i64) -> String {
        preview_fiscal_number(&self.prefix, &self.suffix, number, self.padding_length)
    }

    /// The fiscal number the next allocation will return.
    pub fn next_fiscal_number(&self) -> String {
        self.format_number(self.current_number)
    }

    /// How many numbers have been handed out since creation or last reset.
    pub fn numbers_allocated(&self) -> i64 {
        (self.current_number - self.initial_number).max(0)
    }

    /// The configuration view of this sequence.
    pub fn config(&self) -> SequenceConfig {
        SequenceConfig {
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
            initial_number: self.initial_number,
            padding_length: self.padding_length,
            is_active: self.is_active,
        }
    }

    /// Overwrites the fields present in `patch`.
    pub fn apply_patch(&mut self, patch: &SequencePatch) {
        if let Some(prefix) = &patch.prefix {
            self.prefix = prefix.clone();
        }
        if let Some(suffix) = &patch.suffix {
            self.suffix = suffix.clone();
        }
        if let Some(padding_length) = patch.padding_length {
            self.padding_length = padding_length;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
    }
}

// =============================================================================
// Sequence Inputs
// =============================================================================

/// Configuration used to create a sequence.
///
/// Missing prefix/suffix default to empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SequenceConfig {
    #[serde(default)]
    pub prefix: String,

    #[serde(default)]
    pub suffix: String,

    #[serde(default = "default_initial_number")]
    pub initial_number: i64,

    #[serde(default = "default_padding_length")]
    pub padding_length: i64,

    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

fn default_initial_number() -> i64 {
    DEFAULT_INITIAL_NUMBER
}

fn default_padding_length() -> i64 {
    DEFAULT_PADDING_LENGTH
}

fn default_is_active() -> bool {
    true
}

impl Default for SequenceConfig {
    fn default() -> Self {
        SequenceConfig {
            prefix: String::new(),
            suffix: String::new(),
            initial_number: default_initial_number(),
            padding_length: default_padding_length(),
            is_active: default_is_active(),
        }
    }
}

/// Partial update of a sequence.
///
/// There is deliberately no counter field: the counter is only moved by
/// allocation and reset. Unknown fields are rejected when deserializing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct SequencePatch {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub padding_length: Option<i64>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl SequencePatch {
    pub fn is_empty(&self) -> bool {
        self.prefix.is_none()
            && self.suffix.is_none()
            && self.padding_length.is_none()
            && self.is_active.is_none()
    }
}

// =============================================================================
// Allocation & Stats
// =============================================================================

/// A number handed out by the allocator. Once returned it is consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AllocatedNumber {
    pub sequence_id: String,
    pub document_type_id: String,
    pub number: i64,
    pub fiscal_number: String,
}

/// Read-only usage figures for one sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SequenceStats {
    pub sequence_id: String,
    pub document_type_id: String,
    pub is_active: bool,
    pub initial_number: i64,
    pub current_number: i64,
    /// `current_number - initial_number`, including numbers never used by a document.
    pub numbers_allocated: i64,
    /// Documents stored against this sequence.
    pub documents_issued: i64,
    #[ts(as = "Option<String>")]
    pub last_issued_at: Option<DateTime<Utc>>,
    pub last_fiscal_number: Option<String>,
    pub next_fiscal_number: String,
}

// =============================================================================
// Sequence State
// =============================================================================

/// Where a document type stands with respect to numbering.
///
/// ```text
///                 create(inactive)            activate
///  Unconfigured ─────────────────► Configured ─────────► Active
///       ▲         create(active)       ▲      ◄───────── │
///       │ ────────────────────────────────────────────► │
///       │                             deactivate         │
///       └──────────────── delete last sequence ──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SequenceState {
    /// No sequence exists for the document type.
    Unconfigured,
    /// Sequences exist but none is active.
    Configured,
    /// Exactly one active sequence exists.
    Active,
}

impl SequenceState {
    /// Derives the state from every sequence of one document type.
    pub fn from_sequences(sequences: &[FiscalSequence]) -> Self {
        if sequences.is_empty() {
            SequenceState::Unconfigured
        } else if sequences.iter().any(|s| s.is_active) {
            SequenceState::Active
        } else {
            SequenceState::Configured
        }
    }

    pub fn allows_allocation(&self) -> bool {
        matches!(self, SequenceState::Active)
    }
}

// =============================================================================
// Validation Result
// =============================================================================

/// Why a document type cannot be issued right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    /// No sequence at all.
    NoSequence,
    /// Sequences exist but none is active.
    Inactive,
    /// The active sequence fails configuration rules.
    InvalidConfiguration,
}

/// A document type lacking a usable sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MissingSequence {
    pub document_type_id: String,
    pub code: String,
    pub name: String,
    pub reason: MissingReason,
}

/// Outcome of checking whether documents can be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SequenceValidation {
    pub is_valid: bool,
    pub message: String,
    pub missing_sequences: Vec<MissingSequence>,
    /// Where to send the user to fix the configuration. Only set when invalid.
    pub redirect_url: Option<String>,
}

impl SequenceValidation {
    pub fn valid(message: impl Into<String>) -> Self {
        SequenceValidation {
            is_valid: true,
            message: message.into(),
            missing_sequences: Vec::new(),
            redirect_url: None,
        }
    }

    pub fn invalid(
        message: impl Into<String>,
        missing_sequences: Vec<MissingSequence>,
        redirect_url: impl Into<String>,
    ) -> Self {
        SequenceValidation {
            is_valid: false,
            message: message.into(),
            missing_sequences,
            redirect_url: Some(redirect_url.into()),
        }
    }
}

// =============================================================================
// Fiscal Document
// =============================================================================

/// A stored document that consumed a fiscal number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct FiscalDocument {
    pub id: String,
    pub organization_id: String,
    pub document_type_id: String,
    pub sequence_id: String,
    pub number: i64,
    pub fiscal_number: String,
    /// Id of the invoice/quote in the surrounding application.
    pub reference: Option<String>,
    /// User who issued the document.
    pub issued_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Audit Trail
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Created,
    Updated,
    Reset,
    Deleted,
}

/// One administrative change to a sequence.
///
/// `sequence_id` is not a foreign key, so entries outlive the sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SequenceAuditEntry {
    pub id: String,
    pub organization_id: String,
    pub sequence_id: String,
    pub action: AuditAction,
    pub previous_number: Option<i64>,
    pub new_number: Option<i64>,
    pub actor: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Tenancy
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A user's role in one organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Membership {
    pub organization_id: String,
    pub organization_name: String,
    pub user_id: String,
    pub role: crate::permissions::Role,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(current: i64, active: bool) -> FiscalSequence {
        let now = Utc::now();
        FiscalSequence {
            id: "seq-1".to_string(),
            organization_id: "org-1".to_string(),
            document_type_id: "dt-1".to_string(),
            prefix: "B01-".to_string(),
            suffix: String::new(),
            initial_number: 1,
            current_number: current,
            padding_length: 8,
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_next_fiscal_number_uses_current() {
        let seq = sequence(42, true);
        assert_eq!(seq.next_fiscal_number(), "B01-00000042");
        assert_eq!(seq.numbers_allocated(), 41);
    }

    #[test]
    fn test_apply_patch_leaves_counter_alone() {
        let mut seq = sequence(10, true);
        seq.apply_patch(&SequencePatch {
            prefix: Some("E31-".to_string()),
            padding_length: Some(4),
            is_active: Some(false),
            ..Default::default()
        });
        assert_eq!(seq.next_fiscal_number(), "E31-0010");
        assert!(!seq.is_active);
        assert_eq!(seq.current_number, 10);
    }

    #[test]
    fn test_patch_rejects_counter_field() {
        let result: Result<SequencePatch, _> =
            serde_json::from_str(r#"{"prefix":"X","current_number":1}"#);
        assert!(result.is_err());

        let patch: SequencePatch = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_config_defaults() {
        let config: SequenceConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SequenceConfig::default());
        assert_eq!(config.initial_number, DEFAULT_INITIAL_NUMBER);
        assert_eq!(config.padding_length, DEFAULT_PADDING_LENGTH);
        assert!(config.prefix.is_empty());
        assert!(config.is_active);
    }

    #[test]
    fn test_sequence_state() {
        assert_eq!(SequenceState::from_sequences(&[]), SequenceState::Unconfigured);
        assert_eq!(
            SequenceState::from_sequences(&[sequence(1, false)]),
            SequenceState::Configured
        );
        let state = SequenceState::from_sequences(&[sequence(1, false), sequence(5, true)]);
        assert_eq!(state, SequenceState::Active);
        assert!(state.allows_allocation());
        assert!(!SequenceState::Configured.allows_allocation());
    }

    #[test]
    fn test_category_scopes() {
        assert!(DocumentCategory::CreditNote.is_invoice());
        assert!(!DocumentCategory::Quote.is_invoice());
        assert!(DocumentCategory::Quote.is_quote());
        assert!(!DocumentCategory::Receipt.is_invoice());
    }

    #[test]
    fn test_default_catalogue_codes_are_unique() {
        let mut codes: Vec<&str> = DEFAULT_DOCUMENT_TYPES.iter().map(|t| t.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), DEFAULT_DOCUMENT_TYPES.len());
    }
}
