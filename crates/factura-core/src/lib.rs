//! # factura-core: Pure Fiscal Numbering Logic for FacturaSaaS
//!
//! This crate holds the domain model of the fiscal sequence generator as
//! pure functions and plain types with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     FacturaSaaS Fiscal Core                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  apps/api (axum handlers)                       │   │
//! │  │   create sequence ─► allocate ─► issue document ─► validate     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │           factura-fiscal (Manager, Allocator, Validator)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ factura-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  ┌───────────┐ ┌───────────┐ ┌────────────┐ ┌─────────────┐    │   │
//! │  │  │   types   │ │ numbering │ │ validation │ │ permissions │    │   │
//! │  │  │ Sequence  │ │  preview  │ │  config    │ │ Role table  │    │   │
//! │  │  │ DocType   │ │  zero_pad │ │  issues    │ │             │    │   │
//! │  │  └───────────┘ └───────────┘ └────────────┘ └─────────────┘    │   │
//! │  │                                                                 │   │
//! │  │  NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                factura-db (Database Layer)                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (FiscalSequence, DocumentType, FiscalDocument, ...)
//! - [`numbering`] - Fiscal number formatting (`prefix + zero-padded + suffix`)
//! - [`validation`] - Sequence configuration rules
//! - [`permissions`] - Role → permission lookup table
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use factura_core::numbering::preview_fiscal_number;
//!
//! assert_eq!(preview_fiscal_number("B01-", "", 5, 4), "B01-0005");
//! assert_eq!(preview_fiscal_number("B01-", "", 123, 2), "B01-123");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod numbering;
pub mod permissions;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use permissions::{Permission, Role};
pub use types::*;
pub use validation::{ConfigIssue, ConfigIssues};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Initial number used when a sequence is created without one.
///
/// `current_number` holds the next number to issue, so a fresh sequence with
/// this default issues `1` first.
pub const DEFAULT_INITIAL_NUMBER: i64 = 1;

/// Default minimum digit width of the numeric part.
pub const DEFAULT_PADDING_LENGTH: i64 = 8;

/// Largest accepted padding. An `i64` never needs more than 19 digits.
pub const MAX_PADDING_LENGTH: i64 = 20;

/// Largest number a sequence can issue.
///
/// Issuing it leaves the counter at `i64::MAX`, after which the sequence is
/// exhausted and must be reset or replaced.
pub const MAX_SEQUENCE_NUMBER: i64 = i64::MAX - 1;

/// Maximum length of a sequence prefix or suffix, in characters.
pub const MAX_AFFIX_LENGTH: usize = 20;

/// Maximum length of a document type code (e.g. "B01").
pub const MAX_DOCUMENT_TYPE_CODE_LENGTH: usize = 20;

/// Maximum length of a document type display name.
pub const MAX_DOCUMENT_TYPE_NAME_LENGTH: usize = 100;

/// Front-end path where fiscal sequences are configured.
///
/// The validator suggests this as a redirect target when document creation
/// must be blocked.
pub const SEQUENCE_SETTINGS_PATH: &str = "/settings/fiscal-sequences";
