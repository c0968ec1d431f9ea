//! # factura-fiscal: Fiscal Sequence Services for FacturaSaaS
//!
//! Business services on top of `factura-db`: sequence administration,
//! number allocation, readiness checks and document issuing.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         FiscalServices                                  │
//! │                                                                         │
//! │  ┌────────────────────┐  ┌────────────────────┐  ┌──────────────────┐  │
//! │  │ DocumentTypeRegistry│ │  SequenceManager   │  │ SequenceValidator│  │
//! │  │                    │  │                    │  │                  │  │
//! │  │ B01, B02, QUOTE... │  │ create / update    │  │ can X be issued? │  │
//! │  │ register defaults  │  │ reset / delete     │  │ redirect_url     │  │
//! │  └────────────────────┘  │ stats / audit      │  └────────┬─────────┘  │
//! │                          └────────────────────┘           │            │
//! │                                                           ▼            │
//! │  ┌────────────────────┐                        ┌──────────────────┐   │
//! │  │ SequenceAllocator  │ ◄───────────────────── │  DocumentIssuer  │   │
//! │  │ atomic next number │                        │ validate →       │   │
//! │  │ bounded retry      │                        │ allocate → store │   │
//! │  └────────────────────┘                        └──────────────────┘   │
//! │                                                                         │
//! │  Counters live only in SQLite. The services hold no mutable state and  │
//! │  are cheap to clone into every request.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - TOML + environment configuration
//! - [`error`] - `FiscalError` and its HTTP-facing categories
//! - [`registry`] - Document type catalog
//! - [`manager`] - Sequence lifecycle
//! - [`allocator`] - Number allocation
//! - [`validator`] - Readiness checks
//! - [`documents`] - Document issuing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use factura_db::{Database, DbConfig};
//! use factura_fiscal::{FiscalConfig, FiscalServices};
//!
//! let db = Database::new(DbConfig::new("./factura.db")).await?;
//! let fiscal = FiscalServices::new(db, FiscalConfig::load_or_default(None));
//!
//! let number = fiscal.allocator().allocate(&org_id, &document_type_id).await?;
//! println!("Issued {}", number.fiscal_number);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocator;
pub mod config;
pub mod documents;
pub mod error;
pub mod manager;
pub mod registry;
pub mod validator;

// =============================================================================
// Re-exports
// =============================================================================

pub use allocator::SequenceAllocator;
pub use config::{AllocationSettings, FiscalConfig, SequenceDraft, SequenceSettings, ValidationSettings};
pub use documents::DocumentIssuer;
pub use error::{ErrorKind, FiscalError, FiscalResult};
pub use manager::SequenceManager;
pub use registry::DocumentTypeRegistry;
pub use validator::SequenceValidator;

use factura_db::Database;

/// Every fiscal service, built once from a database handle and config.
#[derive(Debug, Clone)]
pub struct FiscalServices {
    db: Database,
    config: FiscalConfig,
    registry: DocumentTypeRegistry,
    manager: SequenceManager,
    allocator: SequenceAllocator,
    validator: SequenceValidator,
    issuer: DocumentIssuer,
}

impl FiscalServices {
    pub fn new(db: Database, config: FiscalConfig) -> Self {
        let validator = SequenceValidator::new(&db, config.validation.clone());
        let allocator = SequenceAllocator::new(&db, config.allocation.clone(), config.validation.clone());
        let issuer = DocumentIssuer::new(&db, validator.clone(), allocator.clone());

        FiscalServices {
            registry: DocumentTypeRegistry::new(db.document_types()),
            manager: SequenceManager::new(&db),
            allocator,
            validator,
            issuer,
            config,
            db,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &FiscalConfig {
        &self.config
    }

    pub fn registry(&self) -> &DocumentTypeRegistry {
        &self.registry
    }

    pub fn manager(&self) -> &SequenceManager {
        &self.manager
    }

    pub fn allocator(&self) -> &SequenceAllocator {
        &self.allocator
    }

    pub fn validator(&self) -> &SequenceValidator {
        &self.validator
    }

    pub fn issuer(&self) -> &DocumentIssuer {
        &self.issuer
    }
}

// =============================================================================
// End-to-end Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use factura_core::{DocumentCategory, SequenceConfig, SequencePatch};
    use factura_db::DbConfig;

    async fn services() -> (FiscalServices, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let org = db.organizations().create("Acme").await.unwrap().id;
        (FiscalServices::new(db, FiscalConfig::default()), org)
    }

    #[tokio::test]
    async fn test_create_allocate_deactivate() {
        let (fiscal, org) = services().await;
        let dt = fiscal
            .registry()
            .register(&org, "FACT", "Factura", DocumentCategory::Invoice)
            .await
            .unwrap();

        let sequence = fiscal
            .manager()
            .create_sequence(
                &org,
                &dt.id,
                &SequenceConfig {
                    prefix: "FACT-".into(),
                    padding_length: 4,
                    initial_number: 1,
                    ..SequenceConfig::default()
                },
                Some("owner"),
            )
            .await
            .unwrap();

        let first = fiscal.allocator().allocate(&org, &dt.id).await.unwrap();
        let second = fiscal.allocator().allocate(&org, &dt.id).await.unwrap();
        assert_eq!(first.fiscal_number, "FACT-0001");
        assert_eq!(second.fiscal_number, "FACT-0002");

        let patch = SequencePatch {
            is_active: Some(false),
            ..Default::default()
        };
        fiscal
            .manager()
            .update_sequence(&org, &sequence.id, &patch, Some("owner"))
            .await
            .unwrap();

        let err = fiscal.allocator().allocate(&org, &dt.id).await.unwrap_err();
        assert!(matches!(err, FiscalError::NoActiveSequence { .. }));
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[tokio::test]
    async fn test_reset_then_allocate_returns_initial_number() {
        let (fiscal, org) = services().await;
        let dt = fiscal
            .registry()
            .register(&org, "B02", "Consumo", DocumentCategory::Invoice)
            .await
            .unwrap();
        let config = fiscal.config().sequences.resolve(SequenceDraft {
            prefix: Some("B02-".into()),
            initial_number: Some(50),
            ..Default::default()
        });
        let sequence = fiscal
            .manager()
            .create_sequence(&org, &dt.id, &config, None)
            .await
            .unwrap();

        for _ in 0..5 {
            fiscal.allocator().allocate(&org, &dt.id).await.unwrap();
        }
        fiscal
            .manager()
            .reset_sequence(&org, &sequence.id, Some("accountant"))
            .await
            .unwrap();

        let number = fiscal.allocator().allocate(&org, &dt.id).await.unwrap();
        assert_eq!(number.number, 50);
        assert_eq!(number.fiscal_number, "B02-00000050");
    }

    #[tokio::test]
    async fn test_issue_documents() {
        let (fiscal, org) = services().await;
        let types = fiscal.registry().register_defaults(&org).await.unwrap();
        let b01 = types.iter().find(|t| t.code == "B01").unwrap();

        let err = fiscal
            .issuer()
            .issue(&org, &b01.id, Some("inv-1"), Some("seller"))
            .await
            .unwrap_err();
        assert!(err.redirect_url().unwrap().ends_with(&b01.id));

        let sequence = fiscal
            .manager()
            .create_sequence(
                &org,
                &b01.id,
                &SequenceConfig {
                    prefix: "B01".into(),
                    ..SequenceConfig::default()
                },
                None,
            )
            .await
            .unwrap();

        let document = fiscal
            .issuer()
            .issue(&org, &b01.id, Some("inv-1"), Some("seller"))
            .await
            .unwrap();
        assert_eq!(document.fiscal_number, "B0100000001");
        assert_eq!(document.reference.as_deref(), Some("inv-1"));
        let fetched = fiscal.issuer().get_document(&org, &document.id).await.unwrap();
        assert_eq!(fetched.fiscal_number, document.fiscal_number);

        let listed = fiscal
            .issuer()
            .list_documents(&org, &sequence.id, 10)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        let err = fiscal
            .manager()
            .delete_sequence(&org, &sequence.id, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
