//! # Document Issuer
//!
//! Validate, allocate, store.
//!
//! ```text
//!  issue(org, type)
//!     │
//!     ├─► SequenceValidator ── invalid ──► NoActiveSequence (nothing consumed)
//!     │
//!     ├─► SequenceAllocator ── commits the number
//!     │
//!     └─► fiscal_documents INSERT
//!            └─ fails ──► number stays consumed (gap), logged with the number
//! ```

use factura_core::FiscalDocument;
use factura_db::{Database, DocumentRepository};
use tracing::{info, warn};

use crate::allocator::SequenceAllocator;
use crate::error::{FiscalError, FiscalResult};
use crate::manager::MAX_LIST_LIMIT;
use crate::validator::SequenceValidator;

/// Issues fiscal documents: validate, allocate, then store.
#[derive(Debug, Clone)]
pub struct DocumentIssuer {
    documents: DocumentRepository,
    validator: SequenceValidator,
    allocator: SequenceAllocator,
}

impl DocumentIssuer {
    pub fn new(db: &Database, validator: SequenceValidator, allocator: SequenceAllocator) -> Self {
        DocumentIssuer {
            documents: db.documents(),
            validator,
            allocator,
        }
    }

    /// Issues a document of `document_type_id` with the next fiscal number.
    ///
    /// ## Arguments
    /// * `reference` - Id of the invoice/quote in the surrounding application
    /// * `actor` - User issuing the document
    ///
    /// ## Returns
    /// * `Err(FiscalError::NoActiveSequence)` - blocked before allocation
    pub async fn issue(
        &self,
        organization_id: &str,
        document_type_id: &str,
        reference: Option<&str>,
        actor: Option<&str>,
    ) -> FiscalResult<FiscalDocument> {
        let validation = self
            .validator
            .validate_specific_document_type(organization_id, document_type_id)
            .await?;

        if !validation.is_valid {
            return Err(FiscalError::NoActiveSequence {
                document_type_id: document_type_id.to_string(),
                redirect_url: validation.redirect_url.unwrap_or_default(),
            });
        }

        let allocated = self.allocator.allocate(organization_id, document_type_id).await?;

        let document = match self
            .documents
            .insert(organization_id, &allocated, reference, actor)
            .await
        {
            Ok(document) => document,
            Err(e) => {
                warn!(
                    sequence_id = %allocated.sequence_id,
                    number = allocated.number,
                    fiscal_number = %allocated.fiscal_number,
                    error = %e,
                    "Document insert failed; fiscal number is consumed and left as a gap"
                );
                return Err(e.into());
            }
        };

        info!(
            id = %document.id,
            fiscal_number = %document.fiscal_number,
            "Fiscal document issued"
        );
        Ok(document)
    }

    pub async fn get_document(&self, organization_id: &str, id: &str) -> FiscalResult<FiscalDocument> {
        self.documents
            .get(organization_id, id)
            .await?
            .ok_or_else(|| FiscalError::not_found("FiscalDocument", id))
    }

    /// Documents of a sequence, newest first.
    pub async fn list_documents(
        &self,
        organization_id: &str,
        sequence_id: &str,
        limit: i64,
    ) -> FiscalResult<Vec<FiscalDocument>> {
        Ok(self
            .documents
            .list_for_sequence(organization_id, sequence_id, limit.clamp(1, MAX_LIST_LIMIT))
            .await?)
    }
}
