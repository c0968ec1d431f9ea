//! # Sequence Allocator
//!
//! Hands out fiscal numbers.
//!
//! ## Allocation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         allocate(org, type)                             │
//! │                                                                         │
//! │   ┌──────────────────────┐   busy/locked    ┌────────────────────┐      │
//! │   │ UPDATE ... RETURNING │ ───────────────► │ sleep(backoff)     │      │
//! │   │ (commits on success) │ ◄─────────────── │ budget left?       │      │
//! │   └──────────┬───────────┘      retry       └─────────┬──────────┘      │
//! │              │                                        │ exhausted       │
//! │      row     │   no row                               ▼                 │
//! │   ┌──────────┴──────────┐                    TransientStore             │
//! │   ▼                     ▼                                               │
//! │ format number     type known? ── no ──► NotFound                        │
//! │ (after commit)          │ yes                                           │
//! │                         ▼                                               │
//! │          active sequence? ── yes ──► SequenceExhausted + redirect_url   │
//! │                         │ no                                            │
//! │                         ▼                                               │
//! │                  NoActiveSequence + redirect_url                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed statement commits nothing, so retrying it cannot skip or repeat
//! a number. Once a number is returned it is consumed, whether or not the
//! caller ends up using it.

use std::future::Future;

use backoff::backoff::Backoff;
use factura_core::numbering::preview_fiscal_number;
use factura_core::{AllocatedNumber, FiscalSequence};
use factura_db::{AllocationRow, Database, DbResult, DocumentTypeRepository, SequenceRepository};
use tracing::{debug, warn};

use crate::config::{AllocationSettings, ValidationSettings};
use crate::error::{FiscalError, FiscalResult};

/// Hands out fiscal numbers, retrying while the store is busy.
#[derive(Debug, Clone)]
pub struct SequenceAllocator {
    sequences: SequenceRepository,
    document_types: DocumentTypeRepository,
    retry: AllocationSettings,
    validation: ValidationSettings,
}

impl SequenceAllocator {
    pub fn new(db: &Database, retry: AllocationSettings, validation: ValidationSettings) -> Self {
        SequenceAllocator {
            sequences: db.sequences(),
            document_types: db.document_types(),
            retry,
            validation,
        }
    }

    /// Takes the next number from the active sequence of a document type.
    ///
    /// ## Returns
    /// * `Ok(AllocatedNumber)` - consumed; the counter has moved
    /// * `Err(FiscalError::NoActiveSequence)` - configure a sequence first
    /// * `Err(FiscalError::SequenceExhausted)` - the active sequence is used up
    /// * `Err(FiscalError::NotFound)` - the document type is not in the organization
    /// * `Err(FiscalError::TransientStore)` - store stayed busy; nothing consumed
    pub async fn allocate(&self, organization_id: &str, document_type_id: &str) -> FiscalResult<AllocatedNumber> {
        let row = self
            .with_retry(|| self.sequences.allocate(organization_id, document_type_id))
            .await?;

        match row {
            Some(row) => Ok(to_allocated(row)),
            None => {
                if self.document_types.get(organization_id, document_type_id).await?.is_none() {
                    return Err(FiscalError::not_found("DocumentType", document_type_id));
                }
                if let Some(sequence) = self.sequences.find_active(organization_id, document_type_id).await? {
                    return Err(self.exhausted(&sequence));
                }
                Err(FiscalError::NoActiveSequence {
                    document_type_id: document_type_id.to_string(),
                    redirect_url: self.validation.redirect_url(Some(document_type_id)),
                })
            }
        }
    }

    /// Takes the next number from a specific sequence.
    ///
    /// ## When This Occurs
    /// Used when the caller already picked the sequence, e.g. a document
    /// edited from the sequence detail page.
    pub async fn allocate_from_sequence(
        &self,
        organization_id: &str,
        sequence_id: &str,
    ) -> FiscalResult<AllocatedNumber> {
        let row = self
            .with_retry(|| self.sequences.allocate_from_sequence(organization_id, sequence_id))
            .await?;

        match row {
            Some(row) => Ok(to_allocated(row)),
            None => match self.sequences.get(organization_id, sequence_id).await? {
                Some(sequence) if sequence.is_active => Err(self.exhausted(&sequence)),
                Some(sequence) => Err(FiscalError::SequenceInactive {
                    sequence_id: sequence_id.to_string(),
                    redirect_url: self.validation.redirect_url(Some(&sequence.document_type_id)),
                }),
                None => Err(FiscalError::not_found("FiscalSequence", sequence_id)),
            },
        }
    }

    fn exhausted(&self, sequence: &FiscalSequence) -> FiscalError {
        warn!(sequence_id = %sequence.id, "Fiscal sequence exhausted");
        FiscalError::SequenceExhausted {
            sequence_id: sequence.id.clone(),
            redirect_url: self.validation.redirect_url(Some(&sequence.document_type_id)),
        }
    }

    /// Runs `op` until it succeeds, fails permanently, or the retry budget
    /// runs out.
    async fn with_retry<T, F, Fut>(&self, mut op: F) -> FiscalResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        let mut backoff = self.retry.backoff();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => match backoff.next_backoff() {
                    Some(duration) => {
                        debug!(?duration, attempt, error = %e, "Store busy, retrying allocation");
                        tokio::time::sleep(duration).await;
                    }
                    None => {
                        warn!(attempt, error = %e, "Allocation retry budget exhausted");
                        return Err(e.into());
                    }
                },
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn to_allocated(row: AllocationRow) -> AllocatedNumber {
    AllocatedNumber {
        fiscal_number: preview_fiscal_number(&row.prefix, &row.suffix, row.issued_number, row.padding_length),
        sequence_id: row.sequence_id,
        document_type_id: row.document_type_id,
        number: row.issued_number,
    }
}
