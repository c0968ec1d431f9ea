//! # Sequence Manager
//!
//! Administrative lifecycle of fiscal sequences.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Sequence Administration                              │
//! │                                                                         │
//! │  create ──► validate config ──► document type exists? ──► one active?   │
//! │                                                              │          │
//! │                                                              ▼          │
//! │                                                  INSERT + audit(created)│
//! │                                                                         │
//! │  update ──► merge patch ──► validate ──► one active? ──► UPDATE + audit │
//! │             (counter is never part of a patch)                          │
//! │                                                                         │
//! │  reset  ──► counter = initial_number ──► audit(previous, new)           │
//! │                                                                         │
//! │  delete ──► no documents reference it? ──► DELETE + audit(deleted)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The single-active rule is checked here for a readable error, and enforced
//! by the store's partial unique index for concurrent requests.

use factura_core::validation::ensure_valid_config;
use factura_core::{FiscalSequence, SequenceAuditEntry, SequenceConfig, SequencePatch, SequenceStats};
use factura_db::{Database, DbError, DocumentRepository, DocumentTypeRepository, SequenceRepository};
use tracing::{debug, info};

use crate::error::{FiscalError, FiscalResult};

/// Upper bound for audit and document listings.
pub const MAX_LIST_LIMIT: i64 = 500;

/// Administers fiscal sequences: create, update, reset, delete and reads.
#[derive(Debug, Clone)]
pub struct SequenceManager {
    sequences: SequenceRepository,
    document_types: DocumentTypeRepository,
    documents: DocumentRepository,
}

impl SequenceManager {
    pub fn new(db: &Database) -> Self {
        SequenceManager {
            sequences: db.sequences(),
            document_types: db.document_types(),
            documents: db.documents(),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_sequence(&self, organization_id: &str, id: &str) -> FiscalResult<FiscalSequence> {
        self.sequences
            .get(organization_id, id)
            .await?
            .ok_or_else(|| FiscalError::not_found("FiscalSequence", id))
    }

    pub async fn list_sequences(&self, organization_id: &str) -> FiscalResult<Vec<FiscalSequence>> {
        Ok(self.sequences.list(organization_id).await?)
    }

    /// Every sequence of one document type, active or not.
    pub async fn list_sequences_for_document_type(
        &self,
        organization_id: &str,
        document_type_id: &str,
    ) -> FiscalResult<Vec<FiscalSequence>> {
        self.require_document_type(organization_id, document_type_id).await?;
        Ok(self
            .sequences
            .list_for_document_type(organization_id, document_type_id)
            .await?)
    }

    /// Administrative history of a sequence, newest first.
    ///
    /// Works for deleted sequences too.
    pub async fn audit_log(
        &self,
        organization_id: &str,
        sequence_id: &str,
        limit: i64,
    ) -> FiscalResult<Vec<SequenceAuditEntry>> {
        Ok(self
            .sequences
            .audit_log(organization_id, sequence_id, limit.clamp(1, MAX_LIST_LIMIT))
            .await?)
    }

    /// Usage figures for one sequence. Read-only.
    pub async fn get_sequence_stats(&self, organization_id: &str, id: &str) -> FiscalResult<SequenceStats> {
        let sequence = self.get_sequence(organization_id, id).await?;
        let documents_issued = self.documents.count_for_sequence(organization_id, id).await?;
        let latest = self.documents.latest_for_sequence(organization_id, id).await?;

        Ok(SequenceStats {
            sequence_id: sequence.id.clone(),
            document_type_id: sequence.document_type_id.clone(),
            is_active: sequence.is_active,
            initial_number: sequence.initial_number,
            current_number: sequence.current_number,
            numbers_allocated: sequence.numbers_allocated(),
            documents_issued,
            last_issued_at: latest.as_ref().map(|d| d.created_at),
            last_fiscal_number: latest.map(|d| d.fiscal_number),
            next_fiscal_number: sequence.next_fiscal_number(),
        })
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Creates a sequence with `current_number = initial_number`.
    ///
    /// ## Returns
    /// * `Err(FiscalError::Validation)` - the configuration breaks a rule
    /// * `Err(FiscalError::NotFound)` - unknown document type
    /// * `Err(FiscalError::DuplicateActiveSequence)` - an active one exists
    pub async fn create_sequence(
        &self,
        organization_id: &str,
        document_type_id: &str,
        config: &SequenceConfig,
        actor: Option<&str>,
    ) -> FiscalResult<FiscalSequence> {
        ensure_valid_config(config)?;
        self.require_document_type(organization_id, document_type_id).await?;

        if config.is_active {
            self.ensure_no_other_active(organization_id, document_type_id, None)
                .await?;
        }

        let sequence = self
            .sequences
            .insert(organization_id, document_type_id, config, actor)
            .await
            .map_err(|e| duplicate_active(e, document_type_id))?;

        info!(
            id = %sequence.id,
            document_type_id = %document_type_id,
            next = %sequence.next_fiscal_number(),
            "Fiscal sequence created"
        );
        Ok(sequence)
    }

    /// Applies a partial update. The counter is never touched.
    pub async fn update_sequence(
        &self,
        organization_id: &str,
        id: &str,
        patch: &SequencePatch,
        actor: Option<&str>,
    ) -> FiscalResult<FiscalSequence> {
        let mut sequence = self.get_sequence(organization_id, id).await?;

        if patch.is_empty() {
            debug!(id = %id, "Empty patch, sequence unchanged");
            return Ok(sequence);
        }

        let was_active = sequence.is_active;
        sequence.apply_patch(patch);
        ensure_valid_config(&sequence.config())?;

        if sequence.is_active && !was_active {
            self.ensure_no_other_active(organization_id, &sequence.document_type_id, Some(id))
                .await?;
        }

        let updated = self
            .sequences
            .update(&sequence, actor)
            .await
            .map_err(|e| duplicate_active(e, &sequence.document_type_id))?;

        info!(id = %id, is_active = updated.is_active, "Fiscal sequence updated");
        Ok(updated)
    }

    /// Puts the counter back to `initial_number`.
    ///
    /// Numbers issued since the previous reset will be issued again; the
    /// audit trail keeps the value that was overwritten.
    pub async fn reset_sequence(
        &self,
        organization_id: &str,
        id: &str,
        actor: Option<&str>,
    ) -> FiscalResult<FiscalSequence> {
        let outcome = self.sequences.reset(organization_id, id, actor).await?;
        Ok(outcome.sequence)
    }

    /// Deletes a sequence that no document references.
    ///
    /// ## Returns
    /// * `Err(FiscalError::SequenceInUse)` - documents reference it
    /// * `Err(FiscalError::NotFound)` - no such sequence
    pub async fn delete_sequence(&self, organization_id: &str, id: &str, actor: Option<&str>) -> FiscalResult<()> {
        match self.sequences.delete(organization_id, id, actor).await {
            Ok(()) => Ok(()),
            Err(DbError::ForeignKeyViolation { .. }) => {
                let documents = self.documents.count_for_sequence(organization_id, id).await?;
                Err(FiscalError::SequenceInUse {
                    sequence_id: id.to_string(),
                    documents,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn require_document_type(&self, organization_id: &str, document_type_id: &str) -> FiscalResult<()> {
        match self.document_types.get(organization_id, document_type_id).await? {
            Some(_) => Ok(()),
            None => Err(FiscalError::not_found("DocumentType", document_type_id)),
        }
    }

    async fn ensure_no_other_active(
        &self,
        organization_id: &str,
        document_type_id: &str,
        except_id: Option<&str>,
    ) -> FiscalResult<()> {
        let active = self
            .sequences
            .find_active(organization_id, document_type_id)
            .await?;

        match active {
            Some(existing) if Some(existing.id.as_str()) != except_id => {
                Err(FiscalError::DuplicateActiveSequence {
                    document_type_id: document_type_id.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

fn duplicate_active(err: DbError, document_type_id: &str) -> FiscalError {
    match err {
        DbError::UniqueViolation { .. } => FiscalError::DuplicateActiveSequence {
            document_type_id: document_type_id.to_string(),
        },
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factura_core::{AllocatedNumber, AuditAction, DocumentCategory};
    use factura_db::DbConfig;

    struct Fixture {
        db: Database,
        manager: SequenceManager,
        org: String,
        dt: String,
    }

    async fn setup() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let org = db.organizations().create("Acme").await.unwrap().id;
        let dt = db
            .document_types()
            .insert(&org, "B01", "Crédito Fiscal", DocumentCategory::Invoice)
            .await
            .unwrap()
            .id;
        let manager = SequenceManager::new(&db);
        Fixture { db, manager, org, dt }
    }

    fn config(prefix: &str, active: bool) -> SequenceConfig {
        SequenceConfig {
            prefix: prefix.to_string(),
            padding_length: 4,
            is_active: active,
            ..SequenceConfig::default()
        }
    }

    async fn active_count(f: &Fixture) -> usize {
        f.manager
            .list_sequences_for_document_type(&f.org, &f.dt)
            .await
            .unwrap()
            .iter()
            .filter(|s| s.is_active)
            .count()
    }

    #[tokio::test]
    async fn test_create_sequence() {
        let f = setup().await;
        let seq = f
            .manager
            .create_sequence(&f.org, &f.dt, &config("B01-", true), Some("user-1"))
            .await
            .unwrap();

        assert_eq!(seq.current_number, seq.initial_number);
        assert_eq!(seq.next_fiscal_number(), "B01-0001");

        let audit = f.manager.audit_log(&f.org, &seq.id, 10).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, AuditAction::Created);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_config() {
        let f = setup().await;
        let mut bad = config("B01-", true);
        bad.padding_length = 0;
        bad.initial_number = -5;

        let err = f
            .manager
            .create_sequence(&f.org, &f.dt, &bad, None)
            .await
            .unwrap_err();
        assert_eq!(err.issues().len(), 2);
        assert!(f.manager.list_sequences(&f.org).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_for_unknown_document_type() {
        let f = setup().await;
        let err = f
            .manager
            .create_sequence(&f.org, "missing", &config("X-", true), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FiscalError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_at_most_one_active_sequence() {
        let f = setup().await;
        let first = f
            .manager
            .create_sequence(&f.org, &f.dt, &config("A-", true), None)
            .await
            .unwrap();

        let err = f
            .manager
            .create_sequence(&f.org, &f.dt, &config("B-", true), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FiscalError::DuplicateActiveSequence { .. }));

        let second = f
            .manager
            .create_sequence(&f.org, &f.dt, &config("B-", false), None)
            .await
            .unwrap();
        assert_eq!(active_count(&f).await, 1);

        let activate = SequencePatch {
            is_active: Some(true),
            ..Default::default()
        };
        let err = f
            .manager
            .update_sequence(&f.org, &second.id, &activate, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FiscalError::DuplicateActiveSequence { .. }));

        let deactivate = SequencePatch {
            is_active: Some(false),
            ..Default::default()
        };
        f.manager
            .update_sequence(&f.org, &first.id, &deactivate, None)
            .await
            .unwrap();
        f.manager
            .update_sequence(&f.org, &second.id, &activate, None)
            .await
            .unwrap();
        assert_eq!(active_count(&f).await, 1);

        f.manager.delete_sequence(&f.org, &second.id, None).await.unwrap();
        assert_eq!(active_count(&f).await, 0);
    }

    #[tokio::test]
    async fn test_update_keeps_counter_and_validates() {
        let f = setup().await;
        let seq = f
            .manager
            .create_sequence(&f.org, &f.dt, &config("B01-", true), None)
            .await
            .unwrap();
        f.db.sequences().allocate(&f.org, &f.dt).await.unwrap();

        let patch = SequencePatch {
            prefix: Some("E31-".into()),
            suffix: Some("-X".into()),
            ..Default::default()
        };
        let updated = f
            .manager
            .update_sequence(&f.org, &seq.id, &patch, Some("user-1"))
            .await
            .unwrap();
        assert_eq!(updated.current_number, 2);
        assert_eq!(updated.next_fiscal_number(), "E31-0002-X");

        let bad = SequencePatch {
            padding_length: Some(99),
            ..Default::default()
        };
        let err = f
            .manager
            .update_sequence(&f.org, &seq.id, &bad, None)
            .await
            .unwrap_err();
        assert_eq!(err.issues()[0].field, "padding_length");

        let unchanged = f
            .manager
            .update_sequence(&f.org, &seq.id, &SequencePatch::default(), None)
            .await
            .unwrap();
        assert_eq!(unchanged, updated);
    }

    #[tokio::test]
    async fn test_reset_restores_initial_number() {
        let f = setup().await;
        let mut cfg = config("B01-", true);
        cfg.initial_number = 10;
        let seq = f
            .manager
            .create_sequence(&f.org, &f.dt, &cfg, None)
            .await
            .unwrap();
        for _ in 0..3 {
            f.db.sequences().allocate(&f.org, &f.dt).await.unwrap();
        }

        let reset = f
            .manager
            .reset_sequence(&f.org, &seq.id, Some("auditor"))
            .await
            .unwrap();
        assert_eq!(reset.current_number, 10);

        let audit = f.manager.audit_log(&f.org, &seq.id, 10).await.unwrap();
        assert_eq!(audit[0].action, AuditAction::Reset);
        assert_eq!(audit[0].previous_number, Some(13));
        assert_eq!(audit[0].new_number, Some(10));
    }

    #[tokio::test]
    async fn test_delete_in_use_is_conflict() {
        let f = setup().await;
        let used = f
            .manager
            .create_sequence(&f.org, &f.dt, &config("B01-", true), None)
            .await
            .unwrap();
        let row = f.db.sequences().allocate(&f.org, &f.dt).await.unwrap().unwrap();
        let allocated = AllocatedNumber {
            sequence_id: row.sequence_id.clone(),
            document_type_id: row.document_type_id.clone(),
            number: row.issued_number,
            fiscal_number: used.format_number(row.issued_number),
        };
        f.db.documents()
            .insert(&f.org, &allocated, None, None)
            .await
            .unwrap();

        let err = f.manager.delete_sequence(&f.org, &used.id, None).await.unwrap_err();
        match err {
            FiscalError::SequenceInUse { documents, .. } => assert_eq!(documents, 1),
            other => panic!("expected SequenceInUse, got {other:?}"),
        }

        let fresh = f
            .manager
            .create_sequence(&f.org, &f.dt, &config("B02-", false), None)
            .await
            .unwrap();
        f.manager.delete_sequence(&f.org, &fresh.id, None).await.unwrap();

        let err = f.manager.get_sequence(&f.org, &fresh.id).await.unwrap_err();
        assert!(matches!(err, FiscalError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_sequence_stats() {
        let f = setup().await;
        let seq = f
            .manager
            .create_sequence(&f.org, &f.dt, &config("B01-", true), None)
            .await
            .unwrap();

        let stats = f.manager.get_sequence_stats(&f.org, &seq.id).await.unwrap();
        assert_eq!(stats.numbers_allocated, 0);
        assert_eq!(stats.documents_issued, 0);
        assert!(stats.last_fiscal_number.is_none());
        assert_eq!(stats.next_fiscal_number, "B01-0001");

        let row = f.db.sequences().allocate(&f.org, &f.dt).await.unwrap().unwrap();
        let allocated = AllocatedNumber {
            sequence_id: row.sequence_id,
            document_type_id: row.document_type_id,
            number: row.issued_number,
            fiscal_number: "B01-0001".into(),
        };
        f.db.documents()
            .insert(&f.org, &allocated, Some("inv-1"), None)
            .await
            .unwrap();
        f.db.sequences().allocate(&f.org, &f.dt).await.unwrap();

        let stats = f.manager.get_sequence_stats(&f.org, &seq.id).await.unwrap();
        assert_eq!(stats.numbers_allocated, 2);
        assert_eq!(stats.documents_issued, 1);
        assert_eq!(stats.last_fiscal_number.as_deref(), Some("B01-0001"));
        assert_eq!(stats.next_fiscal_number, "B01-0003");
    }
}
