//! # Fiscal Sequence Repository
//!
//! Sequence CRUD, the audit trail, and the atomic counter.
//!
//! ## Atomic Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Statement = One Number                           │
//! │                                                                         │
//! │  Request A ──┐                                                          │
//! │  Request B ──┼──► UPDATE fiscal_sequences                               │
//! │  Request C ──┘       SET current_number = current_number + 1            │
//! │                    WHERE organization_id = ? AND document_type_id = ?   │
//! │                      AND is_active = 1                                  │
//! │                    RETURNING ..., current_number - 1 AS issued_number   │
//! │                                                                         │
//! │  SQLite takes its write lock for the statement, so A, B and C are       │
//! │  applied one after another: 41, 42, 43. Nothing reads the counter       │
//! │  outside the statement; formatting happens after commit.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Administrative Writes
//! Insert, update, reset and delete each run in a transaction together with
//! their `sequence_audit_log` row. The first statement of every transaction
//! is a write, so the write lock is held before any value is read.

use chrono::Utc;
use factura_core::{AuditAction, FiscalSequence, SequenceAuditEntry, SequenceConfig, MAX_SEQUENCE_NUMBER};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// What the counter statement returns.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AllocationRow {
    pub sequence_id: String,
    pub document_type_id: String,
    pub prefix: String,
    pub suffix: String,
    pub padding_length: i64,
    /// The number handed to the caller (the pre-increment value).
    pub issued_number: i64,
}

/// Outcome of a reset.
#[derive(Debug, Clone, PartialEq)]
pub struct ResetOutcome {
    pub sequence: FiscalSequence,
    pub previous_number: i64,
}

/// Repository for fiscal sequence database operations.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    /// Creates a new SequenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a sequence by id within an organization.
    pub async fn get(&self, organization_id: &str, id: &str) -> DbResult<Option<FiscalSequence>> {
        let sequence = sqlx::query_as::<_, FiscalSequence>(
            r#"
            SELECT id, organization_id, document_type_id, prefix, suffix,
                   initial_number, current_number, padding_length, is_active,
                   created_at, updated_at
            FROM fiscal_sequences
            WHERE organization_id = ?1 AND id = ?2
            "#,
        )
        .bind(organization_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sequence)
    }

    /// Lists all sequences of an organization, newest first.
    pub async fn list(&self, organization_id: &str) -> DbResult<Vec<FiscalSequence>> {
        let sequences = sqlx::query_as::<_, FiscalSequence>(
            r#"
            SELECT id, organization_id, document_type_id, prefix, suffix,
                   initial_number, current_number, padding_length, is_active,
                   created_at, updated_at
            FROM fiscal_sequences
            WHERE organization_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sequences)
    }

    /// Lists the sequences (active or not) of one document type.
    pub async fn list_for_document_type(
        &self,
        organization_id: &str,
        document_type_id: &str,
    ) -> DbResult<Vec<FiscalSequence>> {
        let sequences = sqlx::query_as::<_, FiscalSequence>(
            r#"
            SELECT id, organization_id, document_type_id, prefix, suffix,
                   initial_number, current_number, padding_length, is_active,
                   created_at, updated_at
            FROM fiscal_sequences
            WHERE organization_id = ?1 AND document_type_id = ?2
            ORDER BY is_active DESC, created_at DESC
            "#,
        )
        .bind(organization_id)
        .bind(document_type_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sequences)
    }

    /// The active sequence of a document type, if any.
    pub async fn find_active(
        &self,
        organization_id: &str,
        document_type_id: &str,
    ) -> DbResult<Option<FiscalSequence>> {
        let sequence = sqlx::query_as::<_, FiscalSequence>(
            r#"
            SELECT id, organization_id, document_type_id, prefix, suffix,
                   initial_number, current_number, padding_length, is_active,
                   created_at, updated_at
            FROM fiscal_sequences
            WHERE organization_id = ?1 AND document_type_id = ?2 AND is_active = 1
            "#,
        )
        .bind(organization_id)
        .bind(document_type_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sequence)
    }

    /// Audit entries of one sequence, newest first.
    pub async fn audit_log(
        &self,
        organization_id: &str,
        sequence_id: &str,
        limit: i64,
    ) -> DbResult<Vec<SequenceAuditEntry>> {
        let entries = sqlx::query_as::<_, SequenceAuditEntry>(
            r#"
            SELECT id, organization_id, sequence_id, action,
                   previous_number, new_number, actor, created_at
            FROM sequence_audit_log
            WHERE organization_id = ?1 AND sequence_id = ?2
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?3
            "#,
        )
        .bind(organization_id)
        .bind(sequence_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    // =========================================================================
    // Counter
    // =========================================================================

    /// Atomically takes the next number of the active sequence of a
    /// document type.
    ///
    /// ## Returns
    /// * `Ok(Some(row))` - the number is consumed (committed)
    /// * `Ok(None)` - no active sequence for that document type, or the
    ///   active one has issued [`MAX_SEQUENCE_NUMBER`] already
    pub async fn allocate(
        &self,
        organization_id: &str,
        document_type_id: &str,
    ) -> DbResult<Option<AllocationRow>> {
        let row = sqlx::query_as::<_, AllocationRow>(
            r#"
            UPDATE fiscal_sequences
            SET current_number = current_number + 1,
                updated_at = ?3
            WHERE organization_id = ?1
              AND document_type_id = ?2
              AND is_active = 1
              AND current_number <= ?4
            RETURNING id AS sequence_id,
                      document_type_id,
                      prefix,
                      suffix,
                      padding_length,
                      current_number - 1 AS issued_number
            "#,
        )
        .bind(organization_id)
        .bind(document_type_id)
        .bind(Utc::now())
        .bind(MAX_SEQUENCE_NUMBER)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = &row {
            debug!(
                sequence_id = %row.sequence_id,
                number = row.issued_number,
                "Allocated fiscal number"
            );
        }

        Ok(row)
    }

    /// Like [`SequenceRepository::allocate`], keyed by sequence id.
    ///
    /// `Ok(None)` means the sequence is missing, inactive or exhausted.
    pub async fn allocate_from_sequence(
        &self,
        organization_id: &str,
        sequence_id: &str,
    ) -> DbResult<Option<AllocationRow>> {
        let row = sqlx::query_as::<_, AllocationRow>(
            r#"
            UPDATE fiscal_sequences
            SET current_number = current_number + 1,
                updated_at = ?3
            WHERE organization_id = ?1
              AND id = ?2
              AND is_active = 1
              AND current_number <= ?4
            RETURNING id AS sequence_id,
                      document_type_id,
                      prefix,
                      suffix,
                      padding_length,
                      current_number - 1 AS issued_number
            "#,
        )
        .bind(organization_id)
        .bind(sequence_id)
        .bind(Utc::now())
        .bind(MAX_SEQUENCE_NUMBER)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    // =========================================================================
    // Administrative Writes
    // =========================================================================

    /// Inserts a sequence with `current_number = initial_number`.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - another active sequence exists for
    ///   the document type (partial unique index)
    pub async fn insert(
        &self,
        organization_id: &str,
        document_type_id: &str,
        config: &SequenceConfig,
        actor: Option<&str>,
    ) -> DbResult<FiscalSequence> {
        let now = Utc::now();
        let sequence = FiscalSequence {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            document_type_id: document_type_id.to_string(),
            prefix: config.prefix.clone(),
            suffix: config.suffix.clone(),
            initial_number: config.initial_number,
            current_number: config.initial_number,
            padding_length: config.padding_length,
            is_active: config.is_active,
            created_at: now,
            updated_at: now,
        };

        debug!(
            id = %sequence.id,
            document_type_id = %document_type_id,
            is_active = sequence.is_active,
            "Inserting fiscal sequence"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO fiscal_sequences (
                id, organization_id, document_type_id, prefix, suffix,
                initial_number, current_number, padding_length, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&sequence.id)
        .bind(&sequence.organization_id)
        .bind(&sequence.document_type_id)
        .bind(&sequence.prefix)
        .bind(&sequence.suffix)
        .bind(sequence.initial_number)
        .bind(sequence.current_number)
        .bind(sequence.padding_length)
        .bind(sequence.is_active)
        .bind(sequence.created_at)
        .bind(sequence.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("active sequence for document type", document_type_id)
            }
            DbError::ForeignKeyViolation { .. } => DbError::not_found("DocumentType", document_type_id),
            other => other,
        })?;

        record_audit(
            &mut tx,
            organization_id,
            &sequence.id,
            AuditAction::Created,
            None,
            Some(sequence.current_number),
            actor,
        )
        .await?;

        tx.commit().await?;

        info!(id = %sequence.id, document_type_id = %document_type_id, "Fiscal sequence created");
        Ok(sequence)
    }

    /// Persists the editable fields of `sequence` (never the counter).
    ///
    /// ## Returns
    /// The stored row, with the counter as it is in the database now.
    pub async fn update(&self, sequence: &FiscalSequence, actor: Option<&str>) -> DbResult<FiscalSequence> {
        debug!(id = %sequence.id, is_active = sequence.is_active, "Updating fiscal sequence");

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, FiscalSequence>(
            r#"
            UPDATE fiscal_sequences
            SET prefix = ?3,
                suffix = ?4,
                padding_length = ?5,
                is_active = ?6,
                updated_at = ?7
            WHERE organization_id = ?1 AND id = ?2
            RETURNING id, organization_id, document_type_id, prefix, suffix,
                      initial_number, current_number, padding_length, is_active,
                      created_at, updated_at
            "#,
        )
        .bind(&sequence.organization_id)
        .bind(&sequence.id)
        .bind(&sequence.prefix)
        .bind(&sequence.suffix)
        .bind(sequence.padding_length)
        .bind(sequence.is_active)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("active sequence for document type", &sequence.document_type_id)
            }
            other => other,
        })?
        .ok_or_else(|| DbError::not_found("FiscalSequence", &sequence.id))?;

        record_audit(
            &mut tx,
            &updated.organization_id,
            &updated.id,
            AuditAction::Updated,
            Some(updated.current_number),
            Some(updated.current_number),
            actor,
        )
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Moves the counter back to `initial_number`.
    ///
    /// Numbers issued since the last reset will be issued again. The previous
    /// value is kept in the audit trail.
    pub async fn reset(&self, organization_id: &str, id: &str, actor: Option<&str>) -> DbResult<ResetOutcome> {
        let mut tx = self.pool.begin().await?;

        // Write first: takes the lock before the previous value is read.
        let previous_number: i64 = sqlx::query_scalar(
            r#"
            UPDATE fiscal_sequences
            SET updated_at = ?3
            WHERE organization_id = ?1 AND id = ?2
            RETURNING current_number
            "#,
        )
        .bind(organization_id)
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("FiscalSequence", id))?;

        let sequence = sqlx::query_as::<_, FiscalSequence>(
            r#"
            UPDATE fiscal_sequences
            SET current_number = initial_number
            WHERE organization_id = ?1 AND id = ?2
            RETURNING id, organization_id, document_type_id, prefix, suffix,
                      initial_number, current_number, padding_length, is_active,
                      created_at, updated_at
            "#,
        )
        .bind(organization_id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        record_audit(
            &mut tx,
            organization_id,
            id,
            AuditAction::Reset,
            Some(previous_number),
            Some(sequence.current_number),
            actor,
        )
        .await?;

        tx.commit().await?;

        warn!(
            id = %id,
            previous_number,
            new_number = sequence.current_number,
            actor = actor.unwrap_or("unknown"),
            "Fiscal sequence reset; previously issued numbers may be reissued"
        );

        Ok(ResetOutcome {
            sequence,
            previous_number,
        })
    }

    /// Deletes a sequence.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - documents still reference it
    /// * `Err(DbError::NotFound)` - no such sequence in the organization
    pub async fn delete(&self, organization_id: &str, id: &str, actor: Option<&str>) -> DbResult<()> {
        debug!(id = %id, "Deleting fiscal sequence");

        let mut tx = self.pool.begin().await?;

        let last_number: i64 = sqlx::query_scalar(
            r#"
            DELETE FROM fiscal_sequences
            WHERE organization_id = ?1 AND id = ?2
            RETURNING current_number
            "#,
        )
        .bind(organization_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("FiscalSequence", id))?;

        record_audit(
            &mut tx,
            organization_id,
            id,
            AuditAction::Deleted,
            Some(last_number),
            None,
            actor,
        )
        .await?;

        tx.commit().await?;

        info!(id = %id, "Fiscal sequence deleted");
        Ok(())
    }
}

/// Writes one audit row on the caller's transaction.
async fn record_audit(
    conn: &mut SqliteConnection,
    organization_id: &str,
    sequence_id: &str,
    action: AuditAction,
    previous_number: Option<i64>,
    new_number: Option<i64>,
    actor: Option<&str>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sequence_audit_log (
            id, organization_id, sequence_id, action,
            previous_number, new_number, actor, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(organization_id)
    .bind(sequence_id)
    .bind(action)
    .bind(previous_number)
    .bind(new_number)
    .bind(actor)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
