//! # Fiscal Document Repository
//!
//! Documents that consumed a fiscal number. A document's `sequence_id`
//! references `fiscal_sequences` with `ON DELETE RESTRICT`, which is what
//! blocks deleting a sequence that is in use.

use chrono::Utc;
use factura_core::{AllocatedNumber, FiscalDocument};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;

/// Repository for fiscal document database operations.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    /// Creates a new DocumentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DocumentRepository { pool }
    }

    /// Stores a document for a number that has already been allocated.
    ///
    /// ## Arguments
    /// * `allocated` - Output of the allocator
    /// * `reference` - Id of the invoice/quote in the surrounding application
    /// * `issued_by` - User who issued it
    pub async fn insert(
        &self,
        organization_id: &str,
        allocated: &AllocatedNumber,
        reference: Option<&str>,
        issued_by: Option<&str>,
    ) -> DbResult<FiscalDocument> {
        let document = FiscalDocument {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            document_type_id: allocated.document_type_id.clone(),
            sequence_id: allocated.sequence_id.clone(),
            number: allocated.number,
            fiscal_number: allocated.fiscal_number.clone(),
            reference: reference.map(str::to_string),
            issued_by: issued_by.map(str::to_string),
            created_at: Utc::now(),
        };

        debug!(id = %document.id, fiscal_number = %document.fiscal_number, "Inserting fiscal document");

        sqlx::query(
            r#"
            INSERT INTO fiscal_documents (
                id, organization_id, document_type_id, sequence_id,
                number, fiscal_number, reference, issued_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&document.id)
        .bind(&document.organization_id)
        .bind(&document.document_type_id)
        .bind(&document.sequence_id)
        .bind(document.number)
        .bind(&document.fiscal_number)
        .bind(&document.reference)
        .bind(&document.issued_by)
        .bind(document.created_at)
        .execute(&self.pool)
        .await?;

        Ok(document)
    }

    /// Gets a document by id within an organization.
    pub async fn get(&self, organization_id: &str, id: &str) -> DbResult<Option<FiscalDocument>> {
        let document = sqlx::query_as::<_, FiscalDocument>(
            r#"
            SELECT id, organization_id, document_type_id, sequence_id,
                   number, fiscal_number, reference, issued_by, created_at
            FROM fiscal_documents
            WHERE organization_id = ?1 AND id = ?2
            "#,
        )
        .bind(organization_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(document)
    }

    /// Documents of one sequence, newest first.
    pub async fn list_for_sequence(
        &self,
        organization_id: &str,
        sequence_id: &str,
        limit: i64,
    ) -> DbResult<Vec<FiscalDocument>> {
        let documents = sqlx::query_as::<_, FiscalDocument>(
            r#"
            SELECT id, organization_id, document_type_id, sequence_id,
                   number, fiscal_number, reference, issued_by, created_at
            FROM fiscal_documents
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

        Ok(documents)
    }

    /// Number of documents referencing a sequence.
    pub async fn count_for_sequence(&self, organization_id: &str, sequence_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM fiscal_documents WHERE organization_id = ?1 AND sequence_id = ?2",
        )
        .bind(organization_id)
        .bind(sequence_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Most recent document of a sequence.
    pub async fn latest_for_sequence(
        &self,
        organization_id: &str,
        sequence_id: &str,
    ) -> DbResult<Option<FiscalDocument>> {
        Ok(self
            .list_for_sequence(organization_id, sequence_id, 1)
            .await?
            .into_iter()
            .next())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use factura_core::{AllocatedNumber, DocumentCategory, SequenceConfig};

    #[tokio::test]
    async fn test_documents_block_sequence_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let org = db.organizations().create("Acme").await.unwrap().id;
        let dt = db
            .document_types()
            .insert(&org, "B02", "Consumo", DocumentCategory::Invoice)
            .await
            .unwrap()
            .id;
        let seq = db
            .sequences()
            .insert(&org, &dt, &SequenceConfig::default(), None)
            .await
            .unwrap();

        let row = db.sequences().allocate(&org, &dt).await.unwrap().unwrap();
        let allocated = AllocatedNumber {
            sequence_id: row.sequence_id,
            document_type_id: row.document_type_id,
            number: row.issued_number,
            fiscal_number: "00000001".to_string(),
        };
        let doc = db
            .documents()
            .insert(&org, &allocated, Some("inv-42"), Some("user-1"))
            .await
            .unwrap();

        assert_eq!(db.documents().count_for_sequence(&org, &seq.id).await.unwrap(), 1);
        let latest = db.documents().latest_for_sequence(&org, &seq.id).await.unwrap().unwrap();
        assert_eq!(latest.id, doc.id);
        assert_eq!(latest.reference.as_deref(), Some("inv-42"));

        let err = db.sequences().delete(&org, &seq.id, None).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert!(db.sequences().get(&org, &seq.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_get_is_tenant_scoped() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.documents().get("org", "missing").await.unwrap().is_none());
        assert!(db
            .documents()
            .latest_for_sequence("org", "missing")
            .await
            .unwrap()
            .is_none());
    }
}
