//! # Document Type Repository
//!
//! Per-organization catalogue of document types (`B01`, `B02`, `QUOTE`, ...).
//! `(organization_id, code)` is unique.

use chrono::Utc;
use factura_core::{DocumentCategory, DocumentType};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Repository for document type database operations.
#[derive(Debug, Clone)]
pub struct DocumentTypeRepository {
    pool: SqlitePool,
}

impl DocumentTypeRepository {
    /// Creates a new DocumentTypeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DocumentTypeRepository { pool }
    }

    /// Inserts a document type.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - the code is already registered
    /// * `Err(DbError::NotFound)` - the organization doesn't exist
    pub async fn insert(
        &self,
        organization_id: &str,
        code: &str,
        name: &str,
        category: DocumentCategory,
    ) -> DbResult<DocumentType> {
        let document_type = DocumentType {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            code: code.trim().to_string(),
            name: name.trim().to_string(),
            category,
            created_at: Utc::now(),
        };

        debug!(
            organization_id = %organization_id,
            code = %document_type.code,
            "Inserting document type"
        );

        sqlx::query(
            r#"
            INSERT INTO document_types (id, organization_id, code, name, category, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&document_type.id)
        .bind(&document_type.organization_id)
        .bind(&document_type.code)
        .bind(&document_type.name)
        .bind(document_type.category)
        .bind(document_type.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("code", &document_type.code),
            DbError::ForeignKeyViolation { .. } => DbError::not_found("Organization", organization_id),
            other => other,
        })?;

        Ok(document_type)
    }

    /// Gets a document type by id within an organization.
    pub async fn get(&self, organization_id: &str, id: &str) -> DbResult<Option<DocumentType>> {
        let document_type = sqlx::query_as::<_, DocumentType>(
            r#"
            SELECT id, organization_id, code, name, category, created_at
            FROM document_types
            WHERE organization_id = ?1 AND id = ?2
            "#,
        )
        .bind(organization_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(document_type)
    }

    /// Gets a document type by its business code (case-sensitive).
    pub async fn get_by_code(&self, organization_id: &str, code: &str) -> DbResult<Option<DocumentType>> {
        let document_type = sqlx::query_as::<_, DocumentType>(
            r#"
            SELECT id, organization_id, code, name, category, created_at
            FROM document_types
            WHERE organization_id = ?1 AND code = ?2
            "#,
        )
        .bind(organization_id)
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(document_type)
    }

    /// Lists every document type of an organization, ordered by code.
    pub async fn list(&self, organization_id: &str) -> DbResult<Vec<DocumentType>> {
        let document_types = sqlx::query_as::<_, DocumentType>(
            r#"
            SELECT id, organization_id, code, name, category, created_at
            FROM document_types
            WHERE organization_id = ?1
            ORDER BY code
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(organization_id = %organization_id, count = document_types.len(), "Listed document types");
        Ok(document_types)
    }

    /// Lists the document types whose category is in `categories`.
    pub async fn list_by_categories(
        &self,
        organization_id: &str,
        categories: &[DocumentCategory],
    ) -> DbResult<Vec<DocumentType>> {
        if categories.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT id, organization_id, code, name, category, created_at \
             FROM document_types WHERE organization_id = ",
        );
        query.push_bind(organization_id);
        query.push(" AND category IN (");
        let mut separated = query.separated(", ");
        for category in categories {
            separated.push_bind(*category);
        }
        separated.push_unseparated(") ORDER BY code");

        let document_types = query
            .build_query_as::<DocumentType>()
            .fetch_all(&self.pool)
            .await?;

        Ok(document_types)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use factura_core::DocumentCategory;

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let org = db.organizations().create("Acme").await.unwrap();
        (db, org.id)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (db, org) = setup().await;
        let repo = db.document_types();

        let b01 = repo
            .insert(&org, "B01", "Crédito Fiscal", DocumentCategory::Invoice)
            .await
            .unwrap();

        let fetched = repo.get(&org, &b01.id).await.unwrap().unwrap();
        assert_eq!(fetched.code, "B01");
        assert_eq!(fetched.category, DocumentCategory::Invoice);

        let by_code = repo.get_by_code(&org, "B01").await.unwrap().unwrap();
        assert_eq!(by_code.id, b01.id);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let (db, org) = setup().await;
        let repo = db.document_types();

        repo.insert(&org, "B01", "One", DocumentCategory::Invoice).await.unwrap();
        let err = repo
            .insert(&org, "B01", "Two", DocumentCategory::Invoice)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "code"));
    }

    #[tokio::test]
    async fn test_scoped_to_organization() {
        let (db, org) = setup().await;
        let other = db.organizations().create("Other").await.unwrap();
        let repo = db.document_types();

        let b01 = repo.insert(&org, "B01", "One", DocumentCategory::Invoice).await.unwrap();
        // Same code is fine in another tenant.
        repo.insert(&other.id, "B01", "One", DocumentCategory::Invoice).await.unwrap();

        assert!(repo.get(&other.id, &b01.id).await.unwrap().is_none());
        assert_eq!(repo.list(&org).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_by_categories() {
        let (db, org) = setup().await;
        let repo = db.document_types();

        repo.insert(&org, "B01", "Factura", DocumentCategory::Invoice).await.unwrap();
        repo.insert(&org, "B04", "Nota", DocumentCategory::CreditNote).await.unwrap();
        repo.insert(&org, "QUOTE", "Cotización", DocumentCategory::Quote).await.unwrap();

        let invoicing = repo
            .list_by_categories(&org, DocumentCategory::INVOICING)
            .await
            .unwrap();
        let codes: Vec<&str> = invoicing.iter().map(|t| t.code.as_str()).collect();
        assert_eq!(codes, vec!["B01", "B04"]);

        let quotes = repo.list_by_categories(&org, DocumentCategory::QUOTING).await.unwrap();
        assert_eq!(quotes.len(), 1);

        assert!(repo.list_by_categories(&org, &[]).await.unwrap().is_empty());
    }
}
