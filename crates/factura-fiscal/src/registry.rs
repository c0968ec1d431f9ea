//! # Document Type Registry
//!
//! The catalog of document types an organization can number.

use factura_core::validation::{validate_document_type_code, validate_document_type_name};
use factura_core::{DocumentCategory, DocumentType, DEFAULT_DOCUMENT_TYPES};
use factura_db::{DbError, DocumentTypeRepository};
use tracing::{debug, info};

use crate::error::{FiscalError, FiscalResult};

/// Document types of an organization.
#[derive(Debug, Clone)]
pub struct DocumentTypeRegistry {
    repo: DocumentTypeRepository,
}

impl DocumentTypeRegistry {
    pub fn new(repo: DocumentTypeRepository) -> Self {
        DocumentTypeRegistry { repo }
    }

    /// All document types of the organization, ordered by code.
    pub async fn list(&self, organization_id: &str) -> FiscalResult<Vec<DocumentType>> {
        Ok(self.repo.list(organization_id).await?)
    }

    pub async fn list_by_categories(
        &self,
        organization_id: &str,
        categories: &[DocumentCategory],
    ) -> FiscalResult<Vec<DocumentType>> {
        Ok(self.repo.list_by_categories(organization_id, categories).await?)
    }

    /// Gets a document type, failing with `NotFound` outside the organization.
    pub async fn get(&self, organization_id: &str, id: &str) -> FiscalResult<DocumentType> {
        self.repo
            .get(organization_id, id)
            .await?
            .ok_or_else(|| FiscalError::not_found("DocumentType", id))
    }

    pub async fn get_by_code(&self, organization_id: &str, code: &str) -> FiscalResult<Option<DocumentType>> {
        Ok(self.repo.get_by_code(organization_id, code.trim()).await?)
    }

    /// Registers a new document type.
    ///
    /// ## Returns
    /// * `Err(FiscalError::Validation)` - bad code or name
    /// * `Err(FiscalError::Conflict)` - the code is already registered
    pub async fn register(
        &self,
        organization_id: &str,
        code: &str,
        name: &str,
        category: DocumentCategory,
    ) -> FiscalResult<DocumentType> {
        let code = code.trim();
        let name = name.trim();
        validate_document_type_code(code)?;
        validate_document_type_name(name)?;

        let document_type = self
            .repo
            .insert(organization_id, code, name, category)
            .await
            .map_err(|e| match e {
                DbError::UniqueViolation { .. } => {
                    FiscalError::Conflict(format!("Document type code '{}' already exists", code))
                }
                other => other.into(),
            })?;

        info!(
            organization_id = %organization_id,
            code = %document_type.code,
            category = %category.as_str(),
            "Document type registered"
        );
        Ok(document_type)
    }

    /// Registers the default document types that are not present yet.
    ///
    /// Safe to call repeatedly. Returns the full list afterwards.
    pub async fn register_defaults(&self, organization_id: &str) -> FiscalResult<Vec<DocumentType>> {
        for template in DEFAULT_DOCUMENT_TYPES {
            if self.repo.get_by_code(organization_id, template.code).await?.is_some() {
                debug!(code = template.code, "Default document type already present");
                continue;
            }
            match self
                .register(organization_id, template.code, template.name, template.category)
                .await
            {
                Ok(_) | Err(FiscalError::Conflict(_)) => {}
                Err(e) => return Err(e),
            }
        }

        self.list(organization_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factura_db::{Database, DbConfig};

    async fn setup() -> (DocumentTypeRegistry, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let org = db.organizations().create("Acme").await.unwrap().id;
        (DocumentTypeRegistry::new(db.document_types()), org)
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let (registry, org) = setup().await;

        let dt = registry
            .register(&org, " B01 ", "Crédito Fiscal", DocumentCategory::Invoice)
            .await
            .unwrap();
        assert_eq!(dt.code, "B01");

        let fetched = registry.get(&org, &dt.id).await.unwrap();
        assert_eq!(fetched.name, "Crédito Fiscal");
        assert!(registry.get_by_code(&org, "B01").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let (registry, org) = setup().await;

        let err = registry
            .register(&org, "B 01", "Bad", DocumentCategory::Invoice)
            .await
            .unwrap_err();
        assert!(matches!(err, FiscalError::Validation(_)));

        let err = registry
            .register(&org, "B01", "", DocumentCategory::Invoice)
            .await
            .unwrap_err();
        assert_eq!(err.issues()[0].field, "name");
    }

    #[tokio::test]
    async fn test_duplicate_code_is_conflict() {
        let (registry, org) = setup().await;
        registry
            .register(&org, "B02", "Consumo", DocumentCategory::Invoice)
            .await
            .unwrap();

        let err = registry
            .register(&org, "B02", "Otra", DocumentCategory::Invoice)
            .await
            .unwrap_err();
        assert!(matches!(err, FiscalError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_get_from_other_org_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let org_a = db.organizations().create("A").await.unwrap().id;
        let org_b = db.organizations().create("B").await.unwrap().id;
        let registry = DocumentTypeRegistry::new(db.document_types());

        let dt = registry
            .register(&org_a, "B01", "Crédito Fiscal", DocumentCategory::Invoice)
            .await
            .unwrap();

        let err = registry.get(&org_b, &dt.id).await.unwrap_err();
        assert!(matches!(err, FiscalError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_register_defaults_is_idempotent() {
        let (registry, org) = setup().await;
        registry
            .register(&org, "B01", "Mi Crédito Fiscal", DocumentCategory::Invoice)
            .await
            .unwrap();

        let first = registry.register_defaults(&org).await.unwrap();
        let second = registry.register_defaults(&org).await.unwrap();
        assert_eq!(first.len(), DEFAULT_DOCUMENT_TYPES.len());
        assert_eq!(first, second);

        let b01 = registry.get_by_code(&org, "B01").await.unwrap().unwrap();
        assert_eq!(b01.name, "Mi Crédito Fiscal");

        let quotes = registry
            .list_by_categories(&org, DocumentCategory::QUOTING)
            .await
            .unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].code, "QUOTE");
    }
}
