//! # Sequence Validator
//!
//! Answers "can this organization issue documents of type X right now?"
//! before any number is consumed. Read-only.
//!
//! A document type is ready when exactly one of its sequences is active and
//! that sequence passes the configuration rules. Otherwise the result lists
//! the blocking types and points at the settings page.

use factura_core::validation::validate_sequence_config;
use factura_core::{
    DocumentCategory, DocumentType, FiscalSequence, MissingReason, MissingSequence, SequenceState,
    SequenceValidation,
};
use factura_db::{Database, DocumentTypeRepository, SequenceRepository};
use tracing::debug;

use crate::config::ValidationSettings;
use crate::error::{FiscalError, FiscalResult};

/// Read-only checks that document types have a usable active sequence.
#[derive(Debug, Clone)]
pub struct SequenceValidator {
    sequences: SequenceRepository,
    document_types: DocumentTypeRepository,
    settings: ValidationSettings,
}

impl SequenceValidator {
    pub fn new(db: &Database, settings: ValidationSettings) -> Self {
        SequenceValidator {
            sequences: db.sequences(),
            document_types: db.document_types(),
            settings,
        }
    }

    /// Checks a single document type.
    ///
    /// ## Returns
    /// * `Ok(validation)` with `is_valid = false` and a `redirect_url` when
    ///   the type cannot be issued
    /// * `Err(FiscalError::NotFound)` - the type is not in the organization
    pub async fn validate_specific_document_type(
        &self,
        organization_id: &str,
        document_type_id: &str,
    ) -> FiscalResult<SequenceValidation> {
        let document_type = self
            .document_types
            .get(organization_id, document_type_id)
            .await?
            .ok_or_else(|| FiscalError::not_found("DocumentType", document_type_id))?;

        let sequences = self
            .sequences
            .list_for_document_type(organization_id, document_type_id)
            .await?;

        let validation = match find_missing(&document_type, sequences.iter()) {
            None => SequenceValidation::valid(format!(
                "{} ({}) has an active fiscal sequence",
                document_type.name, document_type.code
            )),
            Some(missing) => {
                let message = missing_message(&missing);
                SequenceValidation::invalid(
                    message,
                    vec![missing],
                    self.settings.redirect_url(Some(document_type_id)),
                )
            }
        };

        debug!(
            document_type_id = %document_type_id,
            is_valid = validation.is_valid,
            "Validated document type"
        );
        Ok(validation)
    }

    /// Checks every registered document type.
    pub async fn validate_all_sequences(&self, organization_id: &str) -> FiscalResult<SequenceValidation> {
        let types = self.document_types.list(organization_id).await?;
        self.validate_types(organization_id, &types, "documents").await
    }

    /// Checks the invoice, credit note and debit note types.
    pub async fn validate_invoice_sequences(&self, organization_id: &str) -> FiscalResult<SequenceValidation> {
        let types = self
            .document_types
            .list_by_categories(organization_id, DocumentCategory::INVOICING)
            .await?;
        self.validate_types(organization_id, &types, "invoices").await
    }

    /// Checks the quote types.
    pub async fn validate_quote_sequences(&self, organization_id: &str) -> FiscalResult<SequenceValidation> {
        let types = self
            .document_types
            .list_by_categories(organization_id, DocumentCategory::QUOTING)
            .await?;
        self.validate_types(organization_id, &types, "quotes").await
    }

    /// Where a document type stands. Only `Active` permits allocation.
    pub async fn sequence_state(&self, organization_id: &str, document_type_id: &str) -> FiscalResult<SequenceState> {
        if self.document_types.get(organization_id, document_type_id).await?.is_none() {
            return Err(FiscalError::not_found("DocumentType", document_type_id));
        }

        let sequences = self
            .sequences
            .list_for_document_type(organization_id, document_type_id)
            .await?;
        Ok(SequenceState::from_sequences(&sequences))
    }

    async fn validate_types(
        &self,
        organization_id: &str,
        types: &[DocumentType],
        scope: &str,
    ) -> FiscalResult<SequenceValidation> {
        if types.is_empty() {
            return Ok(SequenceValidation::invalid(
                format!("No document types are registered for {}", scope),
                Vec::new(),
                self.settings.redirect_url(None),
            ));
        }

        let sequences = self.sequences.list(organization_id).await?;
        let missing: Vec<MissingSequence> = types
            .iter()
            .filter_map(|dt| {
                find_missing(
                    dt,
                    sequences.iter().filter(|s| s.document_type_id == dt.id),
                )
            })
            .collect();

        if missing.is_empty() {
            return Ok(SequenceValidation::valid(format!(
                "All {} document types have an active fiscal sequence",
                scope
            )));
        }

        let codes: Vec<&str> = missing.iter().map(|m| m.code.as_str()).collect();
        let redirect_url = self.settings.redirect_url(Some(&missing[0].document_type_id));
        Ok(SequenceValidation::invalid(
            format!("Configure fiscal sequences for: {}", codes.join(", ")),
            missing,
            redirect_url,
        ))
    }
}

/// Why `document_type` can't be issued, or `None` when it can.
fn find_missing<'a>(
    document_type: &DocumentType,
    sequences: impl Iterator<Item = &'a FiscalSequence>,
) -> Option<MissingSequence> {
    let mut any = false;
    let mut active = None;
    for sequence in sequences {
        any = true;
        if sequence.is_active {
            active = Some(sequence);
        }
    }

    let reason = match active {
        Some(sequence) if validate_sequence_config(&sequence.config()).is_empty() => return None,
        Some(_) => MissingReason::InvalidConfiguration,
        None if any => MissingReason::Inactive,
        None => MissingReason::NoSequence,
    };

    Some(MissingSequence {
        document_type_id: document_type.id.clone(),
        code: document_type.code.clone(),
        name: document_type.name.clone(),
        reason,
    })
}

fn missing_message(missing: &MissingSequence) -> String {
    match missing.reason {
        MissingReason::NoSequence => format!("{} ({}) has no fiscal sequence", missing.name, missing.code),
        MissingReason::Inactive => format!("{} ({}) has no active fiscal sequence", missing.name, missing.code),
        MissingReason::InvalidConfiguration => format!(
            "The active fiscal sequence of {} ({}) is misconfigured",
            missing.name, missing.code
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factura_core::SequenceConfig;
    use factura_db::DbConfig;

    async fn setup() -> (Database, SequenceValidator, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let org = db.organizations().create("Acme").await.unwrap().id;
        let validator = SequenceValidator::new(&db, ValidationSettings::default());
        (db, validator, org)
    }

    async fn add_type(db: &Database, org: &str, code: &str, category: DocumentCategory) -> String {
        db.document_types()
            .insert(org, code, code, category)
            .await
            .unwrap()
            .id
    }

    fn active() -> SequenceConfig {
        SequenceConfig {
            prefix: "B01-".into(),
            ..SequenceConfig::default()
        }
    }

    #[tokio::test]
    async fn test_specific_type_without_sequence() {
        let (db, validator, org) = setup().await;
        let dt = add_type(&db, &org, "B01", DocumentCategory::Invoice).await;

        let result = validator.validate_specific_document_type(&org, &dt).await.unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.missing_sequences.len(), 1);
        assert_eq!(result.missing_sequences[0].reason, MissingReason::NoSequence);
        assert_eq!(
            result.redirect_url.as_deref(),
            Some(format!("/settings/fiscal-sequences?document_type={}", dt).as_str())
        );
        assert_eq!(validator.sequence_state(&org, &dt).await.unwrap(), SequenceState::Unconfigured);
    }

    #[tokio::test]
    async fn test_specific_type_inactive_then_active() {
        let (db, validator, org) = setup().await;
        let dt = add_type(&db, &org, "B01", DocumentCategory::Invoice).await;
        let mut config = active();
        config.is_active = false;
        let seq = db.sequences().insert(&org, &dt, &config, None).await.unwrap();

        let result = validator.validate_specific_document_type(&org, &dt).await.unwrap();
        assert_eq!(result.missing_sequences[0].reason, MissingReason::Inactive);
        assert_eq!(validator.sequence_state(&org, &dt).await.unwrap(), SequenceState::Configured);

        let mut activated = seq.clone();
        activated.is_active = true;
        db.sequences().update(&activated, None).await.unwrap();

        let result = validator.validate_specific_document_type(&org, &dt).await.unwrap();
        assert!(result.is_valid);
        assert!(result.missing_sequences.is_empty());
        assert!(result.redirect_url.is_none());
        assert!(validator.sequence_state(&org, &dt).await.unwrap().allows_allocation());
    }

    #[tokio::test]
    async fn test_unknown_type_is_not_found() {
        let (_db, validator, org) = setup().await;
        let err = validator
            .validate_specific_document_type(&org, "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, FiscalError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_batch_validation_by_category() {
        let (db, validator, org) = setup().await;
        let b01 = add_type(&db, &org, "B01", DocumentCategory::Invoice).await;
        let b04 = add_type(&db, &org, "B04", DocumentCategory::CreditNote).await;
        db.sequences().insert(&org, &b01, &active(), None).await.unwrap();

        let invoices = validator.validate_invoice_sequences(&org).await.unwrap();
        assert!(!invoices.is_valid);
        assert_eq!(invoices.missing_sequences.len(), 1);
        assert_eq!(invoices.missing_sequences[0].code, "B04");
        assert!(invoices.redirect_url.unwrap().ends_with(&b04));

        // No quote type registered at all.
        let quotes = validator.validate_quote_sequences(&org).await.unwrap();
        assert!(!quotes.is_valid);
        assert!(quotes.missing_sequences.is_empty());
        assert_eq!(quotes.redirect_url.as_deref(), Some("/settings/fiscal-sequences"));

        let quote = add_type(&db, &org, "QUOTE", DocumentCategory::Quote).await;
        db.sequences().insert(&org, &quote, &active(), None).await.unwrap();
        assert!(validator.validate_quote_sequences(&org).await.unwrap().is_valid);

        db.sequences().insert(&org, &b04, &active(), None).await.unwrap();
        let all = validator.validate_all_sequences(&org).await.unwrap();
        assert!(all.is_valid);
    }
}
