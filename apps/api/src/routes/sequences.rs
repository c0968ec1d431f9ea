//! Sequence administration handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use factura_core::numbering::preview_fiscal_number;
use factura_core::validation::{validate_padding_length, validate_sequence_config};
use factura_core::{
    AllocatedNumber, ConfigIssue, FiscalDocument, FiscalSequence, Permission, SequenceAuditEntry, SequenceConfig,
    SequencePatch, SequenceStats,
};
use factura_fiscal::{FiscalError, SequenceDraft};
use serde::{Deserialize, Serialize};

use crate::context::OrgContext;
use crate::error::{ApiJson, ApiResult};
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: i64 = 50;

// =============================================================================
// Request / Response Bodies
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub document_type_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

/// Missing fields take the configured defaults.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSequenceRequest {
    pub document_type_id: String,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub initial_number: Option<i64>,
    pub padding_length: Option<i64>,
    pub is_active: Option<bool>,
}

impl CreateSequenceRequest {
    fn into_draft(self) -> (String, SequenceDraft) {
        (
            self.document_type_id,
            SequenceDraft {
                prefix: self.prefix,
                suffix: self.suffix,
                initial_number: self.initial_number,
                padding_length: self.padding_length,
                is_active: self.is_active,
            },
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreviewRequest {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
    pub number: i64,
    pub padding_length: i64,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub fiscal_number: String,
}

#[derive(Debug, Serialize)]
pub struct ConfigCheckResponse {
    pub is_valid: bool,
    pub issues: Vec<ConfigIssue>,
}

// =============================================================================
// Reads
// =============================================================================

pub async fn list(
    State(state): State<AppState>,
    ctx: OrgContext,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<FiscalSequence>>> {
    ctx.require(Permission::ViewSequences)?;
    let manager = state.fiscal.manager();
    let sequences = match query.document_type_id {
        Some(document_type_id) => {
            manager
                .list_sequences_for_document_type(&ctx.organization_id, &document_type_id)
                .await?
        }
        None => manager.list_sequences(&ctx.organization_id).await?,
    };
    Ok(Json(sequences))
}

pub async fn get(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(id): Path<String>,
) -> ApiResult<Json<FiscalSequence>> {
    ctx.require(Permission::ViewSequences)?;
    Ok(Json(state.fiscal.manager().get_sequence(&ctx.organization_id, &id).await?))
}

pub async fn stats(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(id): Path<String>,
) -> ApiResult<Json<SequenceStats>> {
    ctx.require(Permission::ViewSequences)?;
    Ok(Json(
        state.fiscal.manager().get_sequence_stats(&ctx.organization_id, &id).await?,
    ))
}

pub async fn audit(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<SequenceAuditEntry>>> {
    ctx.require(Permission::ViewSequences)?;
    let entries = state
        .fiscal
        .manager()
        .audit_log(&ctx.organization_id, &id, query.limit.unwrap_or(DEFAULT_LIST_LIMIT))
        .await?;
    Ok(Json(entries))
}

pub async fn documents(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<FiscalDocument>>> {
    ctx.require(Permission::ViewDocuments)?;
    let documents = state
        .fiscal
        .issuer()
        .list_documents(&ctx.organization_id, &id, query.limit.unwrap_or(DEFAULT_LIST_LIMIT))
        .await?;
    Ok(Json(documents))
}

// =============================================================================
// Pure Helpers
// =============================================================================

/// Formats a number the way a sequence would. Touches no counter.
///
/// A padding no sequence could be saved with is rejected with 422.
pub async fn preview(ctx: OrgContext, ApiJson(body): ApiJson<PreviewRequest>) -> ApiResult<Json<PreviewResponse>> {
    ctx.require(Permission::ViewSequences)?;
    validate_padding_length(body.padding_length).map_err(FiscalError::from)?;
    Ok(Json(PreviewResponse {
        fiscal_number: preview_fiscal_number(&body.prefix, &body.suffix, body.number, body.padding_length),
    }))
}

/// Lists every broken rule of a configuration. Always 200.
pub async fn validate_config(
    ctx: OrgContext,
    ApiJson(config): ApiJson<SequenceConfig>,
) -> ApiResult<Json<ConfigCheckResponse>> {
    ctx.require(Permission::ViewSequences)?;
    let issues = validate_sequence_config(&config);
    Ok(Json(ConfigCheckResponse {
        is_valid: issues.is_empty(),
        issues,
    }))
}

// =============================================================================
// Writes
// =============================================================================

pub async fn create(
    State(state): State<AppState>,
    ctx: OrgContext,
    ApiJson(body): ApiJson<CreateSequenceRequest>,
) -> ApiResult<(StatusCode, Json<FiscalSequence>)> {
    ctx.require(Permission::ManageSequences)?;
    let (document_type_id, draft) = body.into_draft();
    let config = state.fiscal.config().sequences.resolve(draft);

    let sequence = state
        .fiscal
        .manager()
        .create_sequence(&ctx.organization_id, &document_type_id, &config, ctx.actor())
        .await?;
    Ok((StatusCode::CREATED, Json(sequence)))
}

/// Partial update. Bodies naming the counter (or any unknown field) are rejected.
pub async fn update(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<SequencePatch>,
) -> ApiResult<Json<FiscalSequence>> {
    ctx.require(Permission::ManageSequences)?;
    let sequence = state
        .fiscal
        .manager()
        .update_sequence(&ctx.organization_id, &id, &patch, ctx.actor())
        .await?;
    Ok(Json(sequence))
}

pub async fn reset(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(id): Path<String>,
) -> ApiResult<Json<FiscalSequence>> {
    ctx.require(Permission::ResetSequences)?;
    let sequence = state
        .fiscal
        .manager()
        .reset_sequence(&ctx.organization_id, &id, ctx.actor())
        .await?;
    Ok(Json(sequence))
}

pub async fn delete(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    ctx.require(Permission::DeleteSequences)?;
    state
        .fiscal
        .manager()
        .delete_sequence(&ctx.organization_id, &id, ctx.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Consumes the next number of this specific sequence.
pub async fn allocate(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<AllocatedNumber>)> {
    ctx.require(Permission::IssueDocuments)?;
    let allocated = state
        .fiscal
        .allocator()
        .allocate_from_sequence(&ctx.organization_id, &id)
        .await?;
    Ok((StatusCode::CREATED, Json(allocated)))
}
