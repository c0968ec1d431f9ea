//! Document type catalog, per-type validation and allocation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use factura_core::{AllocatedNumber, DocumentCategory, DocumentType, Permission, SequenceState, SequenceValidation};
use serde::{Deserialize, Serialize};

use crate::context::OrgContext;
use crate::error::{ApiJson, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterDocumentType {
    pub code: String,
    pub name: String,
    pub category: DocumentCategory,
}

#[derive(Debug, Serialize)]
pub struct DocumentTypeState {
    pub document_type_id: String,
    pub state: SequenceState,
    pub allows_allocation: bool,
}

pub async fn list(State(state): State<AppState>, ctx: OrgContext) -> ApiResult<Json<Vec<DocumentType>>> {
    ctx.require(Permission::ViewSequences)?;
    Ok(Json(state.fiscal.registry().list(&ctx.organization_id).await?))
}

pub async fn register(
    State(state): State<AppState>,
    ctx: OrgContext,
    ApiJson(body): ApiJson<RegisterDocumentType>,
) -> ApiResult<(StatusCode, Json<DocumentType>)> {
    ctx.require(Permission::ManageDocumentTypes)?;
    let document_type = state
        .fiscal
        .registry()
        .register(&ctx.organization_id, &body.code, &body.name, body.category)
        .await?;
    Ok((StatusCode::CREATED, Json(document_type)))
}

/// Seeds the default catalog. Existing codes are left alone.
pub async fn register_defaults(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> ApiResult<Json<Vec<DocumentType>>> {
    ctx.require(Permission::ManageDocumentTypes)?;
    Ok(Json(
        state.fiscal.registry().register_defaults(&ctx.organization_id).await?,
    ))
}

pub async fn validate(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(id): Path<String>,
) -> ApiResult<Json<SequenceValidation>> {
    ctx.require(Permission::ViewSequences)?;
    let validation = state
        .fiscal
        .validator()
        .validate_specific_document_type(&ctx.organization_id, &id)
        .await?;
    Ok(Json(validation))
}

pub async fn sequence_state(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(id): Path<String>,
) -> ApiResult<Json<DocumentTypeState>> {
    ctx.require(Permission::ViewSequences)?;
    let sequence_state = state
        .fiscal
        .validator()
        .sequence_state(&ctx.organization_id, &id)
        .await?;
    Ok(Json(DocumentTypeState {
        document_type_id: id,
        state: sequence_state,
        allows_allocation: sequence_state.allows_allocation(),
    }))
}

/// Consumes the next number of the type's active sequence.
pub async fn allocate(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<AllocatedNumber>)> {
    ctx.require(Permission::IssueDocuments)?;
    let allocated = state.fiscal.allocator().allocate(&ctx.organization_id, &id).await?;
    Ok((StatusCode::CREATED, Json(allocated)))
}
