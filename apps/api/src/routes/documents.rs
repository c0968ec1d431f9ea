//! Document issuing.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use factura_core::{FiscalDocument, Permission};
use serde::Deserialize;

use crate::context::OrgContext;
use crate::error::{ApiJson, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueDocumentRequest {
    pub document_type_id: String,
    /// Invoice/quote id in the calling application.
    pub reference: Option<String>,
}

/// Validates, allocates and stores in one call. 412 when blocked.
pub async fn issue(
    State(state): State<AppState>,
    ctx: OrgContext,
    ApiJson(body): ApiJson<IssueDocumentRequest>,
) -> ApiResult<(StatusCode, Json<FiscalDocument>)> {
    ctx.require(Permission::IssueDocuments)?;
    let document = state
        .fiscal
        .issuer()
        .issue(
            &ctx.organization_id,
            &body.document_type_id,
            body.reference.as_deref(),
            ctx.actor(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn get(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(id): Path<String>,
) -> ApiResult<Json<FiscalDocument>> {
    ctx.require(Permission::ViewDocuments)?;
    Ok(Json(state.fiscal.issuer().get_document(&ctx.organization_id, &id).await?))
}
