//! Batch readiness checks.

use axum::{
    extract::{Query, State},
    Json,
};
use factura_core::{Permission, SequenceValidation};
use serde::Deserialize;

use crate::context::OrgContext;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ValidationQuery {
    /// `all` (default), `invoices` or `quotes`.
    pub scope: Option<String>,
}

pub async fn validate_scope(
    State(state): State<AppState>,
    ctx: OrgContext,
    Query(query): Query<ValidationQuery>,
) -> ApiResult<Json<SequenceValidation>> {
    ctx.require(Permission::ViewSequences)?;
    let validator = state.fiscal.validator();
    let org = &ctx.organization_id;

    let validation = match query.scope.as_deref().unwrap_or("all") {
        "all" => validator.validate_all_sequences(org).await?,
        "invoices" => validator.validate_invoice_sequences(org).await?,
        "quotes" => validator.validate_quote_sequences(org).await?,
        other => {
            return Err(ApiError::InvalidRequest(format!(
                "Unknown scope '{}', expected all, invoices or quotes",
                other
            )))
        }
    };

    Ok(Json(validation))
}
