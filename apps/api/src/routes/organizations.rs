//! Organization switching support.

use axum::{extract::State, Json};
use factura_core::Membership;
use factura_fiscal::FiscalError;

use crate::context::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

/// Organizations the caller belongs to, with their role in each.
pub async fn list_mine(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Membership>>> {
    let memberships = state
        .fiscal
        .database()
        .organizations()
        .memberships_for_user(&user.user_id)
        .await
        .map_err(FiscalError::from)?;
    Ok(Json(memberships))
}
