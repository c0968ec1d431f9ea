//! # Request Context
//!
//! Who is calling, for which organization, with which role.
//!
//! ```text
//!  Authorization: Bearer <jwt>   ──► sub = user id          ──► AuthUser
//!  x-organization-id: <org>      ──► membership(org, user)  ──► OrgContext { role }
//! ```
//!
//! Switching organization is just sending a different header; the role is
//! looked up per request, so a revoked membership takes effect immediately.

use axum::{extract::FromRequestParts, http::request::Parts};
use factura_core::{Permission, Role};
use tracing::debug;

use crate::auth::extract_bearer_token;
use crate::error::ApiError;
use crate::state::AppState;

pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// An authenticated user, no organization selected.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::unauthorized("Expected a Bearer token"))?;

        let claims = state.jwt.validate_token(token)?;
        Ok(AuthUser { user_id: claims.sub })
    }
}

/// An authenticated member of the selected organization.
#[derive(Debug, Clone)]
pub struct OrgContext {
    pub user_id: String,
    pub organization_id: String,
    pub role: Role,
}

impl OrgContext {
    /// Fails with 403 when the role lacks `permission`.
    pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
        self.role.require(permission)?;
        Ok(())
    }

    /// Actor recorded in the audit trail.
    pub fn actor(&self) -> Option<&str> {
        Some(&self.user_id)
    }
}

impl FromRequestParts<AppState> for OrgContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;

        let organization_id = parts
            .headers
            .get(ORGANIZATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::InvalidRequest(format!("Missing {} header", ORGANIZATION_HEADER)))?
            .to_string();

        let membership = state
            .fiscal
            .database()
            .organizations()
            .membership(&organization_id, &user.user_id)
            .await
            .map_err(factura_fiscal::FiscalError::from)?
            .ok_or_else(|| ApiError::forbidden("Not a member of this organization"))?;

        debug!(
            user_id = %user.user_id,
            organization_id = %organization_id,
            role = %membership.role,
            "Resolved organization context"
        );

        Ok(OrgContext {
            user_id: user.user_id,
            organization_id,
            role: membership.role,
        })
    }
}
