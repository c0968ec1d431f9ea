//! Error types for the HTTP API.
//!
//! Every failure leaves the server as JSON:
//!
//! ```text
//! { "code": "no_active_sequence",
//!   "message": "No active fiscal sequence for document type ...",
//!   "redirect_url": "/settings/fiscal-sequences?document_type=..." }
//! ```
//!
//! | Source                               | Status |
//! |--------------------------------------|--------|
//! | validation, malformed body           | 422    |
//! | duplicate active / in use / conflict | 409    |
//! | no active / inactive sequence        | 412    |
//! | not found                            | 404    |
//! | role lacks permission, not a member  | 403    |
//! | missing or bad token                 | 401    |
//! | store busy past retry budget         | 503    |
//! | anything else                        | 500    |

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use factura_core::{ConfigIssue, CoreError};
use factura_fiscal::{ErrorKind, FiscalError};
use serde::Serialize;

pub type ApiResult<T> = Result<T, ApiError>;

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Fiscal(#[from] FiscalError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Fiscal(err) => match err.kind() {
                ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Precondition => StatusCode::PRECONDITION_FAILED,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Machine-readable code for the front-end.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::Internal(_) => "internal_error",
            ApiError::Fiscal(err) => match err {
                FiscalError::Validation(_) => "validation_error",
                FiscalError::DuplicateActiveSequence { .. } => "duplicate_active_sequence",
                FiscalError::SequenceInUse { .. } => "sequence_in_use",
                FiscalError::Conflict(_) => "conflict",
                FiscalError::NoActiveSequence { .. } => "no_active_sequence",
                FiscalError::SequenceInactive { .. } => "sequence_inactive",
                FiscalError::SequenceExhausted { .. } => "sequence_exhausted",
                FiscalError::NotFound { .. } => "not_found",
                FiscalError::PermissionDenied { .. } => "forbidden",
                FiscalError::TransientStore(_) => "store_unavailable",
                FiscalError::Store(_) | FiscalError::Config(_) => "internal_error",
            },
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Fiscal(err.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    issues: Vec<ConfigIssue>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(error = %self, "Internal error");
            "Internal server error".to_string()
        } else {
            if status.is_server_error() {
                tracing::warn!(error = %self, "Store unavailable");
            } else {
                tracing::debug!(status = %status, error = %self, "Request failed");
            }
            self.to_string()
        };

        let (redirect_url, issues) = match &self {
            ApiError::Fiscal(err) => (err.redirect_url().map(str::to_string), err.issues().to_vec()),
            _ => (None, Vec::new()),
        };

        let body = Json(ErrorBody {
            code: self.code(),
            message,
            redirect_url,
            issues,
        });

        (status, body).into_response()
    }
}

// =============================================================================
// JSON Body Extractor
// =============================================================================

/// `Json<T>` whose rejections use the API error format.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))?;
        Ok(ApiJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factura_core::{ConfigIssues, Permission, Role};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                FiscalError::Validation(ConfigIssues(vec![ConfigIssue::new("prefix", "too long")])),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                FiscalError::DuplicateActiveSequence {
                    document_type_id: "dt".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                FiscalError::SequenceInUse {
                    sequence_id: "s".into(),
                    documents: 3,
                },
                StatusCode::CONFLICT,
            ),
            (
                FiscalError::NoActiveSequence {
                    document_type_id: "dt".into(),
                    redirect_url: "/settings/fiscal-sequences?document_type=dt".into(),
                },
                StatusCode::PRECONDITION_FAILED,
            ),
            (
                FiscalError::SequenceExhausted {
                    sequence_id: "s".into(),
                    redirect_url: "/settings/fiscal-sequences?document_type=dt".into(),
                },
                StatusCode::PRECONDITION_FAILED,
            ),
            (FiscalError::not_found("FiscalSequence", "x"), StatusCode::NOT_FOUND),
            (
                FiscalError::PermissionDenied {
                    role: Role::Viewer,
                    permission: Permission::ManageSequences,
                },
                StatusCode::FORBIDDEN,
            ),
            (FiscalError::TransientStore("locked".into()), StatusCode::SERVICE_UNAVAILABLE),
            (FiscalError::Config("bad".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_codes() {
        let err = ApiError::from(FiscalError::SequenceInactive {
            sequence_id: "s".into(),
            redirect_url: "/x".into(),
        });
        assert_eq!(err.code(), "sequence_inactive");
        let err = ApiError::from(FiscalError::SequenceExhausted {
            sequence_id: "s".into(),
            redirect_url: "/x".into(),
        });
        assert_eq!(err.code(), "sequence_exhausted");
        assert_eq!(ApiError::internal("boom").code(), "internal_error");
    }
}
