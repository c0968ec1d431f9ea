//! # HTTP Routes
//!
//! ```text
//! /health                                  GET     (no auth)
//! /me/organizations                        GET     (token only)
//! /document-types                          GET POST
//! /document-types/defaults                 POST
//! /document-types/{id}/validation          GET
//! /document-types/{id}/state               GET
//! /document-types/{id}/allocate            POST
//! /validation?scope=all|invoices|quotes    GET
//! /sequences                               GET POST
//! /sequences/preview                       POST
//! /sequences/validate                      POST
//! /sequences/{id}                          GET PATCH DELETE
//! /sequences/{id}/reset                    POST
//! /sequences/{id}/allocate                 POST
//! /sequences/{id}/stats                    GET
//! /sequences/{id}/audit                    GET
//! /sequences/{id}/documents                GET
//! /documents                               POST
//! /documents/{id}                          GET
//! ```

pub mod document_types;
pub mod documents;
pub mod organizations;
pub mod sequences;
pub mod validation;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::state::AppState;

/// Builds the full router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/me/organizations", get(organizations::list_mine))
        .route(
            "/document-types",
            get(document_types::list).post(document_types::register),
        )
        .route("/document-types/defaults", post(document_types::register_defaults))
        .route("/document-types/{id}/validation", get(document_types::validate))
        .route("/document-types/{id}/state", get(document_types::sequence_state))
        .route("/document-types/{id}/allocate", post(document_types::allocate))
        .route("/validation", get(validation::validate_scope))
        .route("/sequences", get(sequences::list).post(sequences::create))
        .route("/sequences/preview", post(sequences::preview))
        .route("/sequences/validate", post(sequences::validate_config))
        .route(
            "/sequences/{id}",
            get(sequences::get)
                .patch(sequences::update)
                .delete(sequences::delete),
        )
        .route("/sequences/{id}/reset", post(sequences::reset))
        .route("/sequences/{id}/allocate", post(sequences::allocate))
        .route("/sequences/{id}/stats", get(sequences::stats))
        .route("/sequences/{id}/audit", get(sequences::audit))
        .route("/sequences/{id}/documents", get(sequences::documents))
        .route("/documents", post(documents::issue))
        .route("/documents/{id}", get(documents::get))
        .with_state(state)
}

/// Health check endpoint.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.fiscal.database().health_check().await {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable" })),
        )
    }
}
