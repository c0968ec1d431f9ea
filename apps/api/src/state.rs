//! Shared application state.

use std::sync::Arc;

use factura_fiscal::FiscalServices;

use crate::auth::JwtManager;

/// Cloned into every request. Holds no counters; those live in SQLite.
#[derive(Debug, Clone)]
pub struct AppState {
    pub fiscal: FiscalServices,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(fiscal: FiscalServices, jwt: JwtManager) -> Self {
        AppState {
            fiscal,
            jwt: Arc::new(jwt),
        }
    }
}
