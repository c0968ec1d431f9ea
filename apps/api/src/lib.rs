//! # FacturaSaaS API
//!
//! HTTP front of the fiscal sequence services.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Request Path                                  │
//! │                                                                         │
//! │  Client ──► axum Router ──► OrgContext ──► role.require(permission)     │
//! │                                 │                    │                  │
//! │                  JWT sub + x-organization-id         ▼                  │
//! │                                          FiscalServices ──► SQLite      │
//! │                                                     │                   │
//! │                     ApiError { code, message, redirect_url? } ◄─┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `HTTP_PORT` - HTTP port (default: 8080)
//! - `DATABASE_PATH` - SQLite file (default: ./factura.db)
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 8)
//! - `JWT_SECRET` - Secret used to verify bearer tokens
//! - `FISCAL_CONFIG_PATH` - fiscal.toml location (optional)
//! - `RUST_LOG` - Log filter (default: info,factura=debug,sqlx=warn)

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod routes;
pub mod state;

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::AppState;
