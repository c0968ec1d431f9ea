//! # FacturaSaaS API
//!
//! HTTP server for fiscal sequences.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           API Server                                    │
//! │                                                                         │
//! │  Browser ───► HTTP (8080) ───► Routes ───► FiscalServices ───► SQLite   │
//! │                                                                         │
//! │  Any number of instances may share the database file; none of them     │
//! │  keeps counters in memory.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;

use anyhow::Context;
use factura_api::auth::JwtManager;
use factura_api::{router, ApiConfig, AppState};
use factura_db::{Database, DbConfig};
use factura_fiscal::{FiscalConfig, FiscalServices};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,factura=debug,sqlx=warn")),
        )
        .with_target(true)
        .init();

    info!("Starting FacturaSaaS API server...");

    // Load configuration
    let config = ApiConfig::load()?;
    let fiscal_config = FiscalConfig::load(config.fiscal_config_path.clone())?;
    info!(
        port = config.http_port,
        database = %config.database_path.display(),
        settings_path = %fiscal_config.validation.settings_path,
        "Configuration loaded"
    );

    // Open database (runs migrations)
    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.database_max_connections),
    )
    .await
    .context("failed to open database")?;
    info!("Database ready");

    let state = AppState::new(
        FiscalServices::new(db.clone(), fiscal_config),
        JwtManager::new(&config.jwt_secret),
    );
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
