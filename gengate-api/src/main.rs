//! # Gengate API Server
//!
//! This is the main API server for Gengate, a credit-gated gateway in
//! front of the Gemini generation API.
//!
//! ## Architecture
//!
//! The API server is built with Axum and provides:
//! - Credit-gated text generation (POST /v1/generate)
//! - Credit balance reads (GET /v1/credits)
//! - Health checks (GET /health)
//!
//! Identity is resolved against the hosted auth service, balances live
//! in PostgreSQL, and generation is proxied to the Gemini API.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p gengate-api
//! ```

use gengate_api::app::{build_router, AppState};
use gengate_api::config::Config;
use gengate_shared::auth::AuthApiClient;
use gengate_shared::credits::PgCreditStore;
use gengate_shared::db::pool::{create_pool, DatabaseConfig};
use gengate_shared::provider::gemini::GeminiClient;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gengate_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Gengate API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    let addr = config.bind_address();

    let state = AppState::new(
        config.clone(),
        Arc::new(AuthApiClient::new(
            config.auth.url.clone(),
            config.auth.api_key.clone(),
        )?),
        Arc::new(PgCreditStore::new(pool)),
        Arc::new(GeminiClient::new(
            &config.gemini.api_url,
            &config.gemini.api_key,
            &config.gemini.model,
        )?),
    );

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Completes once the process receives Ctrl-C
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received, exiting..."),
        Err(err) => {
            // Keep serving; shutdown then falls to the process supervisor.
            tracing::error!(error = %err, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
