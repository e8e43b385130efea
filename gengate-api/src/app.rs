/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use gengate_api::app::{build_router, AppState};
/// use gengate_api::config::Config;
/// use gengate_shared::auth::AuthApiClient;
/// use gengate_shared::credits::PgCreditStore;
/// use gengate_shared::db::pool::{create_pool, DatabaseConfig};
/// use gengate_shared::provider::gemini::GeminiClient;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     max_connections: config.database.max_connections,
///     ..Default::default()
/// })
/// .await?;
///
/// let state = AppState::new(
///     config.clone(),
///     Arc::new(AuthApiClient::new(
///         config.auth.url.clone(),
///         config.auth.api_key.clone(),
///     )?),
///     Arc::new(PgCreditStore::new(pool)),
///     Arc::new(GeminiClient::new(
///         &config.gemini.api_url,
///         &config.gemini.api_key,
///         &config.gemini.model,
///     )?),
/// );
///
/// let app = build_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use gengate_shared::auth::IdentityVerifier;
use gengate_shared::credits::CreditStore;
use gengate_shared::provider::TextGenerator;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning. The three collaborators are
/// trait objects so tests can run the full router without a database,
/// an auth service, or a model endpoint.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,

    /// Resolves bearer tokens to users
    pub verifier: Arc<dyn IdentityVerifier>,

    /// Reads and debits credit balances
    pub credits: Arc<dyn CreditStore>,

    /// Generates text for prompts
    pub model: Arc<dyn TextGenerator>,
}

impl AppState {
    /// Creates new application state
    pub fn new(
        config: Config,
        verifier: Arc<dyn IdentityVerifier>,
        credits: Arc<dyn CreditStore>,
        model: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            verifier,
            credits,
            model,
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// The router is organized as follows:
/// ```text
/// /
/// ├── /health              # Health check (public)
/// └── /v1/                 # API v1 (versioned)
///     ├── POST /generate   # Credit-gated generation
///     └── GET  /credits    # Credit balance
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. Authentication (on /v1 only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Generation and balance routes (require a verified identity)
    let v1_routes = Router::new()
        .route("/generate", post(routes::generate::generate))
        .route("/credits", get(routes::credits::get_credits))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            bearer_auth_layer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Wildcard mode: any origin, browser clients send authorization
        // and content-type on the actual request
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
    } else {
        // Restricted mode: explicit origins only
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    // Combine all routes with middleware stack
    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Bearer authentication middleware layer
///
/// Resolves the caller's bearer token through the identity verifier,
/// then injects the resulting user into request extensions. A header
/// without the `Bearer ` prefix is forwarded to the verifier verbatim.
async fn bearer_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    // Extract Authorization header
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            crate::error::ApiError::Unauthenticated("No authorization header provided".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").unwrap_or(auth_header);

    // Resolve the token to a user
    let user = state.verifier.verify(token).await?;

    // Insert into request extensions
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
