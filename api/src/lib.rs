//! HTTP surface of Quick Catch.
//!
//! Every endpoint answers with the [`crate::core::http::response_envelope::ApiResponse`]
//! envelope and scopes its data to the `X-User-Id` caller.

use std::sync::Arc;

pub mod core;
pub mod error_handler;
mod routes;
pub mod triage_service;

use ai_llm_service::{build_provider, config_from_env};
use axum::{
    Router,
    routing::{get, post},
};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use triage_store::Store;

pub use crate::core::app_state::{AppConfig, AppState, TriageMode};
pub use crate::error_handler::{AppError, AppResult};

use crate::routes::{
    dumps::dump_routes::{get_dump_route, list_dumps_route, retriage_route, submit_dump_route},
    email::email_route::email_run_route,
    health_route::health_route,
    profile::profile_route::{get_profile_route, update_profile_route},
};

/// Builds the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_route))
        .route("/dumps", post(submit_dump_route).get(list_dumps_route))
        .route("/dumps/{id}", get(get_dump_route))
        .route("/dumps/{id}/retriage", post(retriage_route))
        .route("/profile", get(get_profile_route).patch(update_profile_route))
        .route("/runs/{id}/email", post(email_run_route))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Loads configuration from the environment, opens the database and serves
/// until Ctrl+C.
pub async fn start() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let llm_config = config_from_env()?;
    let provider = build_provider(llm_config)?;
    let store = Arc::new(Store::open(&config.database_path)?);

    info!(
        address = %config.api_address,
        database = %config.database_path,
        mode = %config.triage_mode,
        model = %provider.model(),
        provider = ?provider.kind(),
        "starting Quick Catch API"
    );

    let state = Arc::new(AppState::new(store, provider, config.triage_mode));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.api_address)
        .await
        .map_err(|source| AppError::Bind {
            addr: config.api_address.clone(),
            source,
        })?;

    // Start server with graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("server stopped");
    Ok(())
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal; shutting down");
    }
}
