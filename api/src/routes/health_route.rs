use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Response};
use serde::Serialize;
use triage_store::StoreError;

use crate::core::{
    app_state::AppState, http::response_envelope::ApiResponse, store_task::run_blocking,
};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub triage_mode: String,
}

/// Handler: GET /health
pub async fn health_route(State(state): State<Arc<AppState>>) -> Response {
    let reachable = run_blocking(&state.store, |store| Ok::<_, StoreError>(store.health_check()))
        .await
        .unwrap_or(false);
    if reachable {
        ApiResponse::success(HealthResponse {
            status: "ok",
            triage_mode: state.triage.mode().to_string(),
        })
        .into_response_with_status(StatusCode::OK)
    } else {
        ApiResponse::<()>::error("DB_ERROR", "database is not reachable", Vec::new())
            .into_response_with_status(StatusCode::SERVICE_UNAVAILABLE)
    }
}
