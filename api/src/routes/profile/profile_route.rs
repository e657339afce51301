use std::sync::Arc;

use axum::{
    extract::{Json, State, rejection::JsonRejection},
    response::Response,
};
use triage_store::ProfileUpdate;

use crate::{
    core::{
        app_state::AppState, current_user::CurrentUser, http::response_envelope::ok,
        store_task::run_blocking,
    },
    error_handler::AppResult,
};

/// Handler: GET /profile (created with defaults on first access)
pub async fn get_profile_route(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> AppResult<Response> {
    let owner = user.id().to_string();
    let profile = run_blocking(&state.store, move |store| {
        store.ensure_user(&owner)?;
        store.get_or_create_profile(&owner)
    })
    .await?;
    Ok(ok(profile))
}

/// Handler: PATCH /profile
pub async fn update_profile_route(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> AppResult<Response> {
    let Json(update) = body?;
    let owner = user.id().to_string();
    let profile = run_blocking(&state.store, move |store| {
        store.ensure_user(&owner)?;
        store.update_profile(&owner, &update)
    })
    .await?;
    Ok(ok(profile))
}
