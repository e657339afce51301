use std::sync::Arc;

use axum::{
    extract::{Json, Path, State, rejection::{JsonRejection, PathRejection}},
    response::Response,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    core::{app_state::AppState, current_user::CurrentUser, http::response_envelope::created},
    error_handler::AppResult,
};

/// Body of `POST /runs/{id}/email`.
#[derive(Debug, Deserialize)]
pub struct EmailRunRequest {
    pub to_email: String,
    #[serde(default)]
    pub subject: Option<String>,
}

/// Handler: POST /runs/{id}/email
///
/// Only records the intent; delivery is done by an external consumer.
pub async fn email_run_route(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<EmailRunRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Path(run_id) = id?;
    let Json(body) = body?;
    let email = state
        .triage
        .email_run(user.id(), run_id, &body.to_email, body.subject.as_deref())
        .await?;
    Ok(created(email))
}
