//! `/dumps` endpoints: submit, history, detail, retriage.

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State, rejection::{JsonRejection, PathRejection, QueryRejection}},
    response::Response,
};
use tracing::instrument;
use triage::EnergyLevel;
use triage_store::DEFAULT_LIST_LIMIT;
use uuid::Uuid;

use crate::{
    core::{
        app_state::AppState,
        current_user::CurrentUser,
        http::response_envelope::{created, ok},
        store_task::run_blocking,
    },
    error_handler::{AppError, AppResult},
    routes::dumps::dump_request::{DumpListItem, ListDumpsQuery, RetriageResponse, SubmitDumpRequest},
    triage_service::Submission,
};

const MAX_LIST_LIMIT: usize = 200;

/// Handler: POST /dumps
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8000/dumps \
///   -H 'content-type: application/json' -H 'x-user-id: alice' \
///   -d '{"input_text":"rent due friday, email Sam, dentist??","energy_level":"low"}'
/// ```
#[instrument(name = "submit_dump_route", skip_all, fields(user = %user.id()))]
pub async fn submit_dump_route(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    body: Result<Json<SubmitDumpRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) = body?;
    let energy_level = body
        .energy_level
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<EnergyLevel>)
        .transpose()
        .map_err(triage::TriageError::from)?;

    let view = state
        .triage
        .submit_dump(
            user.id(),
            Submission {
                input_text: &body.input_text,
                energy_level,
                source: body.source.unwrap_or_default(),
            },
        )
        .await?;
    Ok(created(view))
}

/// Handler: GET /dumps?limit=
pub async fn list_dumps_route(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    query: Result<Query<ListDumpsQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if limit == 0 || limit > MAX_LIST_LIMIT {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_LIST_LIMIT}"
        )));
    }
    let owner = user.id().to_string();
    let items: Vec<DumpListItem> =
        run_blocking(&state.store, move |store| store.list_dumps_for_user(&owner, limit))
            .await?
            .into_iter()
            .map(DumpListItem::from)
            .collect();
    Ok(ok(items))
}

/// Handler: GET /dumps/{id}
pub async fn get_dump_route(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Response> {
    let Path(id) = id?;
    Ok(ok(state.triage.dump_view(user.id(), id).await?))
}

/// Handler: POST /dumps/{id}/retriage
#[instrument(name = "retriage_route", skip_all, fields(user = %user.id()))]
pub async fn retriage_route(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Response> {
    let Path(id) = id?;
    let (view, reused) = state.triage.retriage(user.id(), id).await?;
    Ok(ok(RetriageResponse { reused, view }))
}
