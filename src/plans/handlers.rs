use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{auth::services::AuthUser, error::AppError, state::AppState};

use super::{
    dto::{
        GroupWeekResponse, MyPlanResponse, SavePlanRequest, SavedPlanResponse, SummaryResponse,
        WeekQuery, WeekStartResponse,
    },
    services::{self, require_week_start},
    week::current_week_start,
};

pub fn plan_routes() -> Router<AppState> {
    Router::new()
        .route("/weeks/current", get(current_week))
        .route("/plans", post(save_plan))
        .route("/plans/mine", get(my_plan))
        .route("/plans/mine/:week_start", get(my_plan_for))
        .route("/plans/week", get(group_week))
        .route("/plans/week/:week_start", get(group_week_for))
        .route("/plans/summary", get(summary))
        .route("/plans/summary/:week_start", get(summary_for))
}

/// A week named in the path is used verbatim. One that cannot be decoded is
/// rejected rather than replaced.
fn explicit_week(path: Result<Path<String>, PathRejection>) -> Result<String, AppError> {
    let Path(week_start) = path.map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(require_week_start(Some(week_start.as_str()))?.to_string())
}

/// The current week in the configured timezone, shifted by `?offset=`.
fn default_week(
    state: &AppState,
    query: Result<Query<WeekQuery>, QueryRejection>,
) -> Result<String, AppError> {
    let Query(q) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let week_start = current_week_start(state.config.week.utc_offset, q.offset)?;
    debug!(offset = q.offset, %week_start, "resolved default week");
    Ok(week_start)
}

#[instrument(skip(state))]
pub async fn current_week(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    query: Result<Query<WeekQuery>, QueryRejection>,
) -> Result<Json<WeekStartResponse>, AppError> {
    let week_start = default_week(&state, query)?;
    Ok(Json(WeekStartResponse { week_start }))
}

#[instrument(skip(state, payload))]
pub async fn save_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<SavePlanRequest>, JsonRejection>,
) -> Result<Json<SavedPlanResponse>, AppError> {
    let Json(body) = payload?;
    let saved = services::save_week_plan(
        state.plans.as_ref(),
        &state.config.pricing,
        user_id,
        body.week_start.as_deref(),
        body.days.as_ref(),
    )
    .await?;
    Ok(Json(saved.into()))
}

#[instrument(skip(state))]
pub async fn my_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<WeekQuery>, QueryRejection>,
) -> Result<Json<MyPlanResponse>, AppError> {
    let week_start = default_week(&state, query)?;
    render_my_plan(&state, user_id, &week_start).await
}

#[instrument(skip(state))]
pub async fn my_plan_for(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<MyPlanResponse>, AppError> {
    let week_start = explicit_week(path)?;
    render_my_plan(&state, user_id, &week_start).await
}

async fn render_my_plan(
    state: &AppState,
    user_id: Uuid,
    week_start: &str,
) -> Result<Json<MyPlanResponse>, AppError> {
    let week =
        services::my_week(state.plans.as_ref(), &state.config.pricing, user_id, week_start).await?;
    Ok(Json(week.into()))
}

#[instrument(skip(state))]
pub async fn group_week(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    query: Result<Query<WeekQuery>, QueryRejection>,
) -> Result<Json<GroupWeekResponse>, AppError> {
    let week_start = default_week(&state, query)?;
    let group =
        services::group_week(state.plans.as_ref(), &state.config.pricing, &week_start).await?;
    Ok(Json(group.into()))
}

#[instrument(skip(state))]
pub async fn group_week_for(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<GroupWeekResponse>, AppError> {
    let week_start = explicit_week(path)?;
    let group =
        services::group_week(state.plans.as_ref(), &state.config.pricing, &week_start).await?;
    Ok(Json(group.into()))
}

#[instrument(skip(state))]
pub async fn summary(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    query: Result<Query<WeekQuery>, QueryRejection>,
) -> Result<Json<SummaryResponse>, AppError> {
    let week_start = default_week(&state, query)?;
    let group =
        services::group_week(state.plans.as_ref(), &state.config.pricing, &week_start).await?;
    Ok(Json(group.into()))
}

#[instrument(skip(state))]
pub async fn summary_for(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<SummaryResponse>, AppError> {
    let week_start = explicit_week(path)?;
    let group =
        services::group_week(state.plans.as_ref(), &state.config.pricing, &week_start).await?;
    Ok(Json(group.into()))
}
