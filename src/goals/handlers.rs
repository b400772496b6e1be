use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::dto::{GoalProgressResponse, WeightGoalRequest, WeightGoalResponse};
use super::progress::goal_progress;
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn goal_routes() -> Router<AppState> {
    Router::new()
        .route("/settings/weight-goal", get(get_goal).post(save_goal))
        .route("/settings/weight-goal/progress", get(get_progress))
}

#[instrument(skip(state))]
async fn get_goal(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
) -> AppResult<Json<WeightGoalResponse>> {
    let weight_goal = state.store.find_weight_goal(owner_id).await?;
    Ok(Json(WeightGoalResponse { weight_goal }))
}

#[instrument(skip(state, payload))]
async fn save_goal(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    payload: Result<Json<WeightGoalRequest>, JsonRejection>,
) -> AppResult<Json<WeightGoalResponse>> {
    let Json(payload) = payload?;
    let spec = payload.into_spec(OffsetDateTime::now_utc().date())?;
    let saved = state.store.upsert_weight_goal(owner_id, spec).await?;
    info!(%owner_id, goal_id = %saved.id, goal_type = %saved.goal.goal_type, "weight goal saved");
    Ok(Json(WeightGoalResponse {
        weight_goal: Some(saved),
    }))
}

#[instrument(skip(state))]
async fn get_progress(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
) -> AppResult<Json<GoalProgressResponse>> {
    let weight_goal = state
        .store
        .find_weight_goal(owner_id)
        .await?
        .ok_or_else(|| AppError::not_found("No weight goal set"))?;
    let records = state.store.list_meals(owner_id).await?;
    let progress = goal_progress(&weight_goal, &records, OffsetDateTime::now_utc());
    Ok(Json(GoalProgressResponse {
        weight_goal,
        progress,
    }))
}
