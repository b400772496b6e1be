use axum::{extract::State, routing::get, Json, Router};
use tracing::{debug, instrument};

use super::{
    averages::MealOverview,
    daily::{daily_totals, DailyNutrition},
    insights::{health_insights, HealthInsight},
};
use crate::{auth::AuthUser, error::AppResult, state::AppState};

pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/analytics/trends", get(trends))
        .route("/analytics/insights", get(insights))
        .route("/analytics/summary", get(summary))
}

#[instrument(skip(state))]
async fn trends(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
) -> AppResult<Json<Vec<DailyNutrition>>> {
    let records = state.store.list_meals(owner_id).await?;
    let days = daily_totals(&records);
    debug!(%owner_id, days = days.len(), "daily totals computed");
    Ok(Json(days))
}

#[instrument(skip(state))]
async fn insights(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
) -> AppResult<Json<Vec<HealthInsight>>> {
    let records = state.store.list_meals(owner_id).await?;
    Ok(Json(health_insights(&records)))
}

#[instrument(skip(state))]
async fn summary(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
) -> AppResult<Json<MealOverview>> {
    let records = state.store.list_meals(owner_id).await?;
    Ok(Json(MealOverview::from_records(&records)))
}
