use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::{error, instrument};

use super::service::{generate_prediction, latest_prediction, PredictionOutcome};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    models::HealthPrediction,
    state::AppState,
};

pub fn prediction_routes() -> Router<AppState> {
    Router::new().route("/health/predict", get(get_prediction).post(run_prediction))
}

#[derive(Debug, Serialize)]
struct PredictionResponse<T> {
    prediction: T,
}

#[instrument(skip(state))]
async fn get_prediction(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
) -> AppResult<Json<PredictionResponse<Option<HealthPrediction>>>> {
    let prediction = latest_prediction(state.store.as_ref(), owner_id).await?;
    Ok(Json(PredictionResponse { prediction }))
}

#[instrument(skip(state))]
async fn run_prediction(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
) -> AppResult<Json<PredictionResponse<PredictionOutcome>>> {
    let prediction = generate_prediction(state.store.as_ref(), state.oracle.as_ref(), owner_id)
        .await
        .map_err(|e| {
            error!(%owner_id, error = %e, "health prediction failed");
            AppError::Internal("Failed to generate health prediction".into())
        })?;
    Ok(Json(PredictionResponse { prediction }))
}
