use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::dto::{AnalyzeResponse, DeletedResponse, MealPayload};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{parse_iso_date, MealRecord},
    oracle,
    state::AppState,
};

const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

pub fn meal_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals).post(create_meal))
        .route("/meals/by-date/:date", get(list_meals_on))
        .route(
            "/meals/:id",
            get(get_meal).put(update_meal).delete(delete_meal),
        )
}

pub fn analyze_routes() -> Router<AppState> {
    Router::new()
        .route("/food/analyze", post(analyze_food))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES))
}

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
) -> AppResult<Json<Vec<MealRecord>>> {
    Ok(Json(state.store.list_meals(owner_id).await?))
}

#[instrument(skip(state))]
pub async fn list_meals_on(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(date): Path<String>,
) -> AppResult<Json<Vec<MealRecord>>> {
    let day = parse_iso_date(&date)
        .ok_or_else(|| AppError::validation(format!("date `{date}` is not YYYY-MM-DD")))?;
    Ok(Json(state.store.list_meals_on(owner_id, day).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_meal(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    payload: Result<Json<MealPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MealRecord>)> {
    let Json(payload) = payload?;
    let draft = payload.into_draft().map_err(|e| {
        warn!(%owner_id, error = %e, "meal rejected");
        e
    })?;
    let record = state.store.create_meal(owner_id, draft).await?;
    info!(%owner_id, meal_id = %record.id, "meal logged");
    Ok((StatusCode::CREATED, Json(record)))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MealRecord>> {
    state
        .store
        .find_meal(owner_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Food not found"))
}

#[instrument(skip(state, payload))]
pub async fn update_meal(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<MealPayload>, JsonRejection>,
) -> AppResult<Json<MealRecord>> {
    let Json(payload) = payload?;
    let draft = payload.into_draft()?;
    let record = state
        .store
        .update_meal(owner_id, id, draft)
        .await?
        .ok_or_else(|| AppError::not_found("Food not found"))?;
    info!(%owner_id, meal_id = %id, "meal replaced");
    Ok(Json(record))
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DeletedResponse>> {
    if !state.store.delete_meal(owner_id, id).await? {
        return Err(AppError::not_found("Food not found"));
    }
    info!(%owner_id, meal_id = %id, "meal deleted");
    Ok(Json(DeletedResponse {
        message: "Food deleted successfully",
    }))
}

/// POST /food/analyze (multipart field `file`). Returns the extracted
/// nutrition for the client to confirm; nothing is stored.
#[instrument(skip(state, mp))]
pub async fn analyze_food(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    mut mp: Multipart,
) -> AppResult<Json<AnalyzeResponse>> {
    let mut upload = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::validation(e.body_text()))?
    {
        if field.name() == Some("file") {
            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| "image/jpeg".into());
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            upload = Some((data, content_type));
            break;
        }
    }
    let Some((image, content_type)) = upload.filter(|(data, _)| !data.is_empty()) else {
        return Err(AppError::validation("No file provided"));
    };

    let extracted = state
        .oracle
        .analyze_image(image, &content_type)
        .await
        .and_then(|raw| oracle::parse_extracted_meal(&raw))
        .map_err(|e| {
            error!(%owner_id, error = %e, "food image analysis failed");
            AppError::Internal("Failed to analyze food image".into())
        })?;

    info!(%owner_id, items = extracted.food_items.len(), "food image analyzed");
    Ok(Json(AnalyzeResponse {
        success: true,
        extracted,
    }))
}
