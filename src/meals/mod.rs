use axum::Router;

use crate::state::AppState;

mod dto;
mod handlers;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::meal_routes())
        .merge(handlers::analyze_routes())
}
