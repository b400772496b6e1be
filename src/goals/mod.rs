use axum::Router;

use crate::state::AppState;

mod dto;
mod handlers;
pub mod progress;

pub fn router() -> Router<AppState> {
    handlers::goal_routes()
}
