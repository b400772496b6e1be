//! Health predictions: summarise the owner's meals, ask the oracle, keep the
//! latest validated answer.

mod handlers;
pub mod service;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    handlers::prediction_routes()
}
