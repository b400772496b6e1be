//! Pure computations over an owner's meal records: per-day totals, averages
//! and rule-based insights. Nothing here touches the store.

pub mod averages;
pub mod daily;
mod handlers;
pub mod insights;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    handlers::analytics_routes()
}
