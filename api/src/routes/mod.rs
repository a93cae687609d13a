use axum::{Router, routing::get};
use ::common::state::AppState;

pub mod attendance;
pub mod common;
pub mod health;
pub mod reports;
pub mod sessions;

/// Builds the `/api` route tree.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .nest("/sessions", sessions::session_routes(app_state.clone()))
        .nest(
            "/attendance",
            attendance::attendance_routes(app_state.clone()),
        )
        .nest("/reports", reports::report_routes(app_state.clone()))
        .with_state(app_state)
}
