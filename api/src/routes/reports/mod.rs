use axum::{Router, middleware::from_fn_with_state, routing::get};
use common::state::AppState;

mod get;

pub use get::{get_session_flags, get_session_summary};

use crate::auth::guards::require_teacher;

pub fn report_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/sessions/{session_id}", get(get_session_summary))
        .route("/sessions/{session_id}/flags", get(get_session_flags))
        .route_layer(from_fn_with_state(app_state, require_teacher))
}
