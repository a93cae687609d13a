use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{patch, post},
};
use ::common::state::AppState;

mod common;
mod patch;
mod post;

pub use common::SessionResponse;
pub use patch::set_session_status;
pub use post::{create_session, rotate_token};

use crate::auth::guards::require_teacher;

pub fn session_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/{session_id}/status", patch(set_session_status))
        .route("/{session_id}/rotate-token", post(rotate_token))
        .route_layer(from_fn_with_state(app_state, require_teacher))
}
