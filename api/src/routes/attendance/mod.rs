use axum::{Router, middleware::from_fn_with_state, routing::post};
use ::common::state::AppState;

mod common;
mod post;

pub use common::AttendanceRecordResponse;
pub use post::verify_attendance;

use crate::auth::guards::require_student;

pub fn attendance_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/verify", post(verify_attendance))
        .route_layer(from_fn_with_state(app_state, require_student))
}
