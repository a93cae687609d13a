use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use common::state::AppState;
use services::session::SessionService;

use super::common::{SessionResponse, SetStatusReq};
use super::post::session_error_response;
use crate::auth::AuthUser;
use crate::response::ApiResponse;

/// PATCH /api/sessions/{session_id}/status
///
/// Moves a session between ACTIVE, CLOSED and ARCHIVED. Only the owning
/// teacher or an admin; ARCHIVED is terminal.
pub async fn set_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<SetStatusReq>,
) -> (StatusCode, Json<ApiResponse<SessionResponse>>) {
    let db = state.db();

    match SessionService::set_status(db, session_id, claims.sub, body.status).await {
        Ok(session) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                SessionResponse::from(session),
                "Session status updated",
            )),
        ),
        Err(e) => session_error_response(e),
    }
}
