use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use validator::Validate;

use common::format_validation_errors;
use common::state::AppState;
use db::models::{batch, course};
use sea_orm::EntityTrait;
use services::session::{SessionError, SessionService};

use super::common::{CreateSessionReq, SessionResponse};
use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::token_codec;

/// POST /api/sessions
///
/// Opens an ACTIVE session for the caller's class and returns its code and
/// QR token.
pub async fn create_session(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<CreateSessionReq>,
) -> (StatusCode, Json<ApiResponse<SessionResponse>>) {
    let db = state.db();

    if let Err(errors) = body.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format_validation_errors(&errors))),
        );
    }

    match course::Entity::find_by_id(body.course_id).one(db).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error(format!(
                    "Course {} not found.",
                    body.course_id
                ))),
            );
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error while checking course")),
            );
        }
    }
    match batch::Entity::find_by_id(body.batch_id).one(db).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error(format!(
                    "Batch {} not found.",
                    body.batch_id
                ))),
            );
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error while checking batch")),
            );
        }
    }

    match SessionService::create(
        db,
        &token_codec(),
        claims.sub,
        body.course_id,
        body.batch_id,
        body.duration_minutes,
    )
    .await
    {
        Ok(session) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                SessionResponse::from(session),
                "Attendance session created",
            )),
        ),
        Err(e) => {
            tracing::error!(error = %e, "failed to create attendance session");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to create attendance session")),
            )
        }
    }
}

/// POST /api/sessions/{session_id}/rotate-token
///
/// Re-issues the session's QR token. Previously issued tokens stop working
/// immediately.
pub async fn rotate_token(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<SessionResponse>>) {
    let db = state.db();

    match SessionService::rotate_token(db, &token_codec(), session_id, claims.sub).await {
        Ok(session) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                SessionResponse::from(session),
                "Session token rotated",
            )),
        ),
        Err(e) => session_error_response(e),
    }
}

pub(super) fn session_error_response(
    e: SessionError,
) -> (StatusCode, Json<ApiResponse<SessionResponse>>) {
    match e {
        SessionError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Session not found")),
        ),
        SessionError::Forbidden => (
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error(
                "Only the owning teacher or an admin may manage this session",
            )),
        ),
        SessionError::IllegalTransition => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Illegal status transition")),
        ),
        SessionError::InvalidCredential => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Invalid or closed session code")),
        ),
        SessionError::Db(err) => {
            tracing::error!(error = %err, "database error in session route");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error")),
            )
        }
    }
}
