use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use common::state::AppState;
use db::models::class_session;
use services::report::{self, ReportError, SessionSummary};

use crate::response::ApiResponse;
use crate::routes::attendance::AttendanceRecordResponse;

/// GET /api/reports/sessions/{session_id}
///
/// Headline numbers for one session: counts per status, flag totals and the
/// attendance rate against the batch.
pub async fn get_session_summary(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<Option<SessionSummary>>>) {
    let db = state.db();

    match report::session_summary(db, session_id).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(summary),
                "Session summary retrieved",
            )),
        ),
        Err(ReportError::SessionNotFound) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!(
                "Session {} not found.",
                session_id
            ))),
        ),
        Err(ReportError::Db(err)) => {
            tracing::error!(error = %err, session_id, "failed to build session summary");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to build session summary")),
            )
        }
    }
}

/// GET /api/reports/sessions/{session_id}/flags
///
/// Every record in the session that carries at least one flag, for human
/// review.
pub async fn get_session_flags(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<Vec<AttendanceRecordResponse>>>) {
    let db = state.db();

    match class_session::Model::find_by_id(db, session_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error(format!(
                    "Session {} not found.",
                    session_id
                ))),
            );
        }
        Err(err) => {
            tracing::error!(error = %err, session_id, "database error while checking session");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error while checking session")),
            );
        }
    }

    match report::flagged_records(db, session_id).await {
        Ok(records) => {
            let data = records
                .into_iter()
                .map(AttendanceRecordResponse::from)
                .collect();
            (
                StatusCode::OK,
                Json(ApiResponse::success(data, "Flagged records retrieved")),
            )
        }
        Err(err) => {
            tracing::error!(error = %err, session_id, "failed to load flagged records");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to load flagged records")),
            )
        }
    }
}
