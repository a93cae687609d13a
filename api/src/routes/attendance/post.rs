use axum::{
    Extension, Json,
    extract::{ConnectInfo, State},
    http::StatusCode,
};
use std::net::SocketAddr;
use validator::Validate;

use common::format_validation_errors;
use common::state::AppState;
use services::verification::VerifyError;

use super::common::{AttendanceRecordResponse, VerifyAttendanceReq, VerifyAttendanceResponse};
use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::verification_engine;

/// POST /api/attendance/verify
///
/// One scan or code entry from a student's device. The outcome is always
/// exactly one of: recorded (clean or flagged), already marked, invalid
/// session, or a strict-policy device-reuse rejection.
pub async fn verify_attendance(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<VerifyAttendanceReq>,
) -> (StatusCode, Json<ApiResponse<VerifyAttendanceResponse>>) {
    let db = state.db();

    if let Err(errors) = body.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format_validation_errors(&errors))),
        );
    }

    let engine = verification_engine();
    let ip = Some(addr.ip().to_string());

    match engine
        .mark_attendance(db, &body.code, claims.sub, &body.device_id, ip)
        .await
    {
        Ok(ok) => {
            let flags: Vec<String> = ok.flags.iter().map(|f| f.as_code().into()).collect();
            let message = if flags.is_empty() {
                "Attendance recorded"
            } else {
                "Attendance recorded with flags"
            };
            (
                StatusCode::OK,
                Json(ApiResponse::success(
                    VerifyAttendanceResponse {
                        record: Some(AttendanceRecordResponse::from(ok.record)),
                        flags,
                    },
                    message,
                )),
            )
        }
        Err(VerifyError::InvalidSession) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Invalid or closed session code")),
        ),
        Err(VerifyError::AlreadyMarked) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(
                "Attendance already marked for this session",
            )),
        ),
        Err(VerifyError::DeviceReuseRejected) => (
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error(
                "This device has already marked attendance for another student",
            )),
        ),
        Err(VerifyError::Db(err)) => {
            tracing::error!(error = %err, student_id = claims.sub, "failed to record attendance");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to record attendance")),
            )
        }
    }
}
