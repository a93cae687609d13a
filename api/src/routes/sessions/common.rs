use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use db::models::class_session::{Model as ClassSession, Status};

#[derive(Deserialize, Validate)]
pub struct CreateSessionReq {
    pub course_id: i64,
    pub batch_id: i64,
    #[validate(range(min = 1, max = 480, message = "duration_minutes must be between 1 and 480"))]
    pub duration_minutes: i64,
}

#[derive(Deserialize)]
pub struct SetStatusReq {
    pub status: Status,
}

/// Session payload returned to teachers. `current_token` is what the
/// classroom screen renders as a QR code.
#[derive(Serialize, Default)]
pub struct SessionResponse {
    pub id: i64,
    pub teacher_id: i64,
    pub course_id: i64,
    pub batch_id: i64,
    pub status: String,
    pub session_code: String,
    pub current_token: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<ClassSession> for SessionResponse {
    fn from(s: ClassSession) -> Self {
        Self {
            id: s.id,
            teacher_id: s.teacher_id,
            course_id: s.course_id,
            batch_id: s.batch_id,
            status: s.status.to_string(),
            session_code: s.session_code,
            current_token: s.current_token,
            start_time: Some(s.start_time),
            end_time: Some(s.end_time),
            created_at: Some(s.created_at),
        }
    }
}
