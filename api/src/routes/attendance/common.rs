use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use db::models::attendance_record::Model as AttendanceRecord;

#[derive(Deserialize, Validate)]
pub struct VerifyAttendanceReq {
    /// Scanned QR payload or the 6-digit fallback code.
    #[validate(length(min = 1, message = "code is required"))]
    pub code: String,
    #[validate(length(min = 1, message = "device_id is required"))]
    pub device_id: String,
}

#[derive(Serialize, Default)]
pub struct AttendanceRecordResponse {
    pub session_id: i64,
    pub student_id: i64,
    pub status: String,
    pub marked_by: String,
    pub marked_at: Option<DateTime<Utc>>,
    pub device_id: String,
    pub ip_address: Option<String>,
    pub flags: Vec<String>,
    pub is_synced: bool,
}

impl From<AttendanceRecord> for AttendanceRecordResponse {
    fn from(r: AttendanceRecord) -> Self {
        let flags = r.flag_list().iter().map(|f| f.as_code().into()).collect();
        Self {
            session_id: r.session_id,
            student_id: r.student_id,
            status: r.status.to_string(),
            marked_by: r.marked_by.to_string(),
            marked_at: Some(r.marked_at),
            device_id: r.device_id,
            ip_address: r.ip_address,
            flags,
            is_synced: r.is_synced,
        }
    }
}

/// Verify result: the stored record plus the flags attached at creation.
#[derive(Serialize, Default)]
pub struct VerifyAttendanceResponse {
    pub record: Option<AttendanceRecordResponse>,
    pub flags: Vec<String>,
}
