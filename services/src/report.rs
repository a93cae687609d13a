//! Read-only reporting over recorded attendance.
//!
//! Sessions are classroom-sized, so summaries fold the session's records in
//! memory instead of pushing flag-JSON predicates into SQL.

use std::collections::BTreeMap;

use sea_orm::{DatabaseConnection, DbErr};
use serde::Serialize;

use db::models::attendance_record::{AttendanceStatus, Model as AttendanceRecord};
use db::models::batch_student;
use db::models::class_session::{self, Model as ClassSession, Status};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Session not found")]
    SessionNotFound,
    #[error(transparent)]
    Db(#[from] DbErr),
}

/// Per-session headline numbers for a teacher's report view.
#[derive(Debug, Serialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: i64,
    pub session_status: Status,
    /// Students enrolled in the session's batch.
    pub enrolled: i64,
    pub total_marked: i64,
    pub present: i64,
    pub absent: i64,
    pub late: i64,
    pub excused: i64,
    /// Records carrying at least one flag.
    pub flagged: i64,
    /// Count per flag code, e.g. `"SUSPICIOUS_DEVICE": 2`.
    pub flag_counts: BTreeMap<String, i64>,
    /// `total_marked / enrolled`, 0.0 for an empty batch.
    pub attendance_rate: f64,
}

pub async fn session_summary(
    db: &DatabaseConnection,
    session_id: i64,
) -> Result<SessionSummary, ReportError> {
    let session = class_session::Model::find_by_id(db, session_id)
        .await?
        .ok_or(ReportError::SessionNotFound)?;
    let records = AttendanceRecord::for_session(db, session_id).await?;
    let enrolled = batch_student::Model::student_count(db, session.batch_id).await?;

    let mut summary = SessionSummary {
        session_id,
        session_status: session.status,
        enrolled,
        total_marked: records.len() as i64,
        present: 0,
        absent: 0,
        late: 0,
        excused: 0,
        flagged: 0,
        flag_counts: BTreeMap::new(),
        attendance_rate: attendance_rate(records.len() as i64, enrolled),
    };

    for record in &records {
        match record.status {
            AttendanceStatus::Present => summary.present += 1,
            AttendanceStatus::Absent => summary.absent += 1,
            AttendanceStatus::Late => summary.late += 1,
            AttendanceStatus::Excused => summary.excused += 1,
        }
        let flags = record.flag_list();
        if !flags.is_empty() {
            summary.flagged += 1;
        }
        for flag in flags {
            *summary
                .flag_counts
                .entry(flag.as_code().to_owned())
                .or_insert(0) += 1;
        }
    }

    Ok(summary)
}

/// Fraction of the batch that holds a record for the session.
pub async fn session_attendance_rate(
    db: &DatabaseConnection,
    session: &ClassSession,
) -> Result<f64, DbErr> {
    let marked = AttendanceRecord::for_session(db, session.id).await?.len() as i64;
    let enrolled = batch_student::Model::student_count(db, session.batch_id).await?;
    Ok(attendance_rate(marked, enrolled))
}

/// Records carrying at least one flag, for human review.
pub async fn flagged_records(
    db: &DatabaseConnection,
    session_id: i64,
) -> Result<Vec<AttendanceRecord>, DbErr> {
    let records = AttendanceRecord::for_session(db, session_id).await?;
    Ok(records.into_iter().filter(|r| r.is_flagged()).collect())
}

fn attendance_rate(marked: i64, enrolled: i64) -> f64 {
    if enrolled <= 0 {
        return 0.0;
    }
    marked as f64 / enrolled as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use db::models::user::Role;
    use db::models::{batch, batch_student, course, user};
    use db::test_utils::setup_test_db;

    use crate::session::SessionService;
    use crate::token::TokenCodec;
    use crate::verification::{DeviceReusePolicy, VerificationEngine};

    async fn seeded_session_with_marks(
        db: &DatabaseConnection,
    ) -> (ClassSession, VerificationEngine) {
        let codec = TokenCodec::new(b"report-test-key".to_vec(), Duration::seconds(15));
        let engine = VerificationEngine::new(codec, DeviceReusePolicy::Flag);

        let teacher = user::Model::create(db, "t1", "t1@test.com", Role::Teacher)
            .await
            .unwrap();
        let course = course::Model::create(db, "CS101", "Intro to CS").await.unwrap();
        let b = batch::Model::create(db, "2026-A", 2026).await.unwrap();

        let mut students = Vec::new();
        for i in 0..4 {
            let s = user::Model::create(
                db,
                &format!("s{i}"),
                &format!("s{i}@test.com"),
                Role::Student,
            )
            .await
            .unwrap();
            batch_student::Model::assign_student_to_batch(db, s.id, b.id)
                .await
                .unwrap();
            students.push(s);
        }

        let session = SessionService::create(db, engine.codec(), teacher.id, course.id, b.id, 60)
            .await
            .unwrap();

        // Two clean marks on distinct devices, then one proxy-style mark
        // reusing the first student's device.
        engine
            .mark_attendance(db, &session.session_code, students[0].id, "dev-0", None)
            .await
            .unwrap();
        engine
            .mark_attendance(db, &session.session_code, students[1].id, "dev-1", None)
            .await
            .unwrap();
        engine
            .mark_attendance(db, &session.session_code, students[2].id, "dev-0", None)
            .await
            .unwrap();

        (session, engine)
    }

    #[tokio::test]
    async fn summary_counts_statuses_and_flags() {
        let db = setup_test_db().await;
        let (session, _) = seeded_session_with_marks(&db).await;

        let summary = session_summary(&db, session.id).await.unwrap();
        assert_eq!(summary.enrolled, 4);
        assert_eq!(summary.total_marked, 3);
        assert_eq!(summary.present, 3);
        assert_eq!(summary.flagged, 1);
        assert_eq!(
            summary.flag_counts.get("MULTIPLE_LOGINS_SAME_DEVICE"),
            Some(&1)
        );
        assert!((summary.attendance_rate - 0.75).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn flagged_records_returns_only_flagged_rows() {
        let db = setup_test_db().await;
        let (session, _) = seeded_session_with_marks(&db).await;

        let flagged = flagged_records(&db, session.id).await.unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].device_id, "dev-0");
    }

    #[tokio::test]
    async fn missing_session_is_an_error() {
        let db = setup_test_db().await;
        assert!(matches!(
            session_summary(&db, 9999).await,
            Err(ReportError::SessionNotFound)
        ));
    }
}
