//! The verification engine: the decision procedure behind every mark.
//!
//! The engine turns one scan or code entry into exactly one outcome:
//! invalid session, already marked, present (clean), present (flagged), or
//! a strict-mode rejection. A flagged mark still counts as attendance; the
//! flags exist so a human can look at the record afterwards, never so the
//! system can silently deny a student who is standing in the room.

use sea_orm::{DatabaseConnection, DbErr};
use strum::{Display, EnumString};
use thiserror::Error;

use db::models::attendance_record::{self, AttendanceFlag, AttendanceStatus, MarkedBy};

use crate::device;
use crate::session::{SessionError, SessionService};
use crate::token::TokenCodec;

/// What to do when a device that already marked this session for one
/// student shows up again for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DeviceReusePolicy {
    /// Record the mark and attach `MULTIPLE_LOGINS_SAME_DEVICE`.
    Flag,
    /// Refuse the mark outright.
    Reject,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Invalid or closed session code")]
    InvalidSession,
    #[error("Attendance already marked for this session")]
    AlreadyMarked,
    #[error("This device has already marked attendance for another student")]
    DeviceReuseRejected,
    #[error(transparent)]
    Db(#[from] DbErr),
}

/// A successful mark: the stored record plus the flags it was created with.
#[derive(Debug)]
pub struct MarkSuccess {
    pub record: attendance_record::Model,
    pub flags: Vec<AttendanceFlag>,
}

#[derive(Clone)]
pub struct VerificationEngine {
    codec: TokenCodec,
    policy: DeviceReusePolicy,
}

impl VerificationEngine {
    pub fn new(codec: TokenCodec, policy: DeviceReusePolicy) -> Self {
        Self { codec, policy }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Verifies one attendance claim and records it.
    ///
    /// Steps, in order, each able to short-circuit:
    /// 1. resolve the credential to an ACTIVE session,
    /// 2. refuse if this student already holds a record for it,
    /// 3. device trust: first-ever device is bound silently, any other
    ///    unknown device earns `SUSPICIOUS_DEVICE`,
    /// 4. cross-student reuse of the device within the session is flagged
    ///    or rejected per policy,
    /// 5. insert exactly one row; a concurrent duplicate loses at the
    ///    composite key and reports `AlreadyMarked`.
    pub async fn mark_attendance(
        &self,
        db: &DatabaseConnection,
        credential: &str,
        student_id: i64,
        device_id: &str,
        ip_address: Option<String>,
    ) -> Result<MarkSuccess, VerifyError> {
        let session = SessionService::resolve_active(db, &self.codec, credential)
            .await
            .map_err(|err| match err {
                SessionError::Db(db_err) => VerifyError::Db(db_err),
                _ => VerifyError::InvalidSession,
            })?;

        if attendance_record::Model::find_for(db, session.id, student_id)
            .await?
            .is_some()
        {
            return Err(VerifyError::AlreadyMarked);
        }

        let mut flags = Vec::new();

        let bindings = device::bindings_for(db, student_id).await?;
        if bindings.is_empty() {
            device::register_first_device(db, student_id, device_id).await?;
        } else if !bindings.iter().any(|d| d == device_id) {
            flags.push(AttendanceFlag::SuspiciousDevice);
        }

        if attendance_record::Model::device_used_by_other(db, session.id, device_id, student_id)
            .await?
        {
            match self.policy {
                DeviceReusePolicy::Reject => {
                    tracing::warn!(
                        session_id = session.id,
                        student_id,
                        device_id,
                        "mark rejected: device reused across students"
                    );
                    return Err(VerifyError::DeviceReuseRejected);
                }
                DeviceReusePolicy::Flag => flags.push(AttendanceFlag::MultipleLoginsSameDevice),
            }
        }

        let record = attendance_record::Model::create_if_absent(
            db,
            session.id,
            student_id,
            AttendanceStatus::Present,
            MarkedBy::Student,
            device_id,
            ip_address,
            &flags,
        )
        .await?
        .ok_or(VerifyError::AlreadyMarked)?;

        if !flags.is_empty() {
            tracing::warn!(
                session_id = session.id,
                student_id,
                device_id,
                flags = ?flags,
                "attendance marked with flags"
            );
        }
        Ok(MarkSuccess { record, flags })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use db::models::class_session::Status;
    use db::models::user::Role;
    use db::models::{batch, batch_student, course, user};
    use db::test_utils::setup_test_db;
    use crate::session::ClassSession;

    fn engine(policy: DeviceReusePolicy) -> VerificationEngine {
        let codec = TokenCodec::new(b"verify-test-key".to_vec(), Duration::seconds(15));
        VerificationEngine::new(codec, policy)
    }

    struct Fixture {
        teacher: user::Model,
        students: Vec<user::Model>,
        session: ClassSession,
    }

    async fn seed(db: &DatabaseConnection, engine: &VerificationEngine, n_students: usize) -> Fixture {
        let teacher = user::Model::create(db, "t1", "t1@test.com", Role::Teacher)
            .await
            .expect("create teacher");
        let course = course::Model::create(db, "CS101", "Intro to CS")
            .await
            .expect("create course");
        let b = batch::Model::create(db, "2026-A", 2026)
            .await
            .expect("create batch");

        let mut students = Vec::new();
        for i in 0..n_students {
            let s = user::Model::create(
                db,
                &format!("s{i}"),
                &format!("s{i}@test.com"),
                Role::Student,
            )
            .await
            .expect("create student");
            batch_student::Model::assign_student_to_batch(db, s.id, b.id)
                .await
                .expect("enroll");
            students.push(s);
        }

        let session =
            SessionService::create(db, engine.codec(), teacher.id, course.id, b.id, 60)
                .await
                .expect("create session");
        Fixture { teacher, students, session }
    }

    #[tokio::test]
    async fn first_mark_on_first_device_is_clean() {
        let db = setup_test_db().await;
        let engine = engine(DeviceReusePolicy::Flag);
        let f = seed(&db, &engine, 1).await;

        let ok = engine
            .mark_attendance(
                &db,
                &f.session.session_code,
                f.students[0].id,
                "dev-abc",
                Some("10.0.0.1".into()),
            )
            .await
            .expect("clean mark");

        assert!(ok.flags.is_empty());
        assert_eq!(ok.record.status, AttendanceStatus::Present);
        assert_eq!(ok.record.marked_by, MarkedBy::Student);
        assert_eq!(ok.record.device_id, "dev-abc");
        assert_eq!(ok.record.ip_address.as_deref(), Some("10.0.0.1"));
        // TOFU: the device is now trusted.
        assert!(device::is_known_device(&db, f.students[0].id, "dev-abc")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn second_mark_is_already_marked() {
        let db = setup_test_db().await;
        let engine = engine(DeviceReusePolicy::Flag);
        let f = seed(&db, &engine, 1).await;

        engine
            .mark_attendance(&db, &f.session.session_code, f.students[0].id, "dev-abc", None)
            .await
            .expect("first mark");
        let second = engine
            .mark_attendance(&db, &f.session.session_code, f.students[0].id, "dev-abc", None)
            .await;
        assert!(matches!(second, Err(VerifyError::AlreadyMarked)));

        // Still exactly one record.
        let records = attendance_record::Model::for_session(&db, f.session.id)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn unknown_device_earns_suspicious_flag_but_still_counts() {
        let db = setup_test_db().await;
        let engine = engine(DeviceReusePolicy::Flag);
        let f = seed(&db, &engine, 1).await;
        let student = &f.students[0];

        // Establish trust on dev-abc in an earlier session.
        device::register_first_device(&db, student.id, "dev-abc")
            .await
            .expect("bind");

        let ok = engine
            .mark_attendance(&db, &f.session.session_code, student.id, "dev-other", None)
            .await
            .expect("flagged mark");
        assert_eq!(ok.flags, vec![AttendanceFlag::SuspiciousDevice]);
        assert_eq!(ok.record.status, AttendanceStatus::Present);
        assert!(ok.record.has_flag(AttendanceFlag::SuspiciousDevice));
        // The unknown device is not silently trusted.
        assert!(!device::is_known_device(&db, student.id, "dev-other")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn cross_student_device_reuse_is_flagged_under_flag_policy() {
        let db = setup_test_db().await;
        let engine = engine(DeviceReusePolicy::Flag);
        let f = seed(&db, &engine, 2).await;

        engine
            .mark_attendance(&db, &f.session.session_code, f.students[0].id, "dev-abc", None)
            .await
            .expect("first student marks");

        // Second student, same physical device. First-ever device for them,
        // so no SUSPICIOUS_DEVICE, but the session has seen it already.
        let ok = engine
            .mark_attendance(&db, &f.session.session_code, f.students[1].id, "dev-abc", None)
            .await
            .expect("flagged mark");
        assert_eq!(ok.flags, vec![AttendanceFlag::MultipleLoginsSameDevice]);
        assert_eq!(ok.record.status, AttendanceStatus::Present);
    }

    #[tokio::test]
    async fn cross_student_device_reuse_is_refused_under_reject_policy() {
        let db = setup_test_db().await;
        let engine = engine(DeviceReusePolicy::Reject);
        let f = seed(&db, &engine, 2).await;

        engine
            .mark_attendance(&db, &f.session.session_code, f.students[0].id, "dev-abc", None)
            .await
            .expect("first student marks");

        let second = engine
            .mark_attendance(&db, &f.session.session_code, f.students[1].id, "dev-abc", None)
            .await;
        assert!(matches!(second, Err(VerifyError::DeviceReuseRejected)));

        let records = attendance_record::Model::for_session(&db, f.session.id)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn closed_session_rejects_marks() {
        let db = setup_test_db().await;
        let engine = engine(DeviceReusePolicy::Flag);
        let f = seed(&db, &engine, 1).await;

        SessionService::set_status(&db, f.session.id, f.teacher.id, Status::Closed)
            .await
            .expect("close");

        let result = engine
            .mark_attendance(&db, &f.session.session_code, f.students[0].id, "dev-abc", None)
            .await;
        assert!(matches!(result, Err(VerifyError::InvalidSession)));
    }

    #[tokio::test]
    async fn garbage_credential_is_invalid_session() {
        let db = setup_test_db().await;
        let engine = engine(DeviceReusePolicy::Flag);
        let f = seed(&db, &engine, 1).await;

        for credential in ["000000", "not-a-token", ""] {
            let result = engine
                .mark_attendance(&db, credential, f.students[0].id, "dev-abc", None)
                .await;
            assert!(matches!(result, Err(VerifyError::InvalidSession)));
        }
    }

    #[tokio::test]
    async fn concurrent_duplicate_marks_yield_exactly_one_record() {
        let db = setup_test_db().await;
        let engine = engine(DeviceReusePolicy::Flag);
        let f = seed(&db, &engine, 1).await;
        let student_id = f.students[0].id;
        let code = f.session.session_code.clone();

        let a = engine.mark_attendance(&db, &code, student_id, "dev-abc", None);
        let b = engine.mark_attendance(&db, &code, student_id, "dev-abc", None);
        let (ra, rb) = tokio::join!(a, b);

        let wins = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
        let dups = [&ra, &rb]
            .iter()
            .filter(|r| matches!(r, Err(VerifyError::AlreadyMarked)))
            .count();
        assert_eq!((wins, dups), (1, 1));

        let records = attendance_record::Model::for_session(&db, f.session.id)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }
}
