mod helpers;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use api::auth::generate_jwt;
    use axum::{
        body::Body as AxumBody,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use std::convert::Infallible;
    use tower::ServiceExt;
    use tower::util::BoxCloneService;

    use db::models::{
        batch::Model as BatchModel,
        batch_student::Model as BatchStudentModel,
        course::Model as CourseModel,
        user::{Model as UserModel, Role},
    };

    use crate::helpers::app::make_test_app;

    type TestApp = BoxCloneService<Request<AxumBody>, axum::response::Response, Infallible>;

    struct TestCtx {
        teacher: UserModel,
        students: Vec<UserModel>,
        course: CourseModel,
        batch: BatchModel,
    }

    async fn setup(db: &sea_orm::DatabaseConnection) -> TestCtx {
        let teacher = UserModel::create(db, "rep_teacher", "rep_teacher@test.com", Role::Teacher)
            .await
            .unwrap();
        let course = CourseModel::create(db, "CS301", "Operating Systems")
            .await
            .unwrap();
        let batch = BatchModel::create(db, "CS 2026 C", 2026).await.unwrap();

        let mut students = Vec::new();
        for i in 0..4 {
            let s = UserModel::create(
                db,
                &format!("rep_s{}", i),
                &format!("rep_s{}@test.com", i),
                Role::Student,
            )
            .await
            .unwrap();
            BatchStudentModel::assign_student_to_batch(db, s.id, batch.id)
                .await
                .unwrap();
            students.push(s);
        }

        TestCtx {
            teacher,
            students,
            course,
            batch,
        }
    }

    fn request(method: &str, uri: &str, token: &str, body: String) -> Request<AxumBody> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .body(AxumBody::from(body))
            .unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Opens a session, marks three of the four students present and reuses
    /// one device so exactly one record carries a flag. Returns the session
    /// id.
    async fn seed_marked_session(app: &TestApp, ctx: &TestCtx) -> i64 {
        let (teacher_token, _) = generate_jwt(ctx.teacher.id, false);
        let body = serde_json::json!({
            "course_id": ctx.course.id,
            "batch_id": ctx.batch.id,
            "duration_minutes": 60,
        });
        let resp = app
            .clone()
            .oneshot(request("POST", "/api/sessions", &teacher_token, body.to_string()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        let id = created["data"]["id"].as_i64().unwrap();
        let code = created["data"]["session_code"].as_str().unwrap().to_owned();

        // students 0 and 1 mark from their own devices; student 2 reuses
        // student 0's device and gets flagged
        for (student, device) in [
            (&ctx.students[0], "dev-0"),
            (&ctx.students[1], "dev-1"),
            (&ctx.students[2], "dev-0"),
        ] {
            let (token, _) = generate_jwt(student.id, false);
            let body = serde_json::json!({ "code": code, "device_id": device });
            let resp = app
                .clone()
                .oneshot(request(
                    "POST",
                    "/api/attendance/verify",
                    &token,
                    body.to_string(),
                ))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }

        id
    }

    #[tokio::test]
    async fn test_session_summary_counts() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;
        let session_id = seed_marked_session(&app, &ctx).await;

        let (token, _) = generate_jwt(ctx.teacher.id, false);
        let resp = app
            .clone()
            .oneshot(request(
                "GET",
                &format!("/api/reports/sessions/{}", session_id),
                &token,
                String::new(),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        let data = &json["data"];
        assert_eq!(data["session_id"], session_id);
        assert_eq!(data["session_status"], "active");
        assert_eq!(data["enrolled"], 4);
        assert_eq!(data["total_marked"], 3);
        assert_eq!(data["present"], 3);
        assert_eq!(data["absent"], 0);
        assert_eq!(data["flagged"], 1);
        assert_eq!(data["flag_counts"]["MULTIPLE_LOGINS_SAME_DEVICE"], 1);
        assert_eq!(data["attendance_rate"], 0.75);
    }

    #[tokio::test]
    async fn test_session_flags_lists_flagged_records_only() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;
        let session_id = seed_marked_session(&app, &ctx).await;

        let (token, _) = generate_jwt(ctx.teacher.id, false);
        let resp = app
            .clone()
            .oneshot(request(
                "GET",
                &format!("/api/reports/sessions/{}/flags", session_id),
                &token,
                String::new(),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        let records = json["data"].as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["student_id"], ctx.students[2].id);
        assert_eq!(records[0]["device_id"], "dev-0");
        assert_eq!(records[0]["flags"][0], "MULTIPLE_LOGINS_SAME_DEVICE");
    }

    #[tokio::test]
    async fn test_reports_forbidden_for_students() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;
        let session_id = seed_marked_session(&app, &ctx).await;

        let (token, _) = generate_jwt(ctx.students[0].id, false);
        let resp = app
            .clone()
            .oneshot(request(
                "GET",
                &format!("/api/reports/sessions/{}", session_id),
                &token,
                String::new(),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_reports_unknown_session_404() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;

        let (token, _) = generate_jwt(ctx.teacher.id, false);
        for uri in [
            "/api/reports/sessions/999999",
            "/api/reports/sessions/999999/flags",
        ] {
            let resp = app
                .clone()
                .oneshot(request("GET", uri, &token, String::new()))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        }
    }
}
