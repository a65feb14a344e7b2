#[cfg(test)]
mod tests {
    use crate::helpers::{bearer, json_body, make_test_app, setup};
    use api::state::AppState;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::{DateTime, Duration, Utc};
    use db::models::attendance_code::{Model as AttendanceCode, NewAttendanceCode};
    use db::models::attendance_record::Model as AttendanceRecord;
    use serde_json::{Value, json};
    use serial_test::serial;
    use services::{AttendanceCodeService, CreateAttendanceCode};
    use tower::ServiceExt;

    fn check_in(auth: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/attendance/check-in")
            .header("Authorization", auth)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn issue(state: &AppState, issuer_id: i64, location: &str) -> AttendanceCode {
        AttendanceCodeService::issue(
            state.db(),
            state.code_pattern(),
            CreateAttendanceCode {
                issuer_id,
                location: location.into(),
                ..Default::default()
            },
            Utc::now(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn check_in_marks_the_student_present_once() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;
        let code = issue(&state, ctx.instructor.id, "Main Dojo").await;
        let auth = bearer(ctx.student.id, false);
        let body = json!({ "qr_code": code.code, "timestamp": Utc::now().to_rfc3339() });

        let response = app.clone().oneshot(check_in(&auth, body.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["already_checked_in"], false);
        assert!(json.get("error").is_none());
        let attendance = &json["attendance"];
        assert_eq!(attendance["class_id"], ctx.class.id);
        assert_eq!(attendance["class_name"], "Evening Karate");
        assert_eq!(attendance["discipline"], "Karate");
        assert_eq!(attendance["location"], "Main Dojo");
        assert_eq!(attendance["class_time"], "00:00");
        assert_eq!(attendance["attended"], true);
        assert_eq!(attendance["check_in_method"], "qr");
        let first_id = attendance["id"].clone();

        let response = app.oneshot(check_in(&auth, body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["already_checked_in"], true);
        assert_eq!(json["attendance"]["id"], first_id);

        let present = AttendanceRecord::count_present(state.db(), ctx.class.id)
            .await
            .unwrap();
        assert_eq!(present, 1);
    }

    #[tokio::test]
    #[serial]
    async fn links_and_lowercase_codes_are_accepted() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;
        let code = issue(&state, ctx.instructor.id, "Main Dojo").await;

        let link = format!(
            "https://dojo.example/check-in?qr={}",
            code.code.to_lowercase()
        );
        let response = app
            .oneshot(check_in(
                &bearer(ctx.student.id, false),
                json!({ "qr_code": link, "check_in_method": "manual" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["attendance"]["check_in_method"], "manual");
    }

    #[tokio::test]
    #[serial]
    async fn malformed_and_unknown_codes_are_told_apart() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;
        let auth = bearer(ctx.student.id, false);

        let response = app
            .clone()
            .oneshot(check_in(&auth, json!({ "qr_code": "   " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "invalid_format");
        assert!(!json["message"].as_str().unwrap().is_empty());

        let response = app
            .oneshot(check_in(&auth, json!({ "qr_code": "HAMARR-ZZZZZZ" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = json_body(response).await;
        assert_eq!(json["error"], "code_not_found");
        assert!(json.get("attendance").is_none());
    }

    #[tokio::test]
    #[serial]
    async fn deactivated_and_expired_codes_are_gone() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;
        let auth = bearer(ctx.student.id, false);

        let retired = issue(&state, ctx.instructor.id, "Main Dojo").await;
        AttendanceCodeService::deactivate(state.db(), retired.id)
            .await
            .unwrap();

        let now = Utc::now();
        let expired = AttendanceCode::create(
            state.db(),
            NewAttendanceCode {
                issuer_id: ctx.instructor.id,
                class_id: None,
                location: "Main Dojo".into(),
                code: "HAMARR-OLD001".into(),
                valid_from: Some(now - Duration::days(2)),
                valid_until: Some(now - Duration::days(1)),
            },
        )
        .await
        .unwrap();

        for code in [retired.code, expired.code] {
            let response = app
                .clone()
                .oneshot(check_in(&auth, json!({ "qr_code": code })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::GONE);
            let json = json_body(response).await;
            assert_eq!(json["error"], "code_expired_or_inactive");
        }

        let present = AttendanceRecord::count_present(state.db(), ctx.class.id)
            .await
            .unwrap();
        assert_eq!(present, 0);
    }

    #[tokio::test]
    #[serial]
    async fn no_class_at_the_location_is_unprocessable() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;
        let code = issue(&state, ctx.instructor.id, "Garage").await;

        let response = app
            .oneshot(check_in(
                &bearer(ctx.student.id, false),
                json!({ "qr_code": code.code }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["error"], "class_resolution_failed");
    }

    #[tokio::test]
    #[serial]
    async fn student_id_in_the_body_is_ignored() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;
        let code = issue(&state, ctx.instructor.id, "Main Dojo").await;

        let response = app
            .oneshot(check_in(
                &bearer(ctx.student.id, false),
                json!({ "qr_code": code.code, "student_id": ctx.other_student.id }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mine = AttendanceRecord::history_for_student(state.db(), ctx.student.id)
            .await
            .unwrap();
        let theirs = AttendanceRecord::history_for_student(state.db(), ctx.other_student.id)
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert!(theirs.is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn token_for_an_unknown_user_is_unauthorized() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;
        let code = issue(&state, ctx.instructor.id, "Main Dojo").await;

        let response = app
            .oneshot(check_in(&bearer(4242, false), json!({ "qr_code": code.code })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "unauthorized");
    }

    #[tokio::test]
    #[serial]
    async fn skewed_client_clock_falls_back_to_server_time() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;
        let code = issue(&state, ctx.instructor.id, "Main Dojo").await;
        let before = Utc::now();

        let response = app
            .oneshot(check_in(
                &bearer(ctx.student.id, false),
                json!({ "qr_code": code.code, "timestamp": "2001-01-01T00:00:00Z" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        let recorded: DateTime<Utc> = json["attendance"]["check_in_time"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(recorded >= before - Duration::seconds(1));
    }

    #[tokio::test]
    #[serial]
    async fn check_in_requires_a_token() {
        let (app, _) = make_test_app().await;
        let req = Request::builder()
            .method("POST")
            .uri("/api/attendance/check-in")
            .header("Content-Type", "application/json")
            .body(Body::from(json!({ "qr_code": "HAMARR-AB12CD" }).to_string()))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
