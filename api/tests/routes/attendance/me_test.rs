#[cfg(test)]
mod tests {
    use crate::helpers::{bearer, json_body, make_test_app, setup};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::Utc;
    use serde_json::json;
    use serial_test::serial;
    use services::{AttendanceCodeService, CreateAttendanceCode};
    use tower::ServiceExt;

    #[tokio::test]
    #[serial]
    async fn history_lists_only_the_callers_check_ins() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;
        let code = AttendanceCodeService::issue(
            state.db(),
            state.code_pattern(),
            CreateAttendanceCode {
                issuer_id: ctx.instructor.id,
                location: "main dojo".into(),
                ..Default::default()
            },
            Utc::now(),
        )
        .await
        .unwrap();

        let req = Request::builder()
            .method("POST")
            .uri("/api/attendance/check-in")
            .header("Authorization", bearer(ctx.student.id, false))
            .header("Content-Type", "application/json")
            .body(Body::from(json!({ "qr_code": code.code }).to_string()))
            .unwrap();
        assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::OK);

        let me = |user_id: i64| {
            Request::builder()
                .uri("/api/attendance/me")
                .header("Authorization", bearer(user_id, false))
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(me(ctx.student.id)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        let history = json["data"].as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["class_id"], ctx.class.id);
        assert_eq!(history[0]["class_name"], "Evening Karate");
        assert!(history[0]["check_in_time"].is_string());

        let json = json_body(app.oneshot(me(ctx.other_student.id)).await.unwrap()).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 0);
    }
}
