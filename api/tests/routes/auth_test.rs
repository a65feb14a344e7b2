#[cfg(test)]
mod tests {
    use crate::helpers::{bearer, json_body, make_test_app, setup};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serial_test::serial;
    use tower::ServiceExt;

    fn list_codes(auth: Option<String>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/attendance/codes");
        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn missing_token_is_unauthorized() {
        let (app, _) = make_test_app().await;
        let response = app.oneshot(list_codes(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = json_body(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    #[serial]
    async fn garbage_token_is_unauthorized() {
        let (app, _) = make_test_app().await;
        let response = app
            .oneshot(list_codes(Some("Bearer not.a.jwt".into())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn students_cannot_manage_codes() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;

        let response = app
            .oneshot(list_codes(Some(bearer(ctx.student.id, false))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = json_body(response).await;
        assert_eq!(json["message"], "Staff access required");
    }

    #[tokio::test]
    #[serial]
    async fn instructors_and_admin_tokens_pass_the_staff_guard() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;

        let response = app
            .clone()
            .oneshot(list_codes(Some(bearer(ctx.instructor.id, false))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Admin claim wins even for a user stored as a student.
        let response = app
            .oneshot(list_codes(Some(bearer(ctx.student.id, true))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    #[serial]
    async fn admin_claim_without_a_user_record_is_unauthorized() {
        let (app, _) = make_test_app().await;

        let response = app
            .clone()
            .oneshot(list_codes(Some(bearer(9_999, true))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = json_body(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Unknown user");

        let issue = Request::builder()
            .method("POST")
            .uri("/api/attendance/codes")
            .header("Authorization", bearer(9_999, true))
            .header("Content-Type", "application/json")
            .body(Body::from(r#"{"location":"Main Dojo"}"#))
            .unwrap();
        let response = app.oneshot(issue).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
