#[cfg(test)]
mod tests {
    use crate::helpers::{bearer, json_body, make_test_app, setup};
    use api::state::AppState;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use chrono::{DateTime, Utc};
    use qr::decode::{decode_frame, load_frame};
    use serde_json::{Value, json};
    use serial_test::serial;
    use services::{AttendanceCodeService, CreateAttendanceCode};
    use tower::ServiceExt;

    fn post_code(auth: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/attendance/codes")
            .header("Authorization", auth)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn issue(state: &AppState, issuer_id: i64, location: &str) -> db::models::attendance_code::Model {
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
    async fn issue_returns_a_permanent_active_code() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;

        let response = app
            .oneshot(post_code(
                &bearer(ctx.instructor.id, false),
                json!({ "location": "Main Dojo" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        let code = json["data"]["code"].as_str().unwrap();
        assert!(code.starts_with("HAMARR-"));
        assert_eq!(code.len(), "HAMARR-".len() + 6);
        assert_eq!(json["data"]["issuer_id"], ctx.instructor.id);
        assert_eq!(json["data"]["location"], "Main Dojo");
        assert_eq!(json["data"]["is_active"], true);
        assert_eq!(json["data"]["is_currently_valid"], true);
        assert!(json["data"]["valid_from"].is_null());
        assert!(json["data"]["valid_until"].is_null());
    }

    #[tokio::test]
    #[serial]
    async fn issue_without_location_is_bad_request() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;
        let auth = bearer(ctx.instructor.id, false);

        let response = app
            .clone()
            .oneshot(post_code(&auth, json!({ "class_id": ctx.class.id })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["success"], false);

        let response = app
            .oneshot(post_code(&auth, json!({ "location": "   " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[serial]
    async fn issue_with_duration_starts_now() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;

        let response = app
            .oneshot(post_code(
                &bearer(ctx.instructor.id, false),
                json!({ "location": "Main Dojo", "class_id": ctx.class.id, "duration": "week" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let json = json_body(response).await;
        let from = DateTime::parse_from_rfc3339(json["data"]["valid_from"].as_str().unwrap()).unwrap();
        let until = DateTime::parse_from_rfc3339(json["data"]["valid_until"].as_str().unwrap()).unwrap();
        assert_eq!((until - from).num_days(), 7);
        assert_eq!(json["data"]["class_id"], ctx.class.id);
    }

    #[tokio::test]
    #[serial]
    async fn issue_rejects_unknown_class_and_inverted_window() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;
        let auth = bearer(ctx.instructor.id, false);

        let response = app
            .clone()
            .oneshot(post_code(&auth, json!({ "location": "Main Dojo", "class_id": 9999 })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(post_code(
                &auth,
                json!({
                    "location": "Main Dojo",
                    "valid_from": "2026-10-20T10:00:00Z",
                    "valid_until": "2026-10-19T10:00:00Z"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[serial]
    async fn list_filters_currently_valid_codes() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;
        issue(&state, ctx.instructor.id, "Main Dojo").await;
        issue(&state, ctx.instructor.id, "Annex").await;
        let retired = issue(&state, ctx.instructor.id, "Main Dojo").await;
        AttendanceCodeService::deactivate(state.db(), retired.id)
            .await
            .unwrap();
        let auth = bearer(ctx.instructor.id, false);

        let req = Request::builder()
            .uri("/api/attendance/codes")
            .header("Authorization", &auth)
            .body(Body::empty())
            .unwrap();
        let json = json_body(app.clone().oneshot(req).await.unwrap()).await;
        assert_eq!(json["data"]["total"], 3);
        assert_eq!(json["data"]["page"], 1);
        assert_eq!(json["data"]["per_page"], 20);

        let req = Request::builder()
            .uri("/api/attendance/codes?active_only=true&q=Main&sort=location")
            .header("Authorization", &auth)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["data"]["total"], 1);
        let codes = json["data"]["codes"].as_array().unwrap();
        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0]["location"], "Main Dojo");
        assert_eq!(codes[0]["is_currently_valid"], true);
    }

    #[tokio::test]
    #[serial]
    async fn list_rejects_unknown_sort_field() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;

        let req = Request::builder()
            .uri("/api/attendance/codes?sort=-code")
            .header("Authorization", bearer(ctx.instructor.id, false))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["message"], "Invalid sort field");
    }

    #[tokio::test]
    #[serial]
    async fn deactivation_is_idempotent() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;
        let code = issue(&state, ctx.instructor.id, "Main Dojo").await;
        let auth = bearer(ctx.instructor.id, false);

        for _ in 0..2 {
            let req = Request::builder()
                .method("PUT")
                .uri(format!("/api/attendance/codes?id={}", code.id))
                .header("Authorization", &auth)
                .header("Content-Type", "application/json")
                .body(Body::from(json!({ "is_active": false }).to_string()))
                .unwrap();
            let response = app.clone().oneshot(req).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let json = json_body(response).await;
            assert_eq!(json["data"]["is_active"], false);
            assert_eq!(json["data"]["is_currently_valid"], false);
        }

        let req = Request::builder()
            .method("PUT")
            .uri("/api/attendance/codes?id=9999")
            .header("Authorization", &auth)
            .header("Content-Type", "application/json")
            .body(Body::from(json!({ "is_active": true }).to_string()))
            .unwrap();
        assert_eq!(app.oneshot(req).await.unwrap().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[serial]
    async fn delete_removes_the_code_once() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;
        let code = issue(&state, ctx.instructor.id, "Main Dojo").await;
        let auth = bearer(ctx.instructor.id, false);

        let delete = |uri: String| {
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .header("Authorization", &auth)
                .body(Body::empty())
                .unwrap()
        };

        let uri = format!("/api/attendance/codes?id={}", code.id);
        let response = app.clone().oneshot(delete(uri.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = app.clone().oneshot(delete(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = app
            .oneshot(delete("/api/attendance/codes".into()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[serial]
    async fn qr_png_scans_back_to_the_code() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;
        let code = issue(&state, ctx.instructor.id, "Main Dojo").await;

        let req = Request::builder()
            .uri(format!("/api/attendance/codes/qr?id={}&format=png&module_px=6", code.id))
            .header("Authorization", bearer(ctx.instructor.id, false))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let frame = load_frame(&bytes).unwrap();
        assert_eq!(decode_frame(&frame).as_deref(), Some(code.code.as_str()));
    }

    #[tokio::test]
    #[serial]
    async fn qr_defaults_to_svg_and_validates_parameters() {
        let (app, state) = make_test_app().await;
        let ctx = setup(&state).await;
        let code = issue(&state, ctx.instructor.id, "Main Dojo").await;
        let auth = bearer(ctx.instructor.id, false);

        let get = |uri: String| {
            Request::builder()
                .uri(uri)
                .header("Authorization", &auth)
                .body(Body::empty())
                .unwrap()
        };

        let response = app
            .clone()
            .oneshot(get(format!("/api/attendance/codes/qr?id={}", code.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8(body.to_vec()).unwrap().starts_with("<svg"));

        let response = app
            .clone()
            .oneshot(get(format!("/api/attendance/codes/qr?id={}&module_px=0", code.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(get(format!("/api/attendance/codes/qr?id={}&format=gif", code.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(get("/api/attendance/codes/qr?id=9999".into()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
