//! Malformed JSON bodies on authenticated routes.

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::Value;

use shekels_integration_tests::{TestApp, blank_account};
use shekels_server::models::Catalog;

fn post(uri: &str, token: &str, content_type: Option<&str>, body: &'static str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("token", token);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(Body::from(body)).unwrap()
}

async fn json_error(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.raw(request).await;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).expect("error body should be JSON");
    (status, body)
}

#[tokio::test]
async fn test_malformed_bodies_get_json_errors() {
    let app = TestApp::new(Catalog::default());
    let mut officer = blank_account();
    officer.admin = true;
    let token = app.sign_in(officer).await;

    for uri in [
        "/shop/purchase",
        "/leaderboard/claim",
        "/leaderboard/update_prefs",
        "/users/update",
    ] {
        let (status, body) = json_error(
            &app,
            post(uri, &token, Some("application/json"), "{not json"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["success"], false, "{uri}");
        assert!(body["message"].is_string(), "{uri}");
    }
}

#[tokio::test]
async fn test_missing_body_and_wrong_shape() {
    let app = TestApp::new(Catalog::default());
    let token = app.sign_in(blank_account()).await;

    let (status, body) = json_error(&app, post("/shop/purchase", &token, None, "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = json_error(
        &app,
        post(
            "/shop/purchase",
            &token,
            Some("application/json"),
            r#"{"item": "sticker"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("itemID"));
}
