//! Login code issue and exchange through the router.

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};

use shekels_core::LoginCode;
use shekels_integration_tests::{TestApp, blank_account};
use shekels_server::models::{Catalog, PendingLoginCode};

#[tokio::test]
async fn test_reissuing_returns_same_code_with_shrinking_ttl() {
    let app = TestApp::new(Catalog::default());
    let token = app.sign_in(blank_account()).await;

    let (status, first) = app.get("/me/login_code", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    let first_ttl = first["expiresIn"].as_i64().unwrap();
    assert!(first_ttl > 0 && first_ttl <= 15 * 60 * 1000);

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let (_, second) = app.get("/me/login_code", Some(&token)).await;
    assert_eq!(second["logonCode"], first["logonCode"]);
    assert!(second["expiresIn"].as_i64().unwrap() < first_ttl);
}

#[tokio::test]
async fn test_exchange_mints_token_and_consumes_code() {
    let app = TestApp::new(Catalog::default());
    let account = blank_account();
    let id = account.id;
    let token = app.sign_in(account).await;

    let (_, issued) = app.get("/me/login_code", Some(&token)).await;
    let code = issued["logonCode"].as_u64().unwrap();
    let uri = format!("/me/login?code={code}");

    let (status, body) = app.send(Method::POST, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully logged in.");
    let new_token = body["token"].as_str().unwrap().to_string();
    assert_ne!(new_token, token);

    let (status, me) = app.get("/me", Some(&new_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], id.to_string());

    let stored = app.account(id).await;
    assert!(stored.login_code.is_none());
    assert_eq!(stored.tokens.len(), 2);

    let (status, body) = app.send(Method::POST, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Invalid Code");
}

#[tokio::test]
async fn test_expired_code_is_rejected_without_minting() {
    let app = TestApp::new(Catalog::default());
    let mut account = blank_account();
    let code = LoginCode::try_from(482_913).unwrap();
    account.login_code = Some(PendingLoginCode {
        code,
        expires_at: Utc::now() - Duration::minutes(1),
    });
    let id = account.id;
    app.insert(account).await;

    let (status, body) = app
        .send(Method::POST, &format!("/me/login?code={code}"), None, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Expired login code.");
    assert!(app.account(id).await.tokens.is_empty());
}

#[tokio::test]
async fn test_missing_or_malformed_code() {
    let app = TestApp::new(Catalog::default());

    let (status, body) = app.send(Method::POST, "/me/login", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No login code provided.");

    let (status, _) = app
        .send(Method::POST, "/me/login?code=12ab", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
