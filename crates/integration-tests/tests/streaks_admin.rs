//! Streak kiosk visits and officer bulk updates.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

use shekels_core::{AccountId, Shekels};
use shekels_integration_tests::{BUMP_KEY, TestApp, blank_account};
use shekels_server::models::Catalog;

fn bump_uri(name: &str) -> String {
    format!("/streaks/bump?key={BUMP_KEY}&name={name}&email=27glhopper%40school.org")
}

#[tokio::test]
async fn test_bump_requires_key() {
    let app = TestApp::new(Catalog::default());

    let (status, body) = app.get("/streaks/bump?name=Grace%20Hopper", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid key.");

    let (status, _) = app
        .get("/streaks/bump?key=wrong&name=Grace%20Hopper", None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(app.state.accounts().load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_first_visit_creates_account() {
    let app = TestApp::new(Catalog::default());

    let (status, body) = app.get(&bump_uri("Grace%20Hopper"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Registered new visitor.");

    let snapshot = app.state.accounts().load().await.unwrap();
    let account = snapshot.by_name("Grace Hopper").unwrap();
    assert_eq!(account.shekels, Shekels::new(1));
    assert_eq!(account.visits.len(), 1);
    assert_eq!(
        account.email.as_ref().map(|e| e.as_str()),
        Some("27glhopper@school.org")
    );
}

#[tokio::test]
async fn test_repeat_visit_too_soon_then_credited() {
    let app = TestApp::new(Catalog::default());
    app.get(&bump_uri("Grace%20Hopper"), None).await;

    let (status, body) = app.get(&bump_uri("Grace%20Hopper"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Bumped too recently.");

    // Move the first visit back a week.
    let snapshot = app.state.accounts().load().await.unwrap();
    let mut account = snapshot.by_name("Grace Hopper").unwrap().clone();
    account.visits = vec![Utc::now() - Duration::days(7)];
    let id = account.id;
    app.insert(account).await;

    let (status, body) = app.get(&bump_uri("Grace%20Hopper"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully registered visit.");

    let account = app.account(id).await;
    assert_eq!(account.visits.len(), 2);
    assert!(account.shekels > Shekels::new(1));
}

#[tokio::test]
async fn test_admin_updates() {
    let app = TestApp::new(Catalog::default());
    let mut officer = blank_account();
    officer.admin = true;
    let officer_token = app.sign_in(officer).await;

    let mut member = blank_account();
    member.name = Some("Alan Turing".to_string());
    member.shekels = Shekels::new(10);
    let member_id = member.id;
    let member_token = app.sign_in(member).await;

    let updates = json!([
        { "shekel_guid": member_id, "real_name": "Alan Turing", "grant": 5 },
        { "shekel_guid": AccountId::generate(), "real_name": "Katherine Johnson", "grant": 3 },
    ]);

    let (status, body) = app
        .post("/users/update", Some(&member_token), updates.clone())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You are not authorized to perform this action.");
    assert_eq!(app.account(member_id).await.shekels, Shekels::new(10));

    let (status, report) = app
        .post("/users/update", Some(&officer_token), updates)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["updated"], json!([member_id]));
    assert_eq!(report["created"].as_array().unwrap().len(), 1);
    assert_eq!(app.account(member_id).await.shekels, Shekels::new(15));

    let snapshot = app.state.accounts().load().await.unwrap();
    assert_eq!(
        snapshot.by_name("Katherine Johnson").unwrap().shekels,
        Shekels::new(3)
    );
}
