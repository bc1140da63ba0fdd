//! Shop listing and purchases through the router.

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use shekels_core::{ItemId, Shekels};
use shekels_integration_tests::{TestApp, blank_account};
use shekels_server::models::{Account, Catalog, CatalogItem};

fn item(id: &str, price: u64) -> CatalogItem {
    CatalogItem {
        id: ItemId::new(id),
        title: id.replace('-', " "),
        description: String::new(),
        price: Shekels::new(price),
        expires_at: None,
        max_quantity: None,
        expires_after_secs: None,
    }
}

fn catalog(now: DateTime<Utc>) -> Catalog {
    let mut pass = item("homework-pass", 5);
    pass.max_quantity = Some(1);
    pass.expires_after_secs = Some(7 * 24 * 60 * 60);

    let mut pizza = item("pizza-party", 1);
    pizza.expires_at = Some(now - Duration::days(1));

    Catalog {
        items: vec![item("sticker", 10), pass, pizza],
    }
}

fn funded(shekels: u64) -> Account {
    let mut account = blank_account();
    account.name = Some("Ada Lovelace".to_string());
    account.shekels = Shekels::new(shekels);
    account
}

#[tokio::test]
async fn test_listing_hides_expired_items() {
    let app = TestApp::new(catalog(Utc::now()));

    let (status, body) = app.get("/shop/items", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = body["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["sticker", "homework-pass"]);
}

#[tokio::test]
async fn test_insufficient_balance_reports_deficit() {
    let app = TestApp::new(catalog(Utc::now()));
    let account = funded(5);
    let id = account.id;
    let token = app.sign_in(account).await;

    let (status, body) = app
        .post("/shop/purchase", Some(&token), json!({ "itemID": "sticker" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap().contains("5 more"));

    let stored = app.account(id).await;
    assert_eq!(stored.shekels, Shekels::new(5));
    assert!(stored.items.is_empty());
}

#[tokio::test]
async fn test_purchase_debits_price_and_records_item() {
    let app = TestApp::new(catalog(Utc::now()));
    let account = funded(25);
    let id = account.id;
    let token = app.sign_in(account).await;

    let (status, body) = app
        .post("/shop/purchase", Some(&token), json!({ "itemID": "sticker" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Item purchased successfully.");

    let stored = app.account(id).await;
    assert_eq!(stored.shekels, Shekels::new(15));
    assert_eq!(stored.items.len(), 1);
    assert_eq!(stored.items[0].price, Shekels::new(10));

    let (_, owned) = app.get("/me/purchases", Some(&token)).await;
    assert_eq!(owned["products"][0]["id"], "sticker");
}

#[tokio::test]
async fn test_quantity_cap_until_record_expires() {
    let app = TestApp::new(catalog(Utc::now()));
    let account = funded(20);
    let id = account.id;
    let token = app.sign_in(account).await;
    let buy = json!({ "itemID": "homework-pass" });

    let (status, _) = app.post("/shop/purchase", Some(&token), buy.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post("/shop/purchase", Some(&token), buy.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.account(id).await.shekels, Shekels::new(15));
    assert!(body["message"].as_str().unwrap().contains("any more"));

    // Age the first pass past its expiry.
    let mut stored = app.account(id).await;
    stored.items[0].expires_at = Some(Utc::now() - Duration::seconds(1));
    app.insert(stored).await;

    let (status, _) = app.post("/shop/purchase", Some(&token), buy).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.account(id).await.items.len(), 2);
}

#[tokio::test]
async fn test_unknown_and_expired_items() {
    let app = TestApp::new(catalog(Utc::now()));
    let token = app.sign_in(funded(50)).await;

    let (status, body) = app
        .post("/shop/purchase", Some(&token), json!({ "itemID": "unicorn" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Item not found.");

    let (status, _) = app
        .post("/shop/purchase", Some(&token), json!({ "itemID": "pizza-party" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_body_token_authenticates_purchase() {
    let app = TestApp::new(catalog(Utc::now()));
    let token = app.sign_in(funded(10)).await;

    let (status, _) = app
        .post(
            "/shop/purchase",
            None,
            json!({ "itemID": "sticker", "token": token }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_records_survive_catalog_edits() {
    let app = TestApp::new(catalog(Utc::now()));
    let account = funded(10);
    let id = account.id;
    let token = app.sign_in(account).await;
    app.post("/shop/purchase", Some(&token), json!({ "itemID": "sticker" }))
        .await;

    let mut edited = catalog(Utc::now());
    edited.items.retain(|i| i.id.as_str() != "homework-pass");
    edited.items.insert(0, item("new-poster", 3));
    app.state.catalog().replace(edited).await.unwrap();

    let stored = app.account(id).await;
    let catalog = app.state.catalog().load().await.unwrap();
    let record = &stored.items[0];
    assert_eq!(catalog.get(&record.id).unwrap().title, record.title);
}

#[tokio::test]
async fn test_oversized_lifetime_is_a_server_error() {
    let app = TestApp::new(catalog(Utc::now()));
    let account = funded(50);
    let id = account.id;
    let token = app.sign_in(account).await;

    let mut forever = item("forever-pass", 5);
    forever.expires_after_secs = Some(9_000_000_000_000);
    app.state
        .catalog()
        .replace(Catalog {
            items: vec![forever],
        })
        .await
        .unwrap();

    let (status, body) = app
        .post("/shop/purchase", Some(&token), json!({ "itemID": "forever-pass" }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);

    let stored = app.account(id).await;
    assert_eq!(stored.shekels, Shekels::new(50));
    assert!(stored.items.is_empty());
}
