//! HTTP integration tests: auth gating, request validation, and the
//! deposit/open/close flow end to end over the wire.

use portfolio_ledger::api::auth::create_token;
use portfolio_ledger::api::routes::{AppState, app_router};
use portfolio_ledger::ledger::Ledger;
use portfolio_ledger::persistence::MemoryPortfolioStore;
use portfolio_ledger::pricing::FixedPriceSource;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

const JWT_SECRET: &[u8] = b"test-jwt-secret";

fn test_app_state() -> AppState {
    let store = Arc::new(MemoryPortfolioStore::new());
    let prices = Arc::new(FixedPriceSource::new().with_price("AAPL", dec!(50)));
    AppState {
        ledger: Arc::new(Ledger::new(store, prices)),
        jwt_secret: JWT_SECRET.to_vec(),
    }
}

/// Spawn app on a random port and return (base_url, guard that keeps server running).
async fn spawn_app(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let app = app_router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base_url, handle)
}

fn bearer(user_id: Uuid) -> String {
    format!("Bearer {}", create_token(JWT_SECRET, user_id).unwrap())
}

#[tokio::test]
async fn health_needs_no_auth() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let res = reqwest::get(format!("{}/health", base_url)).await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
}

#[tokio::test]
async fn missing_or_invalid_token_returns_401() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/portfolio", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);

    let res = client
        .post(format!("{}/deposit", base_url))
        .header("Authorization", "Bearer not-a-jwt")
        .json(&serde_json::json!({ "amount": 100 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);

    // Token signed with the wrong secret.
    let forged = create_token(b"other-secret", Uuid::new_v4()).unwrap();
    let res = client
        .get(format!("{}/portfolio", base_url))
        .header("Authorization", format!("Bearer {}", forged))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn deposit_returns_updated_portfolio() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    let user = Uuid::new_v4();

    let res = client
        .post(format!("{}/deposit", base_url))
        .header("Authorization", bearer(user))
        .json(&serde_json::json!({ "amount": 100 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["balance"].as_f64(), Some(100.0));
    assert_eq!(json["userId"].as_str(), Some(user.to_string().as_str()));
    assert_eq!(json["positions"].as_array().map(Vec::len), Some(0));
    assert!(json["updatedAt"].as_str().is_some());

    let res = client
        .post(format!("{}/deposit", base_url))
        .header("Authorization", bearer(user))
        .json(&serde_json::json!({ "amount": 100 }))
        .send()
        .await
        .unwrap();
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["balance"].as_f64(), Some(200.0));
}

#[tokio::test]
async fn deposit_invalid_amount_returns_400_with_error_body() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    let user = Uuid::new_v4();

    for body in [
        serde_json::json!({}),
        serde_json::json!({ "amount": -10 }),
        serde_json::json!({ "amount": 0 }),
    ] {
        let res = client
            .post(format!("{}/deposit", base_url))
            .header("Authorization", bearer(user))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 400);
        let json: serde_json::Value = res.json().await.unwrap();
        assert!(json["error"].as_str().unwrap().contains("amount"));
    }
}

#[tokio::test]
async fn open_without_portfolio_returns_404() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();

    let res = client
        .put(format!("{}/positions/open", base_url))
        .header("Authorization", bearer(Uuid::new_v4()))
        .json(&serde_json::json!({
            "tickerSymbol": "AAPL",
            "purchaseDate": "2024-01-01",
            "dollarAmount": 100
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("Portfolio not found"));
}

#[tokio::test]
async fn open_missing_fields_returns_400() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    let user = Uuid::new_v4();

    let _ = client
        .post(format!("{}/deposit", base_url))
        .header("Authorization", bearer(user))
        .json(&serde_json::json!({ "amount": 1000 }))
        .send()
        .await
        .unwrap();

    let res = client
        .put(format!("{}/positions/open", base_url))
        .header("Authorization", bearer(user))
        .json(&serde_json::json!({ "tickerSymbol": "AAPL", "purchaseDate": "2024-01-01" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("required"));
}

#[tokio::test]
async fn full_deposit_open_close_flow() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    let user = Uuid::new_v4();
    let auth = bearer(user);

    let res = client
        .post(format!("{}/deposit", base_url))
        .header("Authorization", &auth)
        .json(&serde_json::json!({ "amount": 1000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    // $500 dollar-amount lot.
    let res = client
        .put(format!("{}/positions/open", base_url))
        .header("Authorization", &auth)
        .json(&serde_json::json!({
            "tickerSymbol": "aapl",
            "purchaseDate": "2024-01-01",
            "dollarAmount": 500
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["balance"].as_f64(), Some(500.0));
    let positions = json["positions"].as_array().unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0]["tickerSymbol"].as_str(), Some("AAPL"));
    assert_eq!(positions[0]["dollarAmount"].as_f64(), Some(500.0));
    assert!(positions[0]["id"].as_str().is_some());

    // Close with mismatched shares: 404, nothing changes.
    let res = client
        .put(format!("{}/positions/close", base_url))
        .header("Authorization", &auth)
        .json(&serde_json::json!({
            "tickerSymbol": "AAPL",
            "shares": 7,
            "saleAmount": 350
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);

    // 10 shares at the mocked $50 price consume the remaining $500.
    let res = client
        .put(format!("{}/positions/open", base_url))
        .header("Authorization", &auth)
        .json(&serde_json::json!({
            "tickerSymbol": "AAPL",
            "purchaseDate": "2024-02-01",
            "shares": 10
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["balance"].as_f64(), Some(0.0));
    assert_eq!(json["positions"].as_array().map(Vec::len), Some(2));

    // Sell the 10-share lot.
    let res = client
        .put(format!("{}/positions/close", base_url))
        .header("Authorization", &auth)
        .json(&serde_json::json!({
            "tickerSymbol": "AAPL",
            "shares": 10,
            "saleAmount": 600
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["balance"].as_f64(), Some(600.0));
    assert_eq!(json["positions"].as_array().map(Vec::len), Some(1));

    let res = client
        .get(format!("{}/portfolio", base_url))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["balance"].as_f64(), Some(600.0));
}

#[tokio::test]
async fn open_exceeding_balance_returns_400() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    let user = Uuid::new_v4();

    let _ = client
        .post(format!("{}/deposit", base_url))
        .header("Authorization", bearer(user))
        .json(&serde_json::json!({ "amount": 100 }))
        .send()
        .await
        .unwrap();

    let res = client
        .put(format!("{}/positions/open", base_url))
        .header("Authorization", bearer(user))
        .json(&serde_json::json!({
            "tickerSymbol": "AAPL",
            "purchaseDate": "2024-01-01",
            "dollarAmount": 250
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let json: serde_json::Value = res.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("Insufficient"));
}

#[tokio::test]
async fn unknown_symbol_price_returns_502() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();
    let user = Uuid::new_v4();

    let _ = client
        .post(format!("{}/deposit", base_url))
        .header("Authorization", bearer(user))
        .json(&serde_json::json!({ "amount": 1000 }))
        .send()
        .await
        .unwrap();

    let res = client
        .put(format!("{}/positions/open", base_url))
        .header("Authorization", bearer(user))
        .json(&serde_json::json!({
            "tickerSymbol": "NOPE",
            "purchaseDate": "2024-01-01",
            "shares": 1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 502);
}

#[tokio::test]
async fn get_portfolio_before_deposit_returns_404() {
    let (base_url, _handle) = spawn_app(test_app_state()).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/portfolio", base_url))
        .header("Authorization", bearer(Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
}
