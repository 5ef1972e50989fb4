//! HTTP surface: router, request DTOs, and handlers. All routes except
//! `/health` require a valid bearer credential.

use axum::routing::{get, post, put};
use axum::{Json, Router, extract::State};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::auth::AuthUser;
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::types::portfolio::Portfolio;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub jwt_secret: Vec<u8>,
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/deposit", post(deposit))
        .route("/positions/open", put(open_position))
        .route("/positions/close", put(close_position))
        .route("/portfolio", get(get_portfolio))
        .with_state(state)
}

async fn health() -> &'static str {
    "healthy"
}

#[derive(Deserialize)]
struct DepositRequest {
    amount: Option<Decimal>,
}

/// Open-position body. Fields are optional here so the ledger can
/// report missing fields as 400s instead of serde rejections.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenPositionRequest {
    ticker_symbol: Option<String>,
    purchase_date: Option<NaiveDate>,
    shares: Option<Decimal>,
    dollar_amount: Option<Decimal>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClosePositionRequest {
    ticker_symbol: Option<String>,
    shares: Option<Decimal>,
    sale_amount: Option<Decimal>,
    position_id: Option<Uuid>,
}

async fn deposit(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<DepositRequest>,
) -> Result<Json<Portfolio>, LedgerError> {
    let portfolio = state.ledger.deposit_funds(user.user_id, body.amount).await?;
    Ok(Json(portfolio))
}

async fn open_position(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<OpenPositionRequest>,
) -> Result<Json<Portfolio>, LedgerError> {
    let portfolio = state
        .ledger
        .open_position(
            user.user_id,
            body.ticker_symbol,
            body.purchase_date,
            body.shares,
            body.dollar_amount,
        )
        .await?;
    Ok(Json(portfolio))
}

async fn close_position(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<ClosePositionRequest>,
) -> Result<Json<Portfolio>, LedgerError> {
    let portfolio = state
        .ledger
        .close_position(
            user.user_id,
            body.ticker_symbol,
            body.shares,
            body.sale_amount,
            body.position_id,
        )
        .await?;
    Ok(Json(portfolio))
}

async fn get_portfolio(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Portfolio>, LedgerError> {
    let portfolio = state.ledger.get_portfolio(user.user_id).await?;
    Ok(Json(portfolio))
}
