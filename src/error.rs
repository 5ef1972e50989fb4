//! Ledger error kinds and their HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::persistence::StoreError;

/// Every failure a ledger operation can report. Validation errors are
/// raised before any store write, so a failed operation never leaves a
/// partial mutation behind.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("{0}")]
    InvalidAmount(String),
    #[error("{0} is required.")]
    MissingField(&'static str),
    #[error("Portfolio not found. Add funds first to create one.")]
    PortfolioNotFound,
    #[error("Insufficient balance to open this position.")]
    InsufficientFunds,
    #[error("No market price available for {symbol}.")]
    PriceUnavailable { symbol: String },
    #[error("Position not found for sale.")]
    PositionNotFound,
    #[error("Invalid or missing credentials.")]
    Unauthorized,
    #[error("The portfolio was modified concurrently; please retry.")]
    Conflict,
    #[error("Storage error: {0}")]
    Persistence(#[source] sqlx::Error),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict { .. } => Self::Conflict,
            StoreError::Database(e) => Self::Persistence(e),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidAmount(_) | Self::MissingField(_) | Self::InsufficientFunds => {
                StatusCode::BAD_REQUEST
            }
            Self::PortfolioNotFound | Self::PositionNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::PriceUnavailable { .. } => StatusCode::BAD_GATEWAY,
            Self::Conflict | Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "ledger request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
