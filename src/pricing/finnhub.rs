//! Finnhub-backed price source using the `/quote` endpoint.
//!
//! Free tier is limited to 60 calls per minute; the ledger makes at
//! most one lookup per open-position request.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use crate::pricing::source::{PriceError, PriceSource};

const BASE_URL: &str = "https://finnhub.io/api/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Response from `/quote`. Finnhub reports `c` (current price) as `0`
/// for unknown symbols.
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    c: Option<f64>,
}

pub struct FinnhubPriceSource {
    client: Client,
    api_key: String,
}

impl FinnhubPriceSource {
    pub fn new(api_key: impl Into<String>) -> Result<Self, PriceError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl PriceSource for FinnhubPriceSource {
    async fn current_price(&self, symbol: &str) -> Result<Decimal, PriceError> {
        let quote: QuoteResponse = self
            .client
            .get(format!("{BASE_URL}/quote"))
            .query(&[("symbol", symbol), ("token", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let current = quote.c.filter(|c| *c > 0.0).ok_or_else(|| PriceError::NoQuote {
            symbol: symbol.to_string(),
        })?;
        Decimal::try_from(current).map_err(|_| PriceError::NoQuote {
            symbol: symbol.to_string(),
        })
    }
}
