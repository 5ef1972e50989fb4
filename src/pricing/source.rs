use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PriceError {
    #[error("no quote available for {symbol}")]
    NoQuote { symbol: String },
    #[error("price request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Current market price for an upper-cased ticker symbol.
    async fn current_price(&self, symbol: &str) -> Result<Decimal, PriceError>;
}

pub type SharedPriceSource = Arc<dyn PriceSource>;

/// Static symbol → price table. Used in tests and when no provider
/// key is configured (every lookup then fails, which the ledger
/// surfaces as price-unavailable rather than a free position).
#[derive(Clone, Default)]
pub struct FixedPriceSource {
    prices: HashMap<String, Decimal>,
}

impl FixedPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.prices.insert(symbol.to_uppercase(), price);
        self
    }
}

#[async_trait]
impl PriceSource for FixedPriceSource {
    async fn current_price(&self, symbol: &str) -> Result<Decimal, PriceError> {
        self.prices
            .get(&symbol.to_uppercase())
            .copied()
            .ok_or_else(|| PriceError::NoQuote {
                symbol: symbol.to_uppercase(),
            })
    }
}
