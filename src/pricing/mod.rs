//! Market-price lookup behind the [`PriceSource`] trait. The ledger
//! never sees provider details, only a price or a failure.

mod finnhub;
mod source;

pub use finnhub::FinnhubPriceSource;
pub use source::{FixedPriceSource, PriceError, PriceSource, SharedPriceSource};
