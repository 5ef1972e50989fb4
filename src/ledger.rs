//! Core portfolio ledger: deposit, open/close position, read.
//! Testable without HTTP.
//!
//! Every mutation is a read-modify-write against the store. The store
//! rejects writes whose record version is stale, and the ledger
//! re-reads and re-validates on conflict, so racing mutations on one
//! user serialize instead of losing updates.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::persistence::{SharedPortfolioStore, StoreError};
use crate::pricing::SharedPriceSource;
use crate::types::portfolio::{CostBasis, Portfolio, Position};

/// Attempts per mutation before giving up on version conflicts.
const MAX_CAS_RETRIES: usize = 5;

pub struct Ledger {
    store: SharedPortfolioStore,
    prices: SharedPriceSource,
}

impl Ledger {
    pub fn new(store: SharedPortfolioStore, prices: SharedPriceSource) -> Self {
        Self { store, prices }
    }

    /// Add funds to the user's balance, creating the portfolio on the
    /// first deposit.
    pub async fn deposit_funds(
        &self,
        user_id: Uuid,
        amount: Option<Decimal>,
    ) -> Result<Portfolio, LedgerError> {
        let amount = amount.filter(|a| *a > Decimal::ZERO).ok_or_else(|| {
            LedgerError::InvalidAmount("A valid positive amount is required.".to_string())
        })?;

        for _ in 0..MAX_CAS_RETRIES {
            match self.store.find(user_id).await? {
                None => {
                    let portfolio = Portfolio::new(user_id, amount);
                    match self.store.insert(&portfolio).await {
                        Ok(()) => {
                            tracing::info!(%user_id, %amount, "portfolio created");
                            return Ok(portfolio);
                        }
                        // Lost the create race; re-read and add instead.
                        Err(StoreError::VersionConflict { .. }) => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
                Some(mut rec) => {
                    rec.portfolio.balance = checked_credit(rec.portfolio.balance, amount)?;
                    rec.portfolio.updated_at = Utc::now();
                    match self.store.update(&rec.portfolio, rec.version).await {
                        Ok(()) => return Ok(rec.portfolio),
                        Err(StoreError::VersionConflict { .. }) => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }
        Err(LedgerError::Conflict)
    }

    /// Open a new lot, paying for it out of the balance. Cost comes
    /// from the dollar amount when given, otherwise from a market
    /// price lookup for the share count.
    pub async fn open_position(
        &self,
        user_id: Uuid,
        ticker_symbol: Option<String>,
        purchase_date: Option<NaiveDate>,
        shares: Option<Decimal>,
        dollar_amount: Option<Decimal>,
    ) -> Result<Portfolio, LedgerError> {
        let ticker = ticker_symbol
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(LedgerError::MissingField("tickerSymbol"))?
            .to_uppercase();
        let purchase_date = purchase_date.ok_or(LedgerError::MissingField("purchaseDate"))?;
        let basis = CostBasis::from_parts(shares, dollar_amount)?;
        let total_cost = self.total_cost(&ticker, &basis).await?;

        for _ in 0..MAX_CAS_RETRIES {
            let Some(mut rec) = self.store.find(user_id).await? else {
                return Err(LedgerError::PortfolioNotFound);
            };
            if rec.portfolio.balance < total_cost {
                return Err(LedgerError::InsufficientFunds);
            }
            rec.portfolio
                .positions
                .push(Position::new(ticker.clone(), purchase_date, &basis));
            // Cannot underflow after the affordability check above.
            rec.portfolio.balance =
                rec.portfolio.balance.checked_sub(total_cost).ok_or_else(amount_out_of_range)?;
            rec.portfolio.updated_at = Utc::now();
            match self.store.update(&rec.portfolio, rec.version).await {
                Ok(()) => return Ok(rec.portfolio),
                Err(StoreError::VersionConflict { .. }) => {
                    tracing::debug!(%user_id, "open conflicted, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(LedgerError::Conflict)
    }

    /// Sell a lot and credit the proceeds. The lot is located by id
    /// when one is supplied, otherwise by case-insensitive ticker plus
    /// an exactly equal share count; partial-quantity sales are not
    /// supported. `sale_amount` is caller-supplied and not re-checked
    /// against a live price.
    pub async fn close_position(
        &self,
        user_id: Uuid,
        ticker_symbol: Option<String>,
        shares: Option<Decimal>,
        sale_amount: Option<Decimal>,
        position_id: Option<Uuid>,
    ) -> Result<Portfolio, LedgerError> {
        let ticker = ticker_symbol
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(LedgerError::MissingField("tickerSymbol"))?
            .to_uppercase();
        let shares = shares.ok_or(LedgerError::MissingField("shares"))?;
        if shares <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(
                "A valid number of shares is required.".to_string(),
            ));
        }
        let sale_amount = sale_amount.ok_or(LedgerError::MissingField("saleAmount"))?;
        if sale_amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(
                "A valid sale amount is required.".to_string(),
            ));
        }

        for _ in 0..MAX_CAS_RETRIES {
            let Some(mut rec) = self.store.find(user_id).await? else {
                return Err(LedgerError::PortfolioNotFound);
            };
            let index = rec
                .portfolio
                .positions
                .iter()
                .position(|pos| match position_id {
                    Some(id) => pos.id == id,
                    None => pos.ticker_symbol == ticker && pos.shares == Some(shares),
                })
                .ok_or(LedgerError::PositionNotFound)?;
            rec.portfolio.positions.remove(index);
            rec.portfolio.balance = checked_credit(rec.portfolio.balance, sale_amount)?;
            rec.portfolio.updated_at = Utc::now();
            match self.store.update(&rec.portfolio, rec.version).await {
                Ok(()) => return Ok(rec.portfolio),
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(LedgerError::Conflict)
    }

    pub async fn get_portfolio(&self, user_id: Uuid) -> Result<Portfolio, LedgerError> {
        match self.store.find(user_id).await? {
            Some(rec) => Ok(rec.portfolio),
            None => Err(LedgerError::PortfolioNotFound),
        }
    }

    async fn total_cost(&self, ticker: &str, basis: &CostBasis) -> Result<Decimal, LedgerError> {
        match basis {
            CostBasis::ByDollarAmount { amount, .. } => Ok(*amount),
            CostBasis::BySharesAtMarket { shares } => {
                let price = self.prices.current_price(ticker).await.map_err(|err| {
                    tracing::warn!(ticker, %err, "price lookup failed");
                    LedgerError::PriceUnavailable {
                        symbol: ticker.to_string(),
                    }
                })?;
                let cost = price.checked_mul(*shares).ok_or_else(amount_out_of_range)?;
                if cost <= Decimal::ZERO {
                    return Err(LedgerError::InvalidAmount(
                        "A valid dollar amount is required.".to_string(),
                    ));
                }
                Ok(cost)
            }
        }
    }
}

/// An overflowing credit surfaces as `InvalidAmount`, never a panic.
fn checked_credit(balance: Decimal, amount: Decimal) -> Result<Decimal, LedgerError> {
    balance.checked_add(amount).ok_or_else(amount_out_of_range)
}

fn amount_out_of_range() -> LedgerError {
    LedgerError::InvalidAmount("Amount exceeds the supported range.".to_string())
}
