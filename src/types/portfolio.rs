use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// How the cost of a new position is determined. Built once at input
/// validation; when both `shares` and `dollarAmount` arrive, the
/// dollar amount wins and the shares are recorded on the lot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CostBasis {
    /// Cost = current market price × shares.
    BySharesAtMarket { shares: Decimal },
    /// Cost = amount, no price lookup needed.
    ByDollarAmount {
        amount: Decimal,
        shares: Option<Decimal>,
    },
}

impl CostBasis {
    /// Resolve the raw optional request fields into a cost basis.
    pub fn from_parts(
        shares: Option<Decimal>,
        dollar_amount: Option<Decimal>,
    ) -> Result<Self, LedgerError> {
        if let Some(s) = shares {
            if s <= Decimal::ZERO {
                return Err(LedgerError::InvalidAmount(
                    "A valid number of shares is required.".to_string(),
                ));
            }
        }
        match (shares, dollar_amount) {
            (shares, Some(amount)) => {
                if amount <= Decimal::ZERO {
                    return Err(LedgerError::InvalidAmount(
                        "A valid dollar amount is required.".to_string(),
                    ));
                }
                Ok(Self::ByDollarAmount { amount, shares })
            }
            (Some(shares), None) => Ok(Self::BySharesAtMarket { shares }),
            (None, None) => Err(LedgerError::MissingField("shares or dollarAmount")),
        }
    }
}

/// One purchased lot. At least one of `shares` / `dollar_amount` is
/// always present because lots are only built from a [`CostBasis`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: Uuid,
    pub ticker_symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dollar_amount: Option<Decimal>,
    pub purchase_date: NaiveDate,
}

impl Position {
    /// New lot with a fresh stable id. `ticker_symbol` must already be
    /// upper-cased.
    pub fn new(ticker_symbol: String, purchase_date: NaiveDate, basis: &CostBasis) -> Self {
        let (shares, dollar_amount) = match basis {
            CostBasis::BySharesAtMarket { shares } => (Some(*shares), None),
            CostBasis::ByDollarAmount { amount, shares } => (*shares, Some(*amount)),
        };
        Self {
            id: Uuid::new_v4(),
            ticker_symbol,
            shares,
            dollar_amount,
            purchase_date,
        }
    }
}

/// The balance+positions record for one user. Exactly one exists per
/// user once the first deposit lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub user_id: Uuid,
    pub balance: Decimal,
    pub positions: Vec<Position>,
    pub updated_at: DateTime<Utc>,
}

impl Portfolio {
    /// Fresh portfolio created by a first deposit.
    pub fn new(user_id: Uuid, opening_balance: Decimal) -> Self {
        Self {
            user_id,
            balance: opening_balance,
            positions: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}
