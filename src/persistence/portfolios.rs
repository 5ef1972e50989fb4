//! Postgres portfolio store: versioned row per user plus a child
//! positions table kept in insertion order.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::persistence::store::{PortfolioStore, StoreError, VersionedPortfolio};
use crate::types::portfolio::{Portfolio, Position};

#[derive(FromRow)]
struct PortfolioRow {
    user_id: Uuid,
    balance: Decimal,
    version: i64,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct PositionRow {
    id: Uuid,
    ticker_symbol: String,
    shares: Option<Decimal>,
    dollar_amount: Option<Decimal>,
    purchase_date: NaiveDate,
}

impl From<PositionRow> for Position {
    fn from(row: PositionRow) -> Self {
        Self {
            id: row.id,
            ticker_symbol: row.ticker_symbol,
            shares: row.shares,
            dollar_amount: row.dollar_amount,
            purchase_date: row.purchase_date,
        }
    }
}

#[derive(Clone)]
pub struct PgPortfolioStore {
    pool: PgPool,
}

impl PgPortfolioStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PortfolioStore for PgPortfolioStore {
    async fn find(&self, user_id: Uuid) -> Result<Option<VersionedPortfolio>, StoreError> {
        let row = sqlx::query_as::<_, PortfolioRow>(
            "SELECT user_id, balance, version, updated_at FROM portfolios WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else { return Ok(None) };

        let positions = sqlx::query_as::<_, PositionRow>(
            "SELECT id, ticker_symbol, shares, dollar_amount, purchase_date \
             FROM positions WHERE user_id = $1 ORDER BY seq",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(VersionedPortfolio {
            portfolio: Portfolio {
                user_id: row.user_id,
                balance: row.balance,
                positions: positions.into_iter().map(Position::from).collect(),
                updated_at: row.updated_at,
            },
            version: row.version,
        }))
    }

    async fn insert(&self, portfolio: &Portfolio) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO portfolios (user_id, balance, version, updated_at) \
             VALUES ($1, $2, 1, $3) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(portfolio.user_id)
        .bind(portfolio.balance)
        .bind(portfolio.updated_at)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::VersionConflict {
                user_id: portfolio.user_id,
            });
        }
        write_positions(&mut tx, portfolio).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update(
        &self,
        portfolio: &Portfolio,
        expected_version: i64,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE portfolios SET balance = $2, updated_at = $3, version = version + 1 \
             WHERE user_id = $1 AND version = $4",
        )
        .bind(portfolio.user_id)
        .bind(portfolio.balance)
        .bind(portfolio.updated_at)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::VersionConflict {
                user_id: portfolio.user_id,
            });
        }
        sqlx::query("DELETE FROM positions WHERE user_id = $1")
            .bind(portfolio.user_id)
            .execute(&mut *tx)
            .await?;
        write_positions(&mut tx, portfolio).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Rewrite the child rows. Lots per user stay small, so replacing the
/// set inside the row-version transaction is simpler than diffing.
async fn write_positions(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    portfolio: &Portfolio,
) -> Result<(), sqlx::Error> {
    for (seq, pos) in portfolio.positions.iter().enumerate() {
        sqlx::query(
            "INSERT INTO positions (id, user_id, seq, ticker_symbol, shares, dollar_amount, purchase_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(pos.id)
        .bind(portfolio.user_id)
        .bind(seq as i64)
        .bind(&pos.ticker_symbol)
        .bind(pos.shares)
        .bind(pos.dollar_amount)
        .bind(pos.purchase_date)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
