use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::types::portfolio::Portfolio;

/// A stored portfolio plus the record version used for optimistic
/// concurrency control. `update` only succeeds against the version the
/// caller read, so two racing read-modify-writes on one user cannot
/// both land.
#[derive(Debug, Clone)]
pub struct VersionedPortfolio {
    pub portfolio: Portfolio,
    pub version: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The record changed (or appeared) since it was read. The caller
    /// re-reads and retries.
    #[error("portfolio version conflict for user {user_id}")]
    VersionConflict { user_id: Uuid },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Durable keyed storage for portfolios, one record per user.
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn find(&self, user_id: Uuid) -> Result<Option<VersionedPortfolio>, StoreError>;

    /// Insert a brand-new record at version 1. Fails with
    /// `VersionConflict` when a record already exists, which happens
    /// when two first deposits race.
    async fn insert(&self, portfolio: &Portfolio) -> Result<(), StoreError>;

    /// Replace the stored record iff its version still equals
    /// `expected_version`; bumps the version on success.
    async fn update(&self, portfolio: &Portfolio, expected_version: i64)
    -> Result<(), StoreError>;
}

pub type SharedPortfolioStore = Arc<dyn PortfolioStore>;
