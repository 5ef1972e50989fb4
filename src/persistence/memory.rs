//! In-memory portfolio store. Used by the integration tests and as a
//! stand-in when no database is configured.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::persistence::store::{PortfolioStore, StoreError, VersionedPortfolio};
use crate::types::portfolio::Portfolio;

#[derive(Clone, Default)]
pub struct MemoryPortfolioStore {
    records: Arc<RwLock<HashMap<Uuid, VersionedPortfolio>>>,
}

impl MemoryPortfolioStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PortfolioStore for MemoryPortfolioStore {
    async fn find(&self, user_id: Uuid) -> Result<Option<VersionedPortfolio>, StoreError> {
        Ok(self.records.read().await.get(&user_id).cloned())
    }

    async fn insert(&self, portfolio: &Portfolio) -> Result<(), StoreError> {
        let mut guard = self.records.write().await;
        if guard.contains_key(&portfolio.user_id) {
            return Err(StoreError::VersionConflict {
                user_id: portfolio.user_id,
            });
        }
        guard.insert(
            portfolio.user_id,
            VersionedPortfolio {
                portfolio: portfolio.clone(),
                version: 1,
            },
        );
        Ok(())
    }

    async fn update(
        &self,
        portfolio: &Portfolio,
        expected_version: i64,
    ) -> Result<(), StoreError> {
        let mut guard = self.records.write().await;
        match guard.get_mut(&portfolio.user_id) {
            Some(rec) if rec.version == expected_version => {
                rec.portfolio = portfolio.clone();
                rec.version += 1;
                Ok(())
            }
            _ => Err(StoreError::VersionConflict {
                user_id: portfolio.user_id,
            }),
        }
    }
}
