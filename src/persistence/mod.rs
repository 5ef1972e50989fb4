//! Storage layer: pool, migrations, and the portfolio store.

mod memory;
mod pool;
mod portfolios;
mod store;

pub use memory::MemoryPortfolioStore;
pub use pool::{create_pool_and_migrate, run_migrations};
pub use portfolios::PgPortfolioStore;
pub use sqlx::PgPool;
pub use store::{PortfolioStore, SharedPortfolioStore, StoreError, VersionedPortfolio};
