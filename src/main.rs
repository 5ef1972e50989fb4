use std::sync::Arc;

use portfolio_ledger::api::routes::{AppState, app_router};
use portfolio_ledger::config::Config;
use portfolio_ledger::ledger::Ledger;
use portfolio_ledger::persistence::{PgPortfolioStore, create_pool_and_migrate};
use portfolio_ledger::pricing::{FinnhubPriceSource, FixedPriceSource, SharedPriceSource};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let pool = create_pool_and_migrate(&config.database_url).await?;
    let store = Arc::new(PgPortfolioStore::new(pool));

    let prices: SharedPriceSource = match &config.finnhub_api_key {
        Some(key) => Arc::new(FinnhubPriceSource::new(key.clone())?),
        None => {
            tracing::warn!("FINNHUB_API_KEY not set; market-price lookups will fail");
            Arc::new(FixedPriceSource::new())
        }
    };

    let state = AppState {
        ledger: Arc::new(Ledger::new(store, prices)),
        jwt_secret: config.jwt_secret,
    };

    let app = app_router(state);
    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
