use std::sync::Arc;
use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::{
    config::Config, error::AppResult, ledger::repository::LedgerRepository,
    middleware::rate_limit::AdminRateLimit, reconciliation::engine::ReconciliationEngine,
    server::AppState, wallet::repository::WalletRepository,
};

// Admin quota: the reconciliation trigger is an infrequent manual action.
const ADMIN_RATE_LIMIT_REQUESTS: u32 = 10;
const ADMIN_RATE_LIMIT_PERIOD_SECS: u64 = 60;

pub async fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("Initializing application components ...");

    let pool = initialize_database(&config.database_url).await?;

    let ledger = Arc::new(LedgerRepository::new(pool.clone()));
    info!("✅ Ledger repository initialized");

    let wallets = Arc::new(WalletRepository::new(pool.clone()));
    info!("✅ Wallet repository initialized");

    let reconciliation = Arc::new(ReconciliationEngine::new(ledger.clone()));
    info!("✅ Reconciliation engine initialized");

    Ok(AppState {
        ledger,
        wallets,
        reconciliation,
        admin_token: Arc::new(config.admin_token.clone()),
        admin_rate_limit: AdminRateLimit::new(
            ADMIN_RATE_LIMIT_REQUESTS,
            ADMIN_RATE_LIMIT_PERIOD_SECS,
        ),
    })
}

async fn initialize_database(database_url: &str) -> AppResult<PgPool> {
    info!("📦 Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("✅ Database ready (migrations applied)");

    Ok(pool)
}
