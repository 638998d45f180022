use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::info;

use crate::{
    ledger::{
        handlers::{get_ledger_entry, post_ledger_entry, search_ledger},
        repository::LedgerRepository,
    },
    middleware::{auth::require_admin, rate_limit::rate_limit_middleware, rate_limit::AdminRateLimit},
    reconciliation::{engine::ReconciliationEngine, handlers::reconcile_wallets},
    wallet::{
        handlers::{get_wallet_balance, get_wallet_ledger, list_wallets},
        repository::WalletRepository,
    },
};

// The reconciliation pass is a full scan; give it room to finish.
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerRepository>,
    pub wallets: Arc<WalletRepository>,
    pub reconciliation: Arc<ReconciliationEngine>,
    pub admin_token: Arc<String>,
    pub admin_rate_limit: AdminRateLimit,
}

pub async fn create_app(state: AppState) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    // Admin surface: reconciliation trigger plus ledger/wallet inspection
    let admin_routes = Router::new()
        .route("/reconciliation/wallets", post(reconcile_wallets))
        .route(
            "/api/v1/admin/ledger",
            get(search_ledger).post(post_ledger_entry),
        )
        .route("/api/v1/admin/ledger/:id", get(get_ledger_entry))
        .route("/api/v1/admin/wallets", get(list_wallets))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let app = Router::new()
        // Public health check endpoint
        .route("/health", get(health_check))
        // Wallet read endpoints
        .route("/api/v1/wallet/:user_id/balance", get(get_wallet_balance))
        .route("/api/v1/wallet/:user_id/ledger", get(get_wallet_ledger))
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::very_permissive())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS))),
        )
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn run_server(app: Router, bind_address: &str) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
