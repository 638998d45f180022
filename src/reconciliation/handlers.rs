use crate::error::AppResult;
use crate::reconciliation::engine::ReconciliationSummary;
use crate::server::AppState;
use axum::{extract::State, Json};
use tracing::info;

/// Trigger a full reconciliation pass over all wallets with ledger activity.
/// POST /reconciliation/wallets
pub async fn reconcile_wallets(
    State(state): State<AppState>,
) -> AppResult<Json<ReconciliationSummary>> {
    info!("Admin triggered wallet reconciliation");
    let summary = state.reconciliation.reconcile_wallets().await?;
    Ok(Json(summary))
}
