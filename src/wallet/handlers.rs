use crate::error::AppResult;
use crate::ledger::models::{Currency, OwnerType, WalletLedgerEntry};
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct BalanceQuery {
    pub currency: Option<Currency>,
}

#[derive(Serialize)]
pub struct WalletBalanceResponse {
    pub user_id: Uuid,
    pub wallet_id: Option<Uuid>,
    pub currency: Currency,
    /// Cached balance on the wallet row (zero when no wallet exists yet).
    /// The cache aggregates across currencies.
    pub stored_balance_cents: i64,
    /// Ledger balance for the requested currency.
    pub ledger_balance_cents: i64,
    /// Ledger balance across all currencies, the value the cache mirrors.
    pub ledger_total_cents: i64,
    pub consistent: bool,
}

impl WalletBalanceResponse {
    /// The consistency flag compares the cache against the cross-currency
    /// ledger total, the same aggregate the posting path and the
    /// reconciliation engine maintain.
    fn build(
        user_id: Uuid,
        wallet: Option<crate::wallet::models::Wallet>,
        currency: Currency,
        ledger_balance_cents: i64,
        ledger_total_cents: i64,
    ) -> Self {
        let stored_balance_cents = wallet.as_ref().map(|w| w.balance_cents).unwrap_or(0);
        WalletBalanceResponse {
            user_id,
            wallet_id: wallet.map(|w| w.id),
            currency,
            stored_balance_cents,
            ledger_balance_cents,
            ledger_total_cents,
            consistent: stored_balance_cents == ledger_total_cents,
        }
    }
}

#[derive(Deserialize)]
pub struct LedgerHistoryQuery {
    pub currency: Option<Currency>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct LedgerHistoryResponse {
    pub user_id: Uuid,
    pub entries: Vec<WalletLedgerEntry>,
}

#[derive(Serialize)]
pub struct WalletListResponse {
    pub wallets: Vec<crate::wallet::models::Wallet>,
}

/// GET /api/v1/wallet/:user_id/balance
pub async fn get_wallet_balance(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<BalanceQuery>,
) -> AppResult<Json<WalletBalanceResponse>> {
    let currency = query.currency.unwrap_or_default();

    let ledger_balance_cents = state
        .ledger
        .calculate_balance(user_id, Some(currency))
        .await?;
    let ledger_total_cents = state.ledger.calculate_balance(user_id, None).await?;
    let wallet = state.wallets.find_by_owner(user_id, OwnerType::User).await?;

    Ok(Json(WalletBalanceResponse::build(
        user_id,
        wallet,
        currency,
        ledger_balance_cents,
        ledger_total_cents,
    )))
}

/// GET /api/v1/wallet/:user_id/ledger
pub async fn get_wallet_ledger(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<LedgerHistoryQuery>,
) -> AppResult<Json<LedgerHistoryResponse>> {
    let limit = query.limit.unwrap_or(100).clamp(1, 500);

    let entries = state
        .ledger
        .entries_for_user(user_id, query.currency, limit)
        .await?;

    Ok(Json(LedgerHistoryResponse { user_id, entries }))
}

/// GET /api/v1/admin/wallets
pub async fn list_wallets(State(state): State<AppState>) -> AppResult<Json<WalletListResponse>> {
    let wallets = state.wallets.list(200).await?;
    Ok(Json(WalletListResponse { wallets }))
}
