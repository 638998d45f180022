use crate::error::{AppError, AppResult};
use crate::ledger::models::{Currency, LedgerEntryType, LedgerSourceType, WalletLedgerEntry};
use crate::ledger::repository::LedgerSearchFilter;
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize, Validate)]
pub struct LedgerSearchQuery {
    pub user_id: Option<Uuid>,
    pub entry_type: Option<LedgerEntryType>,
    pub source_type: Option<LedgerSourceType>,
    pub source_id: Option<String>,
    #[validate(range(min = 1, max = 200))]
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub cursor: Option<Uuid>,
}

#[derive(Serialize)]
pub struct LedgerSearchResponse {
    pub entries: Vec<WalletLedgerEntry>,
    /// Pass back as `cursor` to fetch the next page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Uuid>,
}

/// GET /api/v1/admin/ledger
pub async fn search_ledger(
    State(state): State<AppState>,
    Query(query): Query<LedgerSearchQuery>,
) -> AppResult<Json<LedgerSearchResponse>> {
    query
        .validate()
        .map_err(|e| AppError::InvalidInput(format!("Validation failed: {}", e)))?;

    let filter = LedgerSearchFilter {
        user_id: query.user_id,
        entry_type: query.entry_type,
        source_type: query.source_type,
        source_id: query.source_id,
        limit: query.limit,
        cursor: query.cursor,
    };

    let entries = state.ledger.search(&filter).await?;
    let next_cursor = if entries.len() as i64 == filter.limit {
        entries.last().map(|e| e.id)
    } else {
        None
    };

    Ok(Json(LedgerSearchResponse {
        entries,
        next_cursor,
    }))
}

/// GET /api/v1/admin/ledger/:id
pub async fn get_ledger_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<WalletLedgerEntry>> {
    let entry = state.ledger.get_entry(id).await?;
    Ok(Json(entry))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PostLedgerEntryRequest {
    pub user_id: Uuid,
    pub entry_type: LedgerEntryType,
    #[validate(range(min = 1))]
    pub amount_cents: i64,
    #[serde(default)]
    pub currency: Currency,
    pub source_type: LedgerSourceType,
    pub source_id: Option<String>,
}

/// POST /api/v1/admin/ledger
///
/// Manual posting, mostly for adjustments; product flows post through the
/// repository directly.
pub async fn post_ledger_entry(
    State(state): State<AppState>,
    Json(req): Json<PostLedgerEntryRequest>,
) -> AppResult<(StatusCode, Json<WalletLedgerEntry>)> {
    req.validate()
        .map_err(|e| AppError::InvalidInput(format!("Validation failed: {}", e)))?;

    let entry = match req.entry_type {
        LedgerEntryType::Credit => {
            state
                .ledger
                .record_credit(
                    req.user_id,
                    req.amount_cents,
                    req.currency,
                    req.source_type,
                    req.source_id,
                )
                .await?
        }
        LedgerEntryType::Debit => {
            state
                .ledger
                .record_debit(
                    req.user_id,
                    req.amount_cents,
                    req.currency,
                    req.source_type,
                    req.source_id,
                )
                .await?
        }
    };

    Ok((StatusCode::CREATED, Json(entry)))
}
