use crate::ledger::models::{Currency, OwnerType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Denormalized balance cache over the ledger. Exactly one wallet exists per
/// (owner, owner_type) pair; `balance_cents` is mutated only by the posting
/// path and the reconciliation repair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_type: OwnerType,
    pub currency: Currency,
    pub balance_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
