use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, Type};
use std::fmt;
use uuid::Uuid;

/// Direction of a ledger entry. The amount itself is always positive;
/// the sign effect on the wallet balance is carried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "ledger_entry_type", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum LedgerEntryType {
    Credit,
    Debit,
}

impl fmt::Display for LedgerEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl LedgerEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryType::Credit => "CREDIT",
            LedgerEntryType::Debit => "DEBIT",
        }
    }

    /// Signed effect of an entry on the wallet balance.
    pub fn signed_cents(&self, amount_cents: i64) -> i64 {
        match self {
            LedgerEntryType::Credit => amount_cents,
            LedgerEntryType::Debit => -amount_cents,
        }
    }
}

/// Business event that produced a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "ledger_source_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerSourceType {
    Reward,
    Commission,
    Referral,
    Payout,
    AdSpend,
    Verification,
    Adjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "currency_type", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Zwg,
}

impl Default for Currency {
    fn default() -> Self {
        Currency::Usd
    }
}

/// Principal kind a wallet belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "owner_type", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum OwnerType {
    User,
    Agency,
}

/// Immutable, append-only record of a single balance-affecting event.
/// Entries are never updated or deleted once written.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WalletLedgerEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub entry_type: LedgerEntryType,
    pub amount_cents: i64,
    pub source_type: LedgerSourceType,
    pub source_id: Option<String>,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_and_debit_signs() {
        assert_eq!(LedgerEntryType::Credit.signed_cents(2500), 2500);
        assert_eq!(LedgerEntryType::Debit.signed_cents(2500), -2500);
    }

    #[test]
    fn entry_type_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&LedgerEntryType::Credit).unwrap(),
            "\"CREDIT\""
        );
        assert_eq!(
            serde_json::to_string(&LedgerSourceType::AdSpend).unwrap(),
            "\"AD_SPEND\""
        );
    }
}
