use super::models::*;
use crate::error::{AppResult, LedgerError};
use crate::reconciliation::engine::WalletStore;
use crate::wallet::models::Wallet;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const WALLET_COLUMNS: &str =
    "id, owner_id, owner_type, currency, balance_cents, created_at, updated_at";
const ENTRY_COLUMNS: &str =
    "id, user_id, entry_type, amount_cents, source_type, source_id, currency, created_at";

/// Filters for the admin ledger search.
#[derive(Debug, Default)]
pub struct LedgerSearchFilter {
    pub user_id: Option<Uuid>,
    pub entry_type: Option<LedgerEntryType>,
    pub source_type: Option<LedgerSourceType>,
    pub source_id: Option<String>,
    pub limit: i64,
    pub cursor: Option<Uuid>,
}

/// Ledger repository - the ledger table is THE source of truth for balances
pub struct LedgerRepository {
    pub pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ========== POSTING ==========

    /// Record earnings for a user.
    pub async fn record_credit(
        &self,
        user_id: Uuid,
        amount_cents: i64,
        currency: Currency,
        source_type: LedgerSourceType,
        source_id: Option<String>,
    ) -> AppResult<WalletLedgerEntry> {
        self.record_entry(
            user_id,
            LedgerEntryType::Credit,
            amount_cents,
            currency,
            source_type,
            source_id,
        )
        .await
    }

    /// Record a payout or spend for a user.
    pub async fn record_debit(
        &self,
        user_id: Uuid,
        amount_cents: i64,
        currency: Currency,
        source_type: LedgerSourceType,
        source_id: Option<String>,
    ) -> AppResult<WalletLedgerEntry> {
        self.record_entry(
            user_id,
            LedgerEntryType::Debit,
            amount_cents,
            currency,
            source_type,
            source_id,
        )
        .await
    }

    /// Append a ledger entry and apply its effect to the cached wallet
    /// balance in a single transaction. The wallet is created on the owner's
    /// first balance-affecting event.
    async fn record_entry(
        &self,
        user_id: Uuid,
        entry_type: LedgerEntryType,
        amount_cents: i64,
        currency: Currency,
        source_type: LedgerSourceType,
        source_id: Option<String>,
    ) -> AppResult<WalletLedgerEntry> {
        if amount_cents <= 0 {
            return Err(LedgerError::NonPositiveAmount(amount_cents).into());
        }

        let mut tx = self.pool.begin().await?;

        let wallet =
            Self::get_or_create_wallet(&mut tx, user_id, OwnerType::User, currency).await?;

        let entry = sqlx::query_as::<_, WalletLedgerEntry>(&format!(
            r#"
            INSERT INTO wallet_ledger (user_id, entry_type, amount_cents, source_type, source_id, currency)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(entry_type)
        .bind(amount_cents)
        .bind(source_type)
        .bind(&source_id)
        .bind(currency)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE wallets
            SET balance_cents = balance_cents + $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(wallet.id)
        .bind(entry_type.signed_cents(amount_cents))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(entry)
    }

    async fn get_or_create_wallet(
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
        owner_type: OwnerType,
        currency: Currency,
    ) -> AppResult<Wallet> {
        let wallet = sqlx::query_as::<_, Wallet>(&format!(
            r#"
            INSERT INTO wallets (owner_id, owner_type, currency)
            VALUES ($1, $2, $3)
            ON CONFLICT (owner_id, owner_type) DO UPDATE SET updated_at = now()
            RETURNING {WALLET_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(owner_type)
        .bind(currency)
        .fetch_one(&mut **tx)
        .await?;

        Ok(wallet)
    }

    // ========== READS ==========

    /// Balance derived from the ledger alone: SUM(CREDIT) - SUM(DEBIT).
    /// Passing no currency aggregates across all of them, which is what the
    /// wallet cache tracks.
    pub async fn calculate_balance(
        &self,
        user_id: Uuid,
        currency: Option<Currency>,
    ) -> AppResult<i64> {
        let credit_sum = self
            .sum_for_user(user_id, LedgerEntryType::Credit, currency)
            .await?;
        let debit_sum = self
            .sum_for_user(user_id, LedgerEntryType::Debit, currency)
            .await?;
        Ok(credit_sum - debit_sum)
    }

    async fn sum_for_user(
        &self,
        user_id: Uuid,
        entry_type: LedgerEntryType,
        currency: Option<Currency>,
    ) -> AppResult<i64> {
        let sum = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)::BIGINT
            FROM wallet_ledger
            WHERE user_id = $1
              AND entry_type = $2
              AND ($3::currency_type IS NULL OR currency = $3)
            "#,
        )
        .bind(user_id)
        .bind(entry_type)
        .bind(currency)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum)
    }

    /// Recent ledger entries for a user, newest first.
    pub async fn entries_for_user(
        &self,
        user_id: Uuid,
        currency: Option<Currency>,
        limit: i64,
    ) -> AppResult<Vec<WalletLedgerEntry>> {
        let entries = sqlx::query_as::<_, WalletLedgerEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM wallet_ledger
            WHERE user_id = $1
              AND ($2::currency_type IS NULL OR currency = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#
        ))
        .bind(user_id)
        .bind(currency)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn get_entry(&self, id: Uuid) -> AppResult<WalletLedgerEntry> {
        let entry = sqlx::query_as::<_, WalletLedgerEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM wallet_ledger WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        entry.ok_or_else(|| LedgerError::EntryNotFound(id.to_string()).into())
    }

    /// Admin ledger search with keyset pagination on (created_at, id).
    pub async fn search(&self, filter: &LedgerSearchFilter) -> AppResult<Vec<WalletLedgerEntry>> {
        // Resolve the cursor entry first so pagination stays stable under
        // concurrent appends.
        let cursor_entry = match filter.cursor {
            Some(cursor_id) => Some(self.get_entry(cursor_id).await?),
            None => None,
        };
        let cursor_created = cursor_entry.as_ref().map(|e| e.created_at);
        let cursor_id = cursor_entry.as_ref().map(|e| e.id);

        let entries = sqlx::query_as::<_, WalletLedgerEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM wallet_ledger
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::ledger_entry_type IS NULL OR entry_type = $2)
              AND ($3::ledger_source_type IS NULL OR source_type = $3)
              AND ($4::text IS NULL OR source_id = $4)
              AND ($5::timestamptz IS NULL OR (created_at, id) < ($5, $6))
            ORDER BY created_at DESC, id DESC
            LIMIT $7
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.entry_type)
        .bind(filter.source_type)
        .bind(&filter.source_id)
        .bind(cursor_created)
        .bind(cursor_id)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

// Storage seam consumed by the reconciliation engine. Reconciliation works
// across currencies, exactly like the posting path's wallet cache does.
#[async_trait]
impl WalletStore for LedgerRepository {
    async fn owners_with_ledger_activity(&self) -> AppResult<Vec<Uuid>> {
        let owners = sqlx::query_scalar::<_, Uuid>(
            "SELECT DISTINCT user_id FROM wallet_ledger ORDER BY user_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(owners)
    }

    async fn ledger_sum_cents(
        &self,
        owner_id: Uuid,
        entry_type: LedgerEntryType,
    ) -> AppResult<i64> {
        self.sum_for_user(owner_id, entry_type, None).await
    }

    async fn wallet_for_owner(
        &self,
        owner_id: Uuid,
        owner_type: OwnerType,
    ) -> AppResult<Option<Wallet>> {
        let wallet = sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE owner_id = $1 AND owner_type = $2"
        ))
        .bind(owner_id)
        .bind(owner_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(wallet)
    }

    async fn replace_wallet_balance(
        &self,
        wallet_id: Uuid,
        observed_cents: i64,
        new_cents: i64,
    ) -> AppResult<bool> {
        // Compare-and-set guarded on the balance observed during the scan,
        // so a concurrent ledger post cannot be silently overwritten.
        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET balance_cents = $2, updated_at = now()
            WHERE id = $1 AND balance_cents = $3
            "#,
        )
        .bind(wallet_id)
        .bind(new_cents)
        .bind(observed_cents)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
