use crate::error::AppResult;
use crate::ledger::models::OwnerType;
use crate::wallet::models::Wallet;
use sqlx::PgPool;
use uuid::Uuid;

pub struct WalletRepository {
    pub pool: PgPool,
}

impl WalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_owner(
        &self,
        owner_id: Uuid,
        owner_type: OwnerType,
    ) -> AppResult<Option<Wallet>> {
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, owner_id, owner_type, currency, balance_cents, created_at, updated_at
            FROM wallets
            WHERE owner_id = $1 AND owner_type = $2
            "#,
        )
        .bind(owner_id)
        .bind(owner_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(wallet)
    }

    /// Admin listing, newest first.
    pub async fn list(&self, limit: i64) -> AppResult<Vec<Wallet>> {
        let wallets = sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, owner_id, owner_type, currency, balance_cents, created_at, updated_at
            FROM wallets
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(wallets)
    }
}
