use crate::error::{AppResult, ReconciliationError};
use crate::ledger::models::{LedgerEntryType, OwnerType};
use crate::wallet::models::Wallet;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Storage contract consumed by the reconciliation engine: two reads over
/// the ledger, one read and one conditional write over wallets.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Distinct owners with at least one ledger entry. Owners without any
    /// balance-affecting history cannot be inconsistent and are never
    /// enumerated.
    async fn owners_with_ledger_activity(&self) -> AppResult<Vec<Uuid>>;

    /// Sum of `amount_cents` over the owner's entries of one type. An empty
    /// set sums to zero.
    async fn ledger_sum_cents(
        &self,
        owner_id: Uuid,
        entry_type: LedgerEntryType,
    ) -> AppResult<i64>;

    async fn wallet_for_owner(
        &self,
        owner_id: Uuid,
        owner_type: OwnerType,
    ) -> AppResult<Option<Wallet>>;

    /// Overwrite the cached balance, guarded on the value observed during
    /// the scan. Returns false when the stored balance no longer equals
    /// `observed_cents`, i.e. a concurrent ledger post moved it.
    async fn replace_wallet_balance(
        &self,
        wallet_id: Uuid,
        observed_cents: i64,
        new_cents: i64,
    ) -> AppResult<bool>;
}

/// One wallet whose cached balance disagreed with its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MismatchDetail {
    pub user_id: Uuid,
    pub wallet_id: Uuid,
    pub current: i64,
    pub calculated: i64,
    pub diff: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationSummary {
    pub scanned: u64,
    pub mismatches: u64,
    pub fixed: u64,
    pub details: Vec<MismatchDetail>,
}

/// Recomputes every active wallet's balance from its immutable ledger and
/// repairs the cached value where it drifted. Repairs are idempotent: a
/// second pass with no intervening ledger writes finds zero mismatches.
pub struct ReconciliationEngine {
    store: Arc<dyn WalletStore>,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn WalletStore>) -> Self {
        Self { store }
    }

    /// Run one full reconciliation pass. Aborts on the first store error;
    /// repairs already applied stay committed and a rerun is a no-op for
    /// them.
    pub async fn reconcile_wallets(&self) -> AppResult<ReconciliationSummary> {
        info!("Starting wallet reconciliation");

        let owners = self.store.owners_with_ledger_activity().await?;
        let mut summary = ReconciliationSummary::default();

        for owner_id in owners {
            if let Err(err) = self.reconcile_owner(owner_id, &mut summary).await {
                return Err(ReconciliationError::Aborted {
                    scanned: summary.scanned,
                    message: err.to_string(),
                }
                .into());
            }
            summary.scanned += 1;
        }

        info!(
            scanned = summary.scanned,
            mismatches = summary.mismatches,
            fixed = summary.fixed,
            "Wallet reconciliation complete"
        );

        Ok(summary)
    }

    async fn reconcile_owner(
        &self,
        owner_id: Uuid,
        summary: &mut ReconciliationSummary,
    ) -> AppResult<()> {
        let credit_sum = self
            .store
            .ledger_sum_cents(owner_id, LedgerEntryType::Credit)
            .await?;
        let debit_sum = self
            .store
            .ledger_sum_cents(owner_id, LedgerEntryType::Debit)
            .await?;
        let calculated = credit_sum - debit_sum;

        if calculated < 0 {
            warn!(%owner_id, calculated, "Ledger sums to a negative balance");
        }

        let Some(wallet) = self
            .store
            .wallet_for_owner(owner_id, OwnerType::User)
            .await?
        else {
            // Owner has ledger history but no wallet row. Nothing to repair;
            // the log keeps the anomaly visible.
            warn!(%owner_id, "Owner has ledger activity but no wallet, skipping");
            return Ok(());
        };

        if wallet.balance_cents == calculated {
            return Ok(());
        }

        summary.mismatches += 1;
        summary.details.push(MismatchDetail {
            user_id: owner_id,
            wallet_id: wallet.id,
            current: wallet.balance_cents,
            calculated,
            diff: calculated - wallet.balance_cents,
        });

        let repaired = self
            .store
            .replace_wallet_balance(wallet.id, wallet.balance_cents, calculated)
            .await?;

        if repaired {
            info!(
                %owner_id,
                wallet_id = %wallet.id,
                current = wallet.balance_cents,
                calculated,
                "Repaired wallet balance"
            );
            summary.fixed += 1;
        } else {
            // A ledger post committed between our aggregate read and the
            // repair write. The next pass converges.
            warn!(
                %owner_id,
                wallet_id = %wallet.id,
                "Balance moved mid-repair, leaving wallet to the next pass"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::ledger::models::Currency;
    use chrono::Utc;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    struct MemoryStore {
        entries: RwLock<Vec<(Uuid, LedgerEntryType, i64)>>,
        wallets: RwLock<HashMap<Uuid, Wallet>>,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                entries: RwLock::new(Vec::new()),
                wallets: RwLock::new(HashMap::new()),
            }
        }

        async fn post(&self, user_id: Uuid, entry_type: LedgerEntryType, amount_cents: i64) {
            self.entries
                .write()
                .await
                .push((user_id, entry_type, amount_cents));
        }

        async fn put_wallet(&self, owner_id: Uuid, balance_cents: i64) -> Uuid {
            let wallet = Wallet {
                id: Uuid::new_v4(),
                owner_id,
                owner_type: OwnerType::User,
                currency: Currency::Usd,
                balance_cents,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            let id = wallet.id;
            self.wallets.write().await.insert(id, wallet);
            id
        }

        async fn balance_of(&self, wallet_id: Uuid) -> i64 {
            self.wallets.read().await[&wallet_id].balance_cents
        }
    }

    #[async_trait]
    impl WalletStore for MemoryStore {
        async fn owners_with_ledger_activity(&self) -> AppResult<Vec<Uuid>> {
            let entries = self.entries.read().await;
            let mut owners = Vec::new();
            for (user_id, _, _) in entries.iter() {
                if !owners.contains(user_id) {
                    owners.push(*user_id);
                }
            }
            Ok(owners)
        }

        async fn ledger_sum_cents(
            &self,
            owner_id: Uuid,
            entry_type: LedgerEntryType,
        ) -> AppResult<i64> {
            let entries = self.entries.read().await;
            Ok(entries
                .iter()
                .filter(|(user_id, t, _)| *user_id == owner_id && *t == entry_type)
                .map(|(_, _, amount)| amount)
                .sum())
        }

        async fn wallet_for_owner(
            &self,
            owner_id: Uuid,
            owner_type: OwnerType,
        ) -> AppResult<Option<Wallet>> {
            let wallets = self.wallets.read().await;
            Ok(wallets
                .values()
                .find(|w| w.owner_id == owner_id && w.owner_type == owner_type)
                .cloned())
        }

        async fn replace_wallet_balance(
            &self,
            wallet_id: Uuid,
            observed_cents: i64,
            new_cents: i64,
        ) -> AppResult<bool> {
            let mut wallets = self.wallets.write().await;
            let wallet = wallets
                .get_mut(&wallet_id)
                .ok_or_else(|| AppError::NotFound(format!("Wallet {}", wallet_id)))?;

            if wallet.balance_cents != observed_cents {
                return Ok(false);
            }
            wallet.balance_cents = new_cents;
            wallet.updated_at = Utc::now();
            Ok(true)
        }
    }

    /// Delegates to the inner store but refuses every balance write, as if a
    /// concurrent ledger post always won the race.
    struct ContendedStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl WalletStore for ContendedStore {
        async fn owners_with_ledger_activity(&self) -> AppResult<Vec<Uuid>> {
            self.inner.owners_with_ledger_activity().await
        }

        async fn ledger_sum_cents(
            &self,
            owner_id: Uuid,
            entry_type: LedgerEntryType,
        ) -> AppResult<i64> {
            self.inner.ledger_sum_cents(owner_id, entry_type).await
        }

        async fn wallet_for_owner(
            &self,
            owner_id: Uuid,
            owner_type: OwnerType,
        ) -> AppResult<Option<Wallet>> {
            self.inner.wallet_for_owner(owner_id, owner_type).await
        }

        async fn replace_wallet_balance(
            &self,
            _wallet_id: Uuid,
            _observed_cents: i64,
            _new_cents: i64,
        ) -> AppResult<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn repairs_a_drifted_balance() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        store.post(user, LedgerEntryType::Credit, 10000).await;
        store.post(user, LedgerEntryType::Debit, 2000).await;
        store.post(user, LedgerEntryType::Credit, 500).await;
        let wallet_id = store.put_wallet(user, 8000).await;

        let engine = ReconciliationEngine::new(store.clone());
        let summary = engine.reconcile_wallets().await.unwrap();

        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.mismatches, 1);
        assert_eq!(summary.fixed, 1);
        assert_eq!(
            summary.details,
            vec![MismatchDetail {
                user_id: user,
                wallet_id,
                current: 8000,
                calculated: 8500,
                diff: 500,
            }]
        );
        assert_eq!(store.balance_of(wallet_id).await, 8500);
    }

    #[tokio::test]
    async fn consistent_wallet_is_left_alone() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        store.post(user, LedgerEntryType::Credit, 100).await;
        let wallet_id = store.put_wallet(user, 100).await;

        let engine = ReconciliationEngine::new(store.clone());
        let summary = engine.reconcile_wallets().await.unwrap();

        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.mismatches, 0);
        assert_eq!(summary.fixed, 0);
        assert!(summary.details.is_empty());
        assert_eq!(store.balance_of(wallet_id).await, 100);
    }

    #[tokio::test]
    async fn owner_without_ledger_history_is_never_scanned() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        // A wallet with an arbitrary balance but zero entries.
        let wallet_id = store.put_wallet(user, 424242).await;

        let engine = ReconciliationEngine::new(store.clone());
        let summary = engine.reconcile_wallets().await.unwrap();

        assert_eq!(summary.scanned, 0);
        assert_eq!(summary.mismatches, 0);
        assert_eq!(store.balance_of(wallet_id).await, 424242);
    }

    #[tokio::test]
    async fn owner_with_history_but_no_wallet_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        store.post(user, LedgerEntryType::Credit, 700).await;

        let engine = ReconciliationEngine::new(store.clone());
        let summary = engine.reconcile_wallets().await.unwrap();

        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.mismatches, 0);
        assert_eq!(summary.fixed, 0);
    }

    #[tokio::test]
    async fn fifty_owners_three_drifted() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..50 {
            let user = Uuid::new_v4();
            store.post(user, LedgerEntryType::Credit, 1000).await;
            // Every 17th wallet drifted by 250 cents.
            let balance = if i % 17 == 0 { 750 } else { 1000 };
            store.put_wallet(user, balance).await;
        }

        let engine = ReconciliationEngine::new(store.clone());
        let summary = engine.reconcile_wallets().await.unwrap();

        assert_eq!(summary.scanned, 50);
        assert_eq!(summary.mismatches, 3);
        assert_eq!(summary.fixed, 3);
        assert_eq!(summary.details.len(), 3);
        for detail in &summary.details {
            assert_eq!(detail.current, 750);
            assert_eq!(detail.calculated, 1000);
            assert_eq!(detail.diff, 250);
        }
    }

    #[tokio::test]
    async fn second_pass_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..5 {
            let user = Uuid::new_v4();
            store.post(user, LedgerEntryType::Credit, 3000).await;
            store.post(user, LedgerEntryType::Debit, 1200).await;
            store.put_wallet(user, 999).await;
        }

        let engine = ReconciliationEngine::new(store.clone());
        let first = engine.reconcile_wallets().await.unwrap();
        assert_eq!(first.mismatches, 5);
        assert_eq!(first.fixed, 5);

        let second = engine.reconcile_wallets().await.unwrap();
        assert_eq!(second.scanned, 5);
        assert_eq!(second.mismatches, 0);
        assert_eq!(second.fixed, 0);
        assert!(second.details.is_empty());
    }

    #[tokio::test]
    async fn negative_calculated_balance_is_written_back() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        store.post(user, LedgerEntryType::Credit, 100).await;
        store.post(user, LedgerEntryType::Debit, 300).await;
        let wallet_id = store.put_wallet(user, 0).await;

        let engine = ReconciliationEngine::new(store.clone());
        let summary = engine.reconcile_wallets().await.unwrap();

        assert_eq!(summary.mismatches, 1);
        assert_eq!(summary.details[0].calculated, -200);
        assert_eq!(store.balance_of(wallet_id).await, -200);
    }

    #[tokio::test]
    async fn contended_repair_counts_mismatch_but_not_fixed() {
        let inner = MemoryStore::new();
        let user = Uuid::new_v4();
        inner.post(user, LedgerEntryType::Credit, 500).await;
        let wallet_id = inner.put_wallet(user, 100).await;
        let store = Arc::new(ContendedStore { inner });

        let engine = ReconciliationEngine::new(store.clone());
        let summary = engine.reconcile_wallets().await.unwrap();

        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.mismatches, 1);
        assert_eq!(summary.fixed, 0);
        assert_eq!(store.inner.balance_of(wallet_id).await, 100);
    }

    #[tokio::test]
    async fn summary_serializes_with_camel_case_detail_keys() {
        let detail = MismatchDetail {
            user_id: Uuid::nil(),
            wallet_id: Uuid::nil(),
            current: 8000,
            calculated: 8500,
            diff: 500,
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("walletId").is_some());
        assert_eq!(json["current"], 8000);
        assert_eq!(json["calculated"], 8500);
        assert_eq!(json["diff"], 500);
    }
}
