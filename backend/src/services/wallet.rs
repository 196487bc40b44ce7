use async_trait::async_trait;
use chrono::Duration;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::constants::WALLET_PENDING_TIMEOUT_SECS;
use crate::error::{Result, RideError};
use crate::models::{
    DomainEvent, MonthlySummary, TransactionStatus, TransactionType, WalletSummary,
    WalletTransaction,
};
use crate::store::Store;
use crate::utils::Clock;

/// Decides whether money actually moves for a transaction.
///
/// Called with no wallet lock held; it may take as long as it needs.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// `Err` carries the reason the processor declined.
    async fn authorize(&self, tx: &WalletTransaction) -> std::result::Result<(), String>;
}

/// Approves everything. Funds checks still happen at commit.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantProcessor;

#[async_trait]
impl PaymentProcessor for InstantProcessor {
    async fn authorize(&self, _tx: &WalletTransaction) -> std::result::Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementPolicy {
    /// Resolve inside `apply`.
    Immediate,
    /// Leave rows pending for a later `settle` or the timeout sweep.
    Deferred,
}

impl FromStr for SettlementPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "immediate" | "sync" => Ok(SettlementPolicy::Immediate),
            "deferred" | "async" => Ok(SettlementPolicy::Deferred),
            other => Err(format!("unknown settlement policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub policy: SettlementPolicy,
    pub pending_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            policy: SettlementPolicy::Immediate,
            pending_timeout: Duration::seconds(WALLET_PENDING_TIMEOUT_SECS),
        }
    }
}

#[derive(Clone)]
pub struct WalletLedger {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    processor: Arc<dyn PaymentProcessor>,
    config: LedgerConfig,
}

impl WalletLedger {
    pub fn new(
        store: Arc<Store>,
        clock: Arc<dyn Clock>,
        processor: Arc<dyn PaymentProcessor>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store,
            clock,
            processor,
            config,
        }
    }

    /// Appends a transaction under the configured settlement policy.
    pub async fn apply(
        &self,
        wallet_id: Uuid,
        tx_type: TransactionType,
        amount: Decimal,
        description: &str,
    ) -> Result<(WalletTransaction, Vec<DomainEvent>)> {
        self.apply_with(wallet_id, tx_type, amount, description, self.config.policy)
            .await
    }

    /// Appends and resolves in one call, whatever the configured policy.
    pub async fn apply_now(
        &self,
        wallet_id: Uuid,
        tx_type: TransactionType,
        amount: Decimal,
        description: &str,
    ) -> Result<(WalletTransaction, Vec<DomainEvent>)> {
        self.apply_with(wallet_id, tx_type, amount, description, SettlementPolicy::Immediate)
            .await
    }

    async fn apply_with(
        &self,
        wallet_id: Uuid,
        tx_type: TransactionType,
        amount: Decimal,
        description: &str,
        policy: SettlementPolicy,
    ) -> Result<(WalletTransaction, Vec<DomainEvent>)> {
        validate_amount(amount)?;
        let row = self
            .store
            .wallets
            .get(wallet_id)
            .await
            .ok_or_else(|| RideError::not_found("wallet", wallet_id))?;

        let pending = {
            let mut wallet = row.lock().await;
            wallet.append_pending(tx_type, amount, description.trim(), self.clock.now())
        };

        match policy {
            SettlementPolicy::Immediate => self.settle(wallet_id, pending.id).await,
            SettlementPolicy::Deferred => Ok((pending, Vec::new())),
        }
    }

    /// Runs a pending transaction past the processor and commits the outcome.
    pub async fn settle(&self, wallet_id: Uuid, tx_id: Uuid) -> Result<(WalletTransaction, Vec<DomainEvent>)> {
        let row = self
            .store
            .wallets
            .get(wallet_id)
            .await
            .ok_or_else(|| RideError::not_found("wallet", wallet_id))?;

        let pending = {
            let wallet = row.lock().await;
            wallet
                .transaction(tx_id)
                .cloned()
                .ok_or_else(|| RideError::not_found("wallet transaction", tx_id))?
        };
        if pending.status != TransactionStatus::Pending {
            return Err(RideError::InvalidState(format!(
                "transaction {} is already {:?}",
                tx_id, pending.status
            )));
        }

        let rejection = self.processor.authorize(&pending).await.err();

        let mut wallet = row.lock().await;
        let resolved = wallet.resolve(tx_id, rejection, self.clock.now())?;
        match resolved.status {
            TransactionStatus::Completed => info!(
                "Wallet {} {:?} {} completed, balance {}",
                wallet_id,
                resolved.tx_type,
                resolved.amount,
                wallet.balance()
            ),
            _ => warn!(
                "Wallet {} {:?} {} failed: {}",
                wallet_id,
                resolved.tx_type,
                resolved.amount,
                resolved.failure_reason.as_deref().unwrap_or("unknown")
            ),
        }
        let event = DomainEvent::WalletTransactionResolved {
            owner_user_id: wallet.owner_user_id,
            transaction: resolved.clone(),
        };
        Ok((resolved, vec![event]))
    }

    /// Fails every transaction left pending past the configured timeout.
    pub async fn fail_stale(&self) -> Vec<DomainEvent> {
        let now = self.clock.now();
        let cutoff = now - self.config.pending_timeout;
        let mut events = Vec::new();
        for row in self.store.wallets.handles().await {
            let mut wallet = row.lock().await;
            for tx_id in wallet.pending_created_before(cutoff) {
                match wallet.resolve(tx_id, Some("timed out while pending".into()), now) {
                    Ok(tx) => {
                        warn!("Wallet transaction {} timed out", tx.id);
                        events.push(DomainEvent::WalletTransactionResolved {
                            owner_user_id: wallet.owner_user_id,
                            transaction: tx,
                        });
                    }
                    Err(e) => warn!("Could not time out transaction {}: {}", tx_id, e),
                }
            }
        }
        events
    }

    /// Settles everything still pending, oldest first. Used by the sweeper
    /// under the deferred policy.
    pub async fn settle_pending(&self) -> Vec<DomainEvent> {
        let mut queued = Vec::new();
        for wallet in self.store.wallets.select(|_| true).await {
            for tx in wallet.transactions() {
                if tx.status == TransactionStatus::Pending {
                    queued.push((tx.created_at, wallet.id, tx.id));
                }
            }
        }
        queued.sort();

        let mut events = Vec::new();
        for (_, wallet_id, tx_id) in queued {
            match self.settle(wallet_id, tx_id).await {
                Ok((_, resolved)) => events.extend(resolved),
                // Resolved concurrently by another caller.
                Err(RideError::InvalidState(_)) => {}
                Err(e) => warn!("Could not settle transaction {}: {}", tx_id, e),
            }
        }
        events
    }

    pub fn policy(&self) -> SettlementPolicy {
        self.config.policy
    }

    pub async fn owner_of(&self, wallet_id: Uuid) -> Result<Uuid> {
        let row = self
            .store
            .wallets
            .get(wallet_id)
            .await
            .ok_or_else(|| RideError::not_found("wallet", wallet_id))?;
        let owner = row.lock().await.owner_user_id;
        Ok(owner)
    }

    pub async fn summary(&self, wallet_id: Uuid) -> Result<WalletSummary> {
        self.store
            .wallets
            .snapshot(wallet_id)
            .await
            .map(|wallet| wallet.summary())
            .ok_or_else(|| RideError::not_found("wallet", wallet_id))
    }

    /// Ledger rows, newest first.
    pub async fn transactions(&self, wallet_id: Uuid) -> Result<Vec<WalletTransaction>> {
        let wallet = self
            .store
            .wallets
            .snapshot(wallet_id)
            .await
            .ok_or_else(|| RideError::not_found("wallet", wallet_id))?;
        let mut rows = wallet.transactions().to_vec();
        rows.reverse();
        Ok(rows)
    }

    pub async fn monthly_summary(&self, wallet_id: Uuid) -> Result<MonthlySummary> {
        let wallet = self
            .store
            .wallets
            .snapshot(wallet_id)
            .await
            .ok_or_else(|| RideError::not_found("wallet", wallet_id))?;
        Ok(wallet.monthly_summary(self.clock.now()))
    }
}

fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(RideError::InvalidAmount(format!("amount must be positive, got {}", amount)));
    }
    if amount.normalize().scale() > 2 {
        return Err(RideError::InvalidAmount(format!("amount {} has more than two decimal places", amount)));
    }
    Ok(())
}
