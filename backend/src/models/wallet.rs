use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, RideError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Credit,
    Debit,
    Refund,
}

impl TransactionType {
    /// Amounts are stored unsigned; the type carries the sign.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            TransactionType::Credit | TransactionType::Refund => amount,
            TransactionType::Debit => -amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub description: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

/// A wallet is its ledger. There is no balance field to drift out of sync.
#[derive(Debug, Clone)]
pub struct Wallet {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    transactions: Vec<WalletTransaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSummary {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub currency: String,
    pub balance: Decimal,
    pub pending_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub credited: Decimal,
    pub debited: Decimal,
}

impl Wallet {
    pub fn open(owner_user_id: Uuid, currency: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_user_id,
            currency: currency.into(),
            created_at: at,
            transactions: Vec::new(),
        }
    }

    pub fn balance(&self) -> Decimal {
        self.transactions
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Completed)
            .map(|tx| tx.tx_type.signed(tx.amount))
            .sum()
    }

    pub fn transactions(&self) -> &[WalletTransaction] {
        &self.transactions
    }

    pub fn transaction(&self, tx_id: Uuid) -> Option<&WalletTransaction> {
        self.transactions.iter().find(|tx| tx.id == tx_id)
    }

    pub fn append_pending(
        &mut self,
        tx_type: TransactionType,
        amount: Decimal,
        description: impl Into<String>,
        at: DateTime<Utc>,
    ) -> WalletTransaction {
        let tx = WalletTransaction {
            id: Uuid::new_v4(),
            wallet_id: self.id,
            tx_type,
            amount,
            description: description.into(),
            status: TransactionStatus::Pending,
            created_at: at,
            resolved_at: None,
            failure_reason: None,
        };
        self.transactions.push(tx.clone());
        tx
    }

    /// Resolves a pending transaction. `rejection` carries the processor's
    /// reason when it declined; a debit the balance cannot cover fails too.
    pub fn resolve(
        &mut self,
        tx_id: Uuid,
        rejection: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<WalletTransaction> {
        let balance = self.balance();
        let tx = self
            .transactions
            .iter_mut()
            .find(|tx| tx.id == tx_id)
            .ok_or_else(|| RideError::not_found("wallet transaction", tx_id))?;

        if tx.status != TransactionStatus::Pending {
            return Err(RideError::InvalidState(format!(
                "transaction {} is already {:?}",
                tx.id, tx.status
            )));
        }

        let failure = rejection.or_else(|| {
            (tx.tx_type == TransactionType::Debit && balance < tx.amount)
                .then(|| format!("insufficient funds: balance {}, requested {}", balance, tx.amount))
        });

        match failure {
            Some(reason) => {
                tx.status = TransactionStatus::Failed;
                tx.failure_reason = Some(reason);
            }
            None => tx.status = TransactionStatus::Completed,
        }
        tx.resolved_at = Some(at);
        Ok(tx.clone())
    }

    pub fn pending_created_before(&self, cutoff: DateTime<Utc>) -> Vec<Uuid> {
        self.transactions
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Pending && tx.created_at <= cutoff)
            .map(|tx| tx.id)
            .collect()
    }

    pub fn summary(&self) -> WalletSummary {
        WalletSummary {
            id: self.id,
            owner_user_id: self.owner_user_id,
            currency: self.currency.clone(),
            balance: self.balance(),
            pending_count: self
                .transactions
                .iter()
                .filter(|tx| tx.status == TransactionStatus::Pending)
                .count(),
        }
    }

    /// Completed credits and debits in the calendar month containing `now`.
    /// Refunds are reported with credits.
    pub fn monthly_summary(&self, now: DateTime<Utc>) -> MonthlySummary {
        let in_month = |tx: &&WalletTransaction| {
            tx.status == TransactionStatus::Completed
                && tx.created_at.year() == now.year()
                && tx.created_at.month() == now.month()
        };
        let mut credited = Decimal::ZERO;
        let mut debited = Decimal::ZERO;
        for tx in self.transactions.iter().filter(in_month) {
            match tx.tx_type {
                TransactionType::Credit | TransactionType::Refund => credited += tx.amount,
                TransactionType::Debit => debited += tx.amount,
            }
        }
        MonthlySummary {
            year: now.year(),
            month: now.month(),
            credited,
            debited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn wallet_with(entries: &[(TransactionType, Decimal)]) -> Wallet {
        let at = Utc.with_ymd_and_hms(2025, 8, 17, 9, 0, 0).unwrap();
        let mut wallet = Wallet::open(Uuid::new_v4(), "INR", at);
        for (tx_type, amount) in entries {
            let tx = wallet.append_pending(*tx_type, *amount, "seed", at);
            wallet.resolve(tx.id, None, at).unwrap();
        }
        wallet
    }

    #[test]
    fn test_balance_is_fold_of_completed_rows() {
        let wallet = wallet_with(&[
            (TransactionType::Credit, dec!(500.00)),
            (TransactionType::Credit, dec!(220.00)),
            (TransactionType::Refund, dec!(150.00)),
            (TransactionType::Debit, dec!(280.50)),
        ]);
        assert_eq!(wallet.balance(), dec!(589.50));
    }

    #[test]
    fn test_pending_rows_do_not_count() {
        let mut wallet = wallet_with(&[(TransactionType::Credit, dec!(100))]);
        wallet.append_pending(TransactionType::Credit, dec!(50), "top up", Utc::now());
        assert_eq!(wallet.balance(), dec!(100));
        assert_eq!(wallet.summary().pending_count, 1);
    }

    #[test]
    fn test_overdraft_debit_fails_and_stays_in_ledger() {
        let mut wallet = wallet_with(&[(TransactionType::Credit, dec!(100))]);
        let tx = wallet.append_pending(TransactionType::Debit, dec!(100.01), "trip", Utc::now());
        let resolved = wallet.resolve(tx.id, None, Utc::now()).unwrap();
        assert_eq!(resolved.status, TransactionStatus::Failed);
        assert!(resolved.failure_reason.unwrap().contains("insufficient funds"));
        assert_eq!(wallet.balance(), dec!(100));
        assert_eq!(wallet.transactions().len(), 2);
    }

    #[test]
    fn test_completed_rows_are_immutable() {
        let mut wallet = wallet_with(&[(TransactionType::Credit, dec!(10))]);
        let id = wallet.transactions()[0].id;
        assert!(matches!(
            wallet.resolve(id, Some("late failure".into()), Utc::now()),
            Err(RideError::InvalidState(_))
        ));
        assert_eq!(wallet.transactions()[0].status, TransactionStatus::Completed);
    }

    #[test]
    fn test_monthly_summary_only_counts_current_month() {
        let mut wallet = wallet_with(&[(TransactionType::Credit, dec!(500))]);
        let september = Utc.with_ymd_and_hms(2025, 9, 2, 8, 0, 0).unwrap();
        let tx = wallet.append_pending(TransactionType::Debit, dec!(120), "trip", september);
        wallet.resolve(tx.id, None, september).unwrap();

        let summary = wallet.monthly_summary(september);
        assert_eq!(summary.month, 9);
        assert_eq!(summary.credited, Decimal::ZERO);
        assert_eq!(summary.debited, dec!(120));
    }
}
