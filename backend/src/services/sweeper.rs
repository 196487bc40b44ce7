use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info};

use super::wallet::SettlementPolicy;
use super::RideService;

/// What one sweep changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub expired_matches: usize,
    pub settled_transactions: usize,
    pub failed_transactions: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.expired_matches == 0 && self.settled_transactions == 0 && self.failed_transactions == 0
    }
}

/// Expires overdue matches, times out stuck wallet rows and, under the
/// deferred policy, settles whatever is still pending.
pub async fn sweep_once(service: &RideService) -> SweepReport {
    let expired = service.matching.expire_overdue().await;
    let stale = service.ledger.fail_stale().await;
    let settled = match service.ledger.policy() {
        SettlementPolicy::Deferred => service.ledger.settle_pending().await,
        SettlementPolicy::Immediate => Vec::new(),
    };

    let report = SweepReport {
        expired_matches: expired.len(),
        settled_transactions: settled.len(),
        failed_transactions: stale.len(),
    };
    service.dispatch(expired).await;
    service.dispatch(stale).await;
    service.dispatch(settled).await;
    report
}

pub fn spawn_expiry_sweeper(service: Arc<RideService>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        let mut iter_count: usize = 0;
        info!("🧹 Expiry sweeper running every {:?}", every);

        loop {
            interval.tick().await;
            iter_count += 1;

            let report = sweep_once(&service).await;
            if report.is_empty() {
                debug!("Sweep {} found nothing to do", iter_count);
            } else {
                info!(
                    "🧹 Sweep {} | expired matches: {} | settled: {} | timed out: {}",
                    iter_count, report.expired_matches, report.settled_transactions, report.failed_transactions
                );
            }
        }
    })
}
