use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, RideError};
use crate::models::{
    DomainEvent, MatchStatus, Notification, NotificationStatus, NotificationType, Session,
    TransactionStatus, TransactionType, TripStatus,
};
use crate::store::Store;
use crate::utils::Clock;

#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn emit(&self, user_id: Uuid, kind: NotificationType, message: impl Into<String>) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id,
            kind,
            status: NotificationStatus::Unread,
            message: message.into(),
            created_at: self.clock.now(),
        };
        self.store
            .notifications
            .insert(notification.id, notification.clone())
            .await;
        debug!("Notified {}: {}", user_id, notification.message);
        notification
    }

    /// Emits the notifications an event implies.
    pub async fn publish(&self, event: &DomainEvent) -> Vec<Notification> {
        let mut sent = Vec::new();
        for (user_id, kind, message) in render(event) {
            sent.push(self.emit(user_id, kind, message).await);
        }
        sent
    }

    /// Newest first. Archived notifications are left out unless asked for.
    pub async fn list(&self, user_id: Uuid, include_archived: bool) -> Vec<Notification> {
        let mut list = self
            .store
            .notifications
            .select(|n| n.user_id == user_id && (include_archived || n.status != NotificationStatus::Archived))
            .await;
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        list
    }

    pub async fn unread_count(&self, user_id: Uuid) -> usize {
        self.store
            .notifications
            .select(|n| n.user_id == user_id && n.status == NotificationStatus::Unread)
            .await
            .len()
    }

    pub async fn mark_read(&self, session: &Session, id: Uuid) -> Result<Notification> {
        self.advance(session, id, NotificationStatus::Read).await
    }

    pub async fn archive(&self, session: &Session, id: Uuid) -> Result<Notification> {
        self.advance(session, id, NotificationStatus::Archived).await
    }

    /// Marks every unread notification of the user as read; returns how many changed.
    pub async fn mark_all_read(&self, user_id: Uuid) -> usize {
        let mut changed = 0;
        for row in self.store.notifications.handles().await {
            let mut notification = row.lock().await;
            if notification.user_id == user_id && notification.status == NotificationStatus::Unread {
                notification.status = NotificationStatus::Read;
                changed += 1;
            }
        }
        changed
    }

    async fn advance(&self, session: &Session, id: Uuid, to: NotificationStatus) -> Result<Notification> {
        let row = self
            .store
            .notifications
            .get(id)
            .await
            .ok_or_else(|| RideError::not_found("notification", id))?;
        let mut notification = row.lock().await;
        if notification.user_id != session.user_id {
            return Err(RideError::not_found("notification", id));
        }
        notification.advance_to(to)?;
        Ok(notification.clone())
    }
}

/// Recipients, type and text for each event. Every trip and match
/// transition reaches both parties exactly once.
fn render(event: &DomainEvent) -> Vec<(Uuid, NotificationType, String)> {
    match event {
        DomainEvent::MatchProposed {
            driver_user_id,
            pickup,
            drop,
            passenger_count,
            fare,
            ..
        } => vec![(
            *driver_user_id,
            NotificationType::RideRequest,
            format!(
                "New ride request: {} passenger(s) from {} to {}, fare ₹{}",
                passenger_count, pickup, drop, fare
            ),
        )],
        DomainEvent::MatchResolved {
            driver_user_id,
            passenger_user_id,
            status,
            ..
        } => {
            let message = match status {
                MatchStatus::Accepted => "Your ride match was accepted",
                MatchStatus::Rejected => "Your ride match was declined",
                MatchStatus::Expired => "Your ride match expired without a decision",
                MatchStatus::Pending => "Your ride match is pending",
            };
            both(*driver_user_id, *passenger_user_id, NotificationType::RideMatch, message)
        }
        DomainEvent::IntentFilled { driver_user_id, .. } => vec![(
            *driver_user_id,
            NotificationType::System,
            "All seats on your ride are booked".to_string(),
        )],
        DomainEvent::TripUpdated {
            driver_user_id,
            passenger_user_id,
            status,
            ..
        } => {
            let message = match status {
                TripStatus::Started => "Your trip has been created",
                TripStatus::InProgress => "Passenger picked up, trip in progress",
                TripStatus::Completed => "Trip completed",
                TripStatus::Cancelled => "Trip cancelled",
            };
            both(*driver_user_id, *passenger_user_id, NotificationType::TripUpdate, message)
        }
        DomainEvent::TripRated {
            driver_user_id,
            passenger_name,
            stars,
            ..
        } => vec![(
            *driver_user_id,
            NotificationType::Rating,
            format!("You received a {}-star rating from {}", stars, passenger_name),
        )],
        DomainEvent::WalletTransactionResolved {
            owner_user_id,
            transaction,
        } => {
            let verb = match transaction.tx_type {
                TransactionType::Credit => "credited",
                TransactionType::Debit => "debited",
                TransactionType::Refund => "refunded",
            };
            let message = match transaction.status {
                TransactionStatus::Completed => {
                    format!("₹{} {}: {}", transaction.amount, verb, transaction.description)
                }
                TransactionStatus::Failed => format!(
                    "Payment of ₹{} failed: {}",
                    transaction.amount,
                    transaction.failure_reason.as_deref().unwrap_or("unknown reason")
                ),
                TransactionStatus::Pending => format!("Payment of ₹{} is pending", transaction.amount),
            };
            vec![(*owner_user_id, NotificationType::Payment, message)]
        }
        DomainEvent::FareCaptureRequested { .. }
        | DomainEvent::FareSettlementRequested { .. }
        | DomainEvent::RefundRequested { .. } => Vec::new(),
    }
}

fn both(driver: Uuid, passenger: Uuid, kind: NotificationType, message: &str) -> Vec<(Uuid, NotificationType, String)> {
    vec![(driver, kind, message.to_string()), (passenger, kind, message.to_string())]
}
