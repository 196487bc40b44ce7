pub mod identity;
pub mod intents;
pub mod matching;
pub mod notifications;
pub mod pricing;
pub mod stats;
pub mod sweeper;
pub mod trips;
pub mod wallet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::{Result, RideError};
use crate::models::{
    Account, DomainEvent, DriverIntent, DriverStats, DriverStatus, MatchDecision, MonthlySummary,
    NewDriverProfile, NewIntent, NewUser, Notification, NotificationType, PassengerStats,
    PaymentMethod, PaymentStatus, RideMatch, RideRequest, Role, Session, TransactionStatus,
    TransactionType, Trip, TripStatus, WalletSummary, WalletTransaction,
};
use crate::store::Store;
use crate::utils::{Clock, Config, SystemClock};

use identity::IdentityStore;
use intents::IntentRegistry;
use matching::MatchingEngine;
use notifications::NotificationDispatcher;
use stats::StatsReader;
use sweeper::SweepReport;
use trips::TripManager;
use wallet::{InstantProcessor, PaymentProcessor, WalletLedger};

/// The operation surface of the core.
///
/// Every call takes the acting `Session` explicitly. Events returned by the
/// state machines are routed here, in order, to the ledger, the identity
/// store and the notification dispatcher before the call returns.
pub struct RideService {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    pub(crate) identity: IdentityStore,
    pub(crate) intents: IntentRegistry,
    pub(crate) matching: MatchingEngine,
    pub(crate) trips: TripManager,
    pub(crate) ledger: WalletLedger,
    pub(crate) notifications: NotificationDispatcher,
    stats: StatsReader,
}

impl RideService {
    pub fn new(config: &Config, clock: Arc<dyn Clock>, processor: Arc<dyn PaymentProcessor>) -> Self {
        let store = Arc::new(Store::new());
        Self {
            identity: IdentityStore::new(store.clone(), clock.clone(), config.currency.clone()),
            intents: IntentRegistry::new(store.clone(), clock.clone()),
            matching: MatchingEngine::new(
                store.clone(),
                clock.clone(),
                config.matching.clone(),
                config.fares.clone(),
            ),
            trips: TripManager::new(
                store.clone(),
                clock.clone(),
                config.fares.clone(),
                config.lifecycle.clone(),
            ),
            ledger: WalletLedger::new(store.clone(), clock.clone(), processor, config.ledger.clone()),
            notifications: NotificationDispatcher::new(store.clone(), clock.clone()),
            stats: StatsReader::new(store.clone(), clock.clone()),
            store,
            clock,
        }
    }

    /// Wall clock and a processor that approves everything.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config, Arc::new(SystemClock), Arc::new(InstantProcessor))
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ==================== IDENTITY ====================

    pub async fn register_user(&self, new: NewUser) -> Result<Account> {
        let account = self.identity.register_user(new).await?;
        self.notifications
            .emit(
                account.user.id,
                NotificationType::System,
                format!("Welcome, {}! Your wallet is ready.", account.user.name),
            )
            .await;
        Ok(account)
    }

    /// Resolves the acting user. Authentication itself happens upstream.
    pub async fn session(&self, user_id: Uuid) -> Result<Session> {
        self.identity.open_session(user_id).await
    }

    pub async fn account(&self, session: &Session) -> Result<Account> {
        self.identity.account(session.user_id).await
    }

    pub async fn attach_driver_profile(&self, session: &Session, new: NewDriverProfile) -> Result<Account> {
        self.identity.attach_driver_profile(session.user_id, new).await
    }

    pub async fn attach_passenger_profile(&self, session: &Session, preferred: PaymentMethod) -> Result<Account> {
        self.identity.attach_passenger_profile(session.user_id, preferred).await
    }

    pub async fn switch_role(&self, session: &Session, role: Role) -> Result<Account> {
        self.identity.switch_role(session.user_id, role).await
    }

    pub async fn set_driver_status(&self, session: &Session, status: DriverStatus) -> Result<Account> {
        self.identity.set_driver_status(session.user_id, status).await
    }

    // ==================== INTENTS ====================

    pub async fn create_intent(&self, session: &Session, new: NewIntent) -> Result<DriverIntent> {
        self.intents.create_intent(session, new).await
    }

    pub async fn cancel_intent(&self, session: &Session, intent_id: Uuid) -> Result<DriverIntent> {
        self.intents.cancel_intent(session, intent_id).await
    }

    pub async fn list_intents(&self, session: &Session) -> Vec<DriverIntent> {
        self.intents.list_for_driver(session.user_id).await
    }

    // ==================== MATCHING ====================

    pub async fn request_ride(&self, session: &Session, request: RideRequest) -> Result<Vec<RideMatch>> {
        let (matches, events) = self.matching.request_ride(session, request).await?;
        self.dispatch(events).await;
        Ok(matches)
    }

    pub async fn decide_match(&self, session: &Session, match_id: Uuid, decision: MatchDecision) -> Result<RideMatch> {
        let (decided, events) = self.matching.decide(session, match_id, decision).await?;
        self.dispatch(events).await;
        Ok(decided)
    }

    pub async fn ride_match(&self, session: &Session, match_id: Uuid) -> Result<RideMatch> {
        let ride_match = self.matching.ride_match(match_id).await?;
        if session.user_id != ride_match.driver_user_id && session.user_id != ride_match.passenger_user_id {
            return Err(RideError::not_found("match", match_id));
        }
        Ok(ride_match)
    }

    pub async fn matches(&self, session: &Session) -> Vec<RideMatch> {
        self.matching.matches_for_user(session.user_id).await
    }

    // ==================== TRIPS ====================

    pub async fn start_trip(&self, session: &Session, match_id: Uuid) -> Result<Trip> {
        let (trip, events) = self.trips.start_trip(session, match_id).await?;
        self.dispatch(events).await;
        Ok(trip)
    }

    /// `distance_km` is required when the step completes the trip.
    pub async fn advance_trip(&self, session: &Session, trip_id: Uuid, distance_km: Option<f64>) -> Result<Trip> {
        let (_, events) = self.trips.advance(session, trip_id, distance_km).await?;
        self.dispatch(events).await;
        self.trips.trip(session, trip_id).await
    }

    pub async fn cancel_trip(&self, session: &Session, trip_id: Uuid, reason: &str) -> Result<Trip> {
        let (_, events) = self.trips.cancel(session, trip_id, reason).await?;
        self.dispatch(events).await;
        self.trips.trip(session, trip_id).await
    }

    pub async fn rate_trip(&self, session: &Session, trip_id: Uuid, stars: u8) -> Result<Trip> {
        let (trip, events) = self.trips.rate(session, trip_id, stars).await?;
        self.dispatch(events).await;
        Ok(trip)
    }

    pub async fn trip(&self, session: &Session, trip_id: Uuid) -> Result<Trip> {
        self.trips.trip(session, trip_id).await
    }

    pub async fn trips(&self, session: &Session) -> Vec<Trip> {
        self.trips.trips_for_user(session.user_id).await
    }

    // ==================== WALLET ====================

    pub async fn wallet_apply(
        &self,
        session: &Session,
        wallet_id: Uuid,
        tx_type: TransactionType,
        amount: Decimal,
        description: &str,
    ) -> Result<WalletTransaction> {
        self.owned_wallet(session, wallet_id).await?;
        let (tx, events) = self.ledger.apply(wallet_id, tx_type, amount, description).await?;
        self.dispatch(events).await;
        Ok(tx)
    }

    pub async fn wallet(&self, session: &Session, wallet_id: Uuid) -> Result<WalletSummary> {
        self.owned_wallet(session, wallet_id).await?;
        self.ledger.summary(wallet_id).await
    }

    pub async fn wallet_transactions(&self, session: &Session, wallet_id: Uuid) -> Result<Vec<WalletTransaction>> {
        self.owned_wallet(session, wallet_id).await?;
        self.ledger.transactions(wallet_id).await
    }

    pub async fn monthly_summary(&self, session: &Session, wallet_id: Uuid) -> Result<MonthlySummary> {
        self.owned_wallet(session, wallet_id).await?;
        self.ledger.monthly_summary(wallet_id).await
    }

    async fn owned_wallet(&self, session: &Session, wallet_id: Uuid) -> Result<()> {
        if self.ledger.owner_of(wallet_id).await? != session.user_id {
            return Err(RideError::Forbidden("wallet belongs to another user".into()));
        }
        Ok(())
    }

    // ==================== NOTIFICATIONS ====================

    pub async fn list_notifications(&self, session: &Session, include_archived: bool) -> Vec<Notification> {
        self.notifications.list(session.user_id, include_archived).await
    }

    pub async fn mark_read(&self, session: &Session, notification_id: Uuid) -> Result<Notification> {
        self.notifications.mark_read(session, notification_id).await
    }

    pub async fn mark_all_read(&self, session: &Session) -> usize {
        self.notifications.mark_all_read(session.user_id).await
    }

    pub async fn archive_notification(&self, session: &Session, notification_id: Uuid) -> Result<Notification> {
        self.notifications.archive(session, notification_id).await
    }

    pub async fn unread_count(&self, session: &Session) -> usize {
        self.notifications.unread_count(session.user_id).await
    }

    // ==================== STATS ====================

    pub async fn driver_stats(&self, session: &Session) -> Result<DriverStats> {
        self.stats.driver_stats(session.user_id).await
    }

    pub async fn passenger_stats(&self, session: &Session) -> Result<PassengerStats> {
        self.stats.passenger_stats(session.user_id).await
    }

    // ==================== TIMEOUTS ====================

    pub async fn sweep(&self) -> SweepReport {
        sweeper::sweep_once(self).await
    }

    // ==================== EVENT ROUTING ====================

    /// Delivers events in order. Follow-up events from the ledger are
    /// queued behind the ones already pending.
    pub(crate) async fn dispatch(&self, events: Vec<DomainEvent>) {
        let mut queue = VecDeque::from(events);
        while let Some(event) = queue.pop_front() {
            self.notifications.publish(&event).await;
            match self.react(&event).await {
                Ok(follow_ups) => queue.extend(follow_ups),
                Err(e) => {
                    error!("Failed to handle {:?}: {}", event, e);
                    if let Some(trip_id) = event.settling_trip() {
                        if let Err(e) = self.trips.abandon_settlement(trip_id).await {
                            error!("Could not release trip {}: {}", trip_id, e);
                        }
                    }
                }
            }
        }
    }

    async fn react(&self, event: &DomainEvent) -> Result<Vec<DomainEvent>> {
        match event {
            DomainEvent::FareCaptureRequested {
                trip_id,
                passenger_user_id,
                amount,
            } => {
                let description = format!("Fare captured at pickup for trip {}", trip_id);
                let (tx, events) = self
                    .move_money(*passenger_user_id, TransactionType::Debit, *amount, &description)
                    .await;
                let captured = tx.filter(|tx| tx.status == TransactionStatus::Completed).map(|tx| tx.amount);
                self.trips.finish_capture(*trip_id, captured).await?;
                Ok(events)
            }
            DomainEvent::FareSettlementRequested {
                trip_id,
                passenger_user_id,
                driver_user_id,
                fare,
                captured,
                method,
            } => {
                self.settle_fare(*trip_id, *passenger_user_id, *driver_user_id, *fare, *captured, *method)
                    .await
            }
            DomainEvent::RefundRequested {
                trip_id,
                passenger_user_id,
                amount,
            } => {
                let description = format!("Refund for cancelled trip {}", trip_id);
                let (tx, events) = self
                    .move_money(*passenger_user_id, TransactionType::Refund, *amount, &description)
                    .await;
                let refunded = tx.is_some_and(|tx| tx.status == TransactionStatus::Completed);
                self.trips.finish_refund(*trip_id, refunded).await?;
                Ok(events)
            }
            DomainEvent::TripUpdated {
                driver_user_id,
                status: TripStatus::Completed,
                ..
            } => {
                self.identity.record_completed_trip(*driver_user_id).await?;
                Ok(Vec::new())
            }
            DomainEvent::TripRated {
                driver_user_id, stars, ..
            } => {
                self.identity.record_rating(*driver_user_id, *stars).await?;
                Ok(Vec::new())
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Collects the final fare from the passenger, net of anything captured
    /// at pickup, then pays the driver out to their wallet if they opted in.
    async fn settle_fare(
        &self,
        trip_id: Uuid,
        passenger_user_id: Uuid,
        driver_user_id: Uuid,
        fare: Decimal,
        captured: Decimal,
        method: PaymentMethod,
    ) -> Result<Vec<DomainEvent>> {
        let mut events = Vec::new();
        let (status, captured) = match method {
            PaymentMethod::Card | PaymentMethod::Cash => (PaymentStatus::Paid, captured),
            PaymentMethod::Wallet if fare > captured => {
                let description = format!("Trip payment for trip {}", trip_id);
                let (tx, moved) = self
                    .move_money(passenger_user_id, TransactionType::Debit, fare - captured, &description)
                    .await;
                events.extend(moved);
                match tx {
                    Some(tx) if tx.status == TransactionStatus::Completed => (PaymentStatus::Paid, fare),
                    _ => (PaymentStatus::Failed, captured),
                }
            }
            PaymentMethod::Wallet if fare < captured => {
                let description = format!("Fare adjustment for trip {}", trip_id);
                let (tx, moved) = self
                    .move_money(passenger_user_id, TransactionType::Refund, captured - fare, &description)
                    .await;
                events.extend(moved);
                match tx {
                    Some(tx) if tx.status == TransactionStatus::Completed => (PaymentStatus::Paid, fare),
                    _ => (PaymentStatus::Paid, captured),
                }
            }
            PaymentMethod::Wallet => (PaymentStatus::Paid, captured),
        };
        self.trips.finish_settlement(trip_id, status, captured).await?;

        if status == PaymentStatus::Paid && method != PaymentMethod::Cash {
            let driver = self.identity.account(driver_user_id).await?;
            if driver.driver.as_ref().is_some_and(|d| d.wallet_payout) {
                let description = format!("Trip earning for trip {}", trip_id);
                let (_, moved) = self
                    .move_money(driver_user_id, TransactionType::Credit, fare, &description)
                    .await;
                events.extend(moved);
            }
        }
        Ok(events)
    }

    /// Applies a system-initiated ledger move immediately. Failures are
    /// logged and reported as `None`; the failed row stays in the ledger.
    async fn move_money(
        &self,
        user_id: Uuid,
        tx_type: TransactionType,
        amount: Decimal,
        description: &str,
    ) -> (Option<WalletTransaction>, Vec<DomainEvent>) {
        let outcome = async {
            let wallet_id = self.identity.account(user_id).await?.wallet_id;
            self.ledger.apply_now(wallet_id, tx_type, amount, description).await
        }
        .await;
        match outcome {
            Ok((tx, events)) => (Some(tx), events),
            Err(e) => {
                warn!("Could not {:?} {} for user {}: {}", tx_type, amount, user_id, e);
                (None, Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Place, Recurrence};
    use crate::utils::ManualClock;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    async fn completed_trip(service: &RideService, start: DateTime<Utc>) -> (Session, Trip) {
        let john = service
            .register_user(NewUser {
                name: "John Doe".into(),
                email: "john@example.com".into(),
                phone: "+919876543210".into(),
                preferred_payment: PaymentMethod::Wallet,
            })
            .await
            .unwrap();
        service
            .attach_driver_profile(
                &john.session(),
                NewDriverProfile {
                    vehicle_model: "Toyota Innova".into(),
                    vehicle_number: "KA05AB1234".into(),
                    license_number: "DL-2025-XYZ123".into(),
                    license_expiry: start + Duration::days(365),
                    wallet_payout: true,
                },
            )
            .await
            .unwrap();
        let driver = service.switch_role(&john.session(), Role::Driver).await.unwrap().session();
        service
            .create_intent(
                &driver,
                NewIntent {
                    start: Place::new("MG Road, Bangalore", 12.9716, 77.5946),
                    end: Place::new("Whitefield, Bangalore", 12.9698, 77.7499),
                    start_time: start + Duration::hours(2),
                    seats: 3,
                    recurrence: Recurrence::OneTime,
                },
            )
            .await
            .unwrap();

        let lisa = service
            .register_user(NewUser {
                name: "Lisa Chen".into(),
                email: "lisa@example.com".into(),
                phone: "+919876543213".into(),
                preferred_payment: PaymentMethod::Card,
            })
            .await
            .unwrap();
        let candidate = service
            .request_ride(
                &lisa.session(),
                RideRequest {
                    pickup: Place::new("Indiranagar, Bangalore", 12.9784, 77.6408),
                    drop: Place::new("Whitefield, Bangalore", 12.9698, 77.7499),
                    requested_time: start + Duration::minutes(135),
                    passenger_count: 1,
                },
            )
            .await
            .unwrap()
            .remove(0);
        service
            .decide_match(&driver, candidate.id, MatchDecision::Accept)
            .await
            .unwrap();
        let trip = service.start_trip(&driver, candidate.id).await.unwrap();

        // Drive the state machine directly so the settlement event is not routed.
        service.trips.advance(&driver, trip.id, None).await.unwrap();
        let (trip, _) = service.trips.advance(&driver, trip.id, Some(15.0)).await.unwrap();
        assert!(trip.settling);
        (driver, trip)
    }

    #[tokio::test]
    async fn test_failed_settlement_handler_releases_trip() {
        let start = Utc.with_ymd_and_hms(2025, 8, 20, 8, 0, 0).unwrap();
        let service = RideService::new(
            &Config::default(),
            Arc::new(ManualClock::new(start)),
            Arc::new(InstantProcessor),
        );
        let (driver, trip) = completed_trip(&service, start).await;

        service
            .dispatch(vec![DomainEvent::FareSettlementRequested {
                trip_id: trip.id,
                passenger_user_id: trip.passenger.user_id,
                driver_user_id: Uuid::new_v4(),
                fare: dec!(220.00),
                captured: Decimal::ZERO,
                method: PaymentMethod::Card,
            }])
            .await;

        let trip = service.trip(&driver, trip.id).await.unwrap();
        assert!(!trip.settling);
    }

    #[tokio::test]
    async fn test_handler_for_missing_trip_is_logged_and_skipped() {
        let start = Utc.with_ymd_and_hms(2025, 8, 20, 8, 0, 0).unwrap();
        let service = RideService::new(
            &Config::default(),
            Arc::new(ManualClock::new(start)),
            Arc::new(InstantProcessor),
        );
        let (driver, trip) = completed_trip(&service, start).await;

        service
            .dispatch(vec![
                DomainEvent::RefundRequested {
                    trip_id: Uuid::new_v4(),
                    passenger_user_id: trip.passenger.user_id,
                    amount: dec!(10.00),
                },
                DomainEvent::FareSettlementRequested {
                    trip_id: trip.id,
                    passenger_user_id: trip.passenger.user_id,
                    driver_user_id: driver.user_id,
                    fare: trip.payment_amount,
                    captured: Decimal::ZERO,
                    method: PaymentMethod::Card,
                },
            ])
            .await;

        let trip = service.trip(&driver, trip.id).await.unwrap();
        assert!(!trip.settling);
        assert_eq!(trip.payment_status, PaymentStatus::Paid);
    }
}
