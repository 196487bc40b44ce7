use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::pricing::FareSchedule;
use crate::constants::{MAX_RATING_STARS, MIN_RATING_STARS};
use crate::error::{Result, RideError};
use crate::models::{
    Account, DomainEvent, MatchStatus, Party, PaymentMethod, PaymentStatus, Session, Trip, TripStatus,
};
use crate::store::Store;
use crate::utils::Clock;

#[derive(Debug, Clone, Default)]
pub struct LifecycleConfig {
    /// Debit the estimated fare when the passenger is picked up.
    pub capture_at_pickup: bool,
}

/// Owns trips from acceptance to completion or cancellation.
///
/// Payment moves are requested through events; the caller reports their
/// outcome back with the `finish_*` methods, which also clear `settling`.
#[derive(Clone)]
pub struct TripManager {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    fares: FareSchedule,
    config: LifecycleConfig,
}

impl TripManager {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>, fares: FareSchedule, config: LifecycleConfig) -> Self {
        Self {
            store,
            clock,
            fares,
            config,
        }
    }

    pub async fn start_trip(&self, session: &Session, match_id: Uuid) -> Result<(Trip, Vec<DomainEvent>)> {
        let ride_match = self
            .store
            .matches
            .snapshot(match_id)
            .await
            .ok_or_else(|| RideError::not_found("match", match_id))?;
        if session.user_id != ride_match.driver_user_id && session.user_id != ride_match.passenger_user_id {
            return Err(RideError::Forbidden("not a party to this match".into()));
        }
        if ride_match.status != MatchStatus::Accepted {
            return Err(RideError::InvalidState(format!(
                "match {} is {:?}, only accepted matches start trips",
                match_id, ride_match.status
            )));
        }

        let trip_id = Uuid::new_v4();
        if !self.store.claim_trip_slot(match_id, trip_id).await {
            return Err(RideError::InvalidState(format!("match {} already has a trip", match_id)));
        }

        let parties = async {
            let driver = self.party_account(ride_match.driver_user_id).await?;
            let passenger = self.party_account(ride_match.passenger_user_id).await?;
            Ok::<_, RideError>((driver, passenger))
        }
        .await;
        let (driver, passenger) = match parties {
            Ok(parties) => parties,
            Err(e) => {
                self.store.release_trip_slot(match_id).await;
                return Err(e);
            }
        };

        let payment_method = passenger
            .passenger
            .as_ref()
            .map(|p| p.preferred_payment)
            .unwrap_or(PaymentMethod::Wallet);

        let trip = Trip {
            id: trip_id,
            match_id,
            status: TripStatus::Started,
            start_time: self.clock.now(),
            end_time: None,
            pickup: ride_match.pickup.clone(),
            dropoff: ride_match.drop.clone(),
            driver: party(&driver),
            passenger: party(&passenger),
            vehicle_model: ride_match.vehicle_model.clone(),
            vehicle_number: ride_match.vehicle_number.clone(),
            passenger_count: ride_match.passenger_count,
            payment_amount: ride_match.estimated_fare,
            payment_method,
            payment_status: PaymentStatus::Pending,
            captured_amount: Decimal::ZERO,
            total_distance_km: None,
            cancel_reason: None,
            rating: None,
            settling: false,
        };
        self.store.trips.insert(trip.id, trip.clone()).await;

        info!(
            "Trip {} started for match {} ({} -> {})",
            trip.id, match_id, trip.pickup.label, trip.dropoff.label
        );
        let events = vec![updated_event(&trip)];
        Ok((trip, events))
    }

    /// Driver confirms pickup, or drop-off with the final distance.
    pub async fn advance(
        &self,
        session: &Session,
        trip_id: Uuid,
        distance_km: Option<f64>,
    ) -> Result<(Trip, Vec<DomainEvent>)> {
        let row = self.row(trip_id).await?;
        let mut trip = row.lock().await;
        if trip.driver.user_id != session.user_id {
            return Err(RideError::Forbidden("only the driver advances a trip".into()));
        }
        if trip.settling {
            return Err(RideError::InvalidState(format!("trip {} is settling a payment", trip_id)));
        }

        let now = self.clock.now();
        let mut follow_up = None;
        match trip.status {
            TripStatus::Started => {
                trip.transition(TripStatus::InProgress, now)?;
                if self.config.capture_at_pickup && trip.payment_method == PaymentMethod::Wallet {
                    trip.settling = true;
                    follow_up = Some(DomainEvent::FareCaptureRequested {
                        trip_id,
                        passenger_user_id: trip.passenger.user_id,
                        amount: trip.payment_amount,
                    });
                }
            }
            TripStatus::InProgress => {
                let distance = distance_km
                    .filter(|km| km.is_finite() && *km > 0.0)
                    .ok_or_else(|| {
                        RideError::InvalidRequest("completing a trip requires a positive final distance".into())
                    })?;
                let fare = self.fares.fare(distance, trip.passenger_count)?;
                trip.transition(TripStatus::Completed, now)?;
                trip.total_distance_km = Some(distance);
                trip.payment_amount = fare;
                trip.settling = true;
                follow_up = Some(DomainEvent::FareSettlementRequested {
                    trip_id,
                    passenger_user_id: trip.passenger.user_id,
                    driver_user_id: trip.driver.user_id,
                    fare,
                    captured: trip.captured_amount,
                    method: trip.payment_method,
                });
            }
            // Finished trips fail inside the transition.
            TripStatus::Completed | TripStatus::Cancelled => trip.transition(TripStatus::Completed, now)?,
        }

        info!("Trip {} is now {:?}", trip_id, trip.status);
        let mut events = vec![updated_event(&trip)];
        events.extend(follow_up);
        Ok((trip.clone(), events))
    }

    /// Either party may cancel between lifecycle steps, never mid-settlement.
    pub async fn cancel(&self, session: &Session, trip_id: Uuid, reason: &str) -> Result<(Trip, Vec<DomainEvent>)> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(RideError::InvalidRequest("a cancellation reason is required".into()));
        }
        let row = self.row(trip_id).await?;
        let mut trip = row.lock().await;
        if !trip.involves(session.user_id) {
            return Err(RideError::Forbidden("not a party to this trip".into()));
        }
        if trip.settling {
            return Err(RideError::InvalidState(format!("trip {} is settling a payment", trip_id)));
        }

        trip.transition(TripStatus::Cancelled, self.clock.now())?;
        trip.cancel_reason = Some(reason.to_string());

        let mut events = vec![updated_event(&trip)];
        if trip.captured_amount > Decimal::ZERO {
            trip.settling = true;
            events.push(DomainEvent::RefundRequested {
                trip_id,
                passenger_user_id: trip.passenger.user_id,
                amount: trip.captured_amount,
            });
        }
        info!("Trip {} cancelled by {}: {}", trip_id, session.user_id, reason);
        Ok((trip.clone(), events))
    }

    /// Passenger rates a completed trip, once.
    pub async fn rate(&self, session: &Session, trip_id: Uuid, stars: u8) -> Result<(Trip, Vec<DomainEvent>)> {
        if !(MIN_RATING_STARS..=MAX_RATING_STARS).contains(&stars) {
            return Err(RideError::InvalidRequest(format!(
                "rating must be between {} and {} stars",
                MIN_RATING_STARS, MAX_RATING_STARS
            )));
        }
        let row = self.row(trip_id).await?;
        let mut trip = row.lock().await;
        if trip.passenger.user_id != session.user_id {
            return Err(RideError::Forbidden("only the passenger rates a trip".into()));
        }
        if trip.status != TripStatus::Completed {
            return Err(RideError::InvalidState(format!("trip {} is not completed", trip_id)));
        }
        if trip.rating.is_some() {
            return Err(RideError::InvalidState(format!("trip {} is already rated", trip_id)));
        }
        trip.rating = Some(stars);

        let event = DomainEvent::TripRated {
            trip_id,
            driver_user_id: trip.driver.user_id,
            passenger_name: trip.passenger.name.clone(),
            stars,
        };
        Ok((trip.clone(), vec![event]))
    }

    /// Records the outcome of a pickup capture. `None` means nothing was taken.
    pub async fn finish_capture(&self, trip_id: Uuid, captured: Option<Decimal>) -> Result<Trip> {
        self.finish(trip_id, |trip| {
            if let Some(amount) = captured {
                trip.captured_amount += amount;
            }
        })
        .await
    }

    /// Records the outcome of fare settlement at completion.
    pub async fn finish_settlement(&self, trip_id: Uuid, status: PaymentStatus, captured: Decimal) -> Result<Trip> {
        self.finish(trip_id, |trip| {
            trip.payment_status = status;
            trip.captured_amount = captured;
        })
        .await
    }

    /// Records the outcome of a cancellation refund.
    pub async fn finish_refund(&self, trip_id: Uuid, refunded: bool) -> Result<Trip> {
        self.finish(trip_id, |trip| {
            if refunded {
                trip.payment_status = PaymentStatus::Refunded;
                trip.captured_amount = Decimal::ZERO;
            } else {
                warn!("Refund for trip {} did not complete", trip.id);
            }
        })
        .await
    }

    /// Clears `settling` without recording an outcome. Used when the money
    /// move behind it could not be handled.
    pub async fn abandon_settlement(&self, trip_id: Uuid) -> Result<Trip> {
        self.finish(trip_id, |trip| {
            if trip.settling {
                warn!("Settlement for trip {} abandoned", trip.id);
            }
        })
        .await
    }

    pub async fn trip(&self, session: &Session, trip_id: Uuid) -> Result<Trip> {
        let trip = self
            .store
            .trips
            .snapshot(trip_id)
            .await
            .ok_or_else(|| RideError::not_found("trip", trip_id))?;
        if !trip.involves(session.user_id) {
            return Err(RideError::not_found("trip", trip_id));
        }
        Ok(trip)
    }

    /// Trips the user took part in under either role, newest first.
    pub async fn trips_for_user(&self, user_id: Uuid) -> Vec<Trip> {
        let mut trips = self.store.trips.select(|trip| trip.involves(user_id)).await;
        trips.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        trips
    }

    async fn finish<F>(&self, trip_id: Uuid, apply: F) -> Result<Trip>
    where
        F: FnOnce(&mut Trip),
    {
        let row = self.row(trip_id).await?;
        let mut trip = row.lock().await;
        apply(&mut trip);
        trip.settling = false;
        Ok(trip.clone())
    }

    async fn row(&self, trip_id: Uuid) -> Result<Arc<tokio::sync::Mutex<Trip>>> {
        self.store
            .trips
            .get(trip_id)
            .await
            .ok_or_else(|| RideError::not_found("trip", trip_id))
    }

    async fn party_account(&self, user_id: Uuid) -> Result<Account> {
        self.store
            .accounts
            .snapshot(user_id)
            .await
            .ok_or_else(|| RideError::not_found("user", user_id))
    }
}

fn party(account: &Account) -> Party {
    Party {
        user_id: account.user.id,
        name: account.user.name.clone(),
        phone: account.user.phone.clone(),
    }
}

fn updated_event(trip: &Trip) -> DomainEvent {
    DomainEvent::TripUpdated {
        trip_id: trip.id,
        driver_user_id: trip.driver.user_id,
        passenger_user_id: trip.passenger.user_id,
        status: trip.status,
    }
}
