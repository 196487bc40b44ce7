use chrono::Datelike;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Result, RideError};
use crate::models::{DriverStats, PassengerStats, PaymentStatus, Trip, TripStatus};
use crate::store::Store;
use crate::utils::Clock;

/// Dashboard figures derived from trips. Nothing here is stored.
#[derive(Clone)]
pub struct StatsReader {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
}

impl StatsReader {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn driver_stats(&self, user_id: Uuid) -> Result<DriverStats> {
        let account = self
            .store
            .accounts
            .snapshot(user_id)
            .await
            .ok_or_else(|| RideError::not_found("user", user_id))?;
        let driver = account
            .driver
            .ok_or_else(|| RideError::InvalidState(format!("user {} is not a driver", user_id)))?;

        let trips = self.store.trips.select(|trip| trip.driver.user_id == user_id).await;
        let count = |status: TripStatus| trips.iter().filter(|trip| trip.status == status).count() as u32;
        let total_earnings = trips
            .iter()
            .filter(|trip| is_paid(trip))
            .map(|trip| trip.payment_amount)
            .sum::<Decimal>();

        Ok(DriverStats {
            total_trips: trips.len() as u32,
            completed_trips: count(TripStatus::Completed),
            cancelled_trips: count(TripStatus::Cancelled),
            total_earnings,
            average_rating: driver.rating,
        })
    }

    pub async fn passenger_stats(&self, user_id: Uuid) -> Result<PassengerStats> {
        if !self.store.accounts.contains(user_id).await {
            return Err(RideError::not_found("user", user_id));
        }
        let now = self.clock.now();
        let trips = self
            .store
            .trips
            .select(|trip| trip.passenger.user_id == user_id && trip.status == TripStatus::Completed)
            .await;
        let this_month = |trip: &&Trip| {
            let at = trip.end_time.unwrap_or(trip.start_time);
            at.year() == now.year() && at.month() == now.month()
        };

        Ok(PassengerStats {
            total_trips: trips.len() as u32,
            total_spent: trips.iter().filter(|t| is_paid(t)).map(|t| t.payment_amount).sum(),
            total_rides_this_month: trips.iter().filter(this_month).count() as u32,
            total_spent_this_month: trips
                .iter()
                .filter(this_month)
                .filter(|t| is_paid(t))
                .map(|t| t.payment_amount)
                .sum(),
        })
    }
}

fn is_paid(trip: &Trip) -> bool {
    trip.status == TripStatus::Completed && trip.payment_status == PaymentStatus::Paid
}
