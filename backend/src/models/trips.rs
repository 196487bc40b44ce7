use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::intents::Place;
use super::users::PaymentMethod;
use crate::error::{Result, RideError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Started,
    InProgress,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
    Failed,
}

/// Snapshot of a participant, taken when the trip starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub user_id: Uuid,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub match_id: Uuid,
    pub status: TripStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub pickup: Place,
    pub dropoff: Place,
    pub driver: Party,
    pub passenger: Party,
    pub vehicle_model: String,
    pub vehicle_number: String,
    pub passenger_count: u32,
    pub payment_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    /// Amount already debited from the passenger's wallet for this trip.
    pub captured_amount: Decimal,
    pub total_distance_km: Option<f64>,
    pub cancel_reason: Option<String>,
    pub rating: Option<u8>,
    /// Set while a wallet settlement for this trip is in flight.
    #[serde(skip)]
    pub settling: bool,
}

impl Trip {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.driver.user_id == user_id || self.passenger.user_id == user_id
    }

    /// Applies a lifecycle move, keeping `end_time` in step with the status.
    pub fn transition(&mut self, to: TripStatus, at: DateTime<Utc>) -> Result<()> {
        let allowed = matches!(
            (self.status, to),
            (TripStatus::Started, TripStatus::InProgress)
                | (TripStatus::InProgress, TripStatus::Completed)
                | (TripStatus::Started, TripStatus::Cancelled)
                | (TripStatus::InProgress, TripStatus::Cancelled)
        );
        if !allowed {
            return Err(RideError::InvalidState(format!(
                "trip {} cannot move from {:?} to {:?}",
                self.id, self.status, to
            )));
        }
        self.status = to;
        if to.is_finished() {
            self.end_time = Some(at);
        }
        Ok(())
    }
}
