use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::matches::MatchStatus;
use super::trips::TripStatus;
use super::users::PaymentMethod;
use super::wallet::WalletTransaction;

/// Facts emitted by the matching and trip state machines.
///
/// The state machines never call the ledger or the dispatcher directly; they
/// return these and `RideService` routes them downstream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    MatchProposed {
        match_id: Uuid,
        driver_user_id: Uuid,
        passenger_user_id: Uuid,
        pickup: String,
        drop: String,
        passenger_count: u32,
        fare: Decimal,
    },
    MatchResolved {
        match_id: Uuid,
        driver_user_id: Uuid,
        passenger_user_id: Uuid,
        status: MatchStatus,
    },
    IntentFilled {
        intent_id: Uuid,
        driver_user_id: Uuid,
    },
    TripUpdated {
        trip_id: Uuid,
        driver_user_id: Uuid,
        passenger_user_id: Uuid,
        status: TripStatus,
    },
    FareCaptureRequested {
        trip_id: Uuid,
        passenger_user_id: Uuid,
        amount: Decimal,
    },
    FareSettlementRequested {
        trip_id: Uuid,
        passenger_user_id: Uuid,
        driver_user_id: Uuid,
        fare: Decimal,
        captured: Decimal,
        method: PaymentMethod,
    },
    RefundRequested {
        trip_id: Uuid,
        passenger_user_id: Uuid,
        amount: Decimal,
    },
    TripRated {
        trip_id: Uuid,
        driver_user_id: Uuid,
        passenger_name: String,
        stars: u8,
    },
    WalletTransactionResolved {
        owner_user_id: Uuid,
        transaction: WalletTransaction,
    },
}

impl DomainEvent {
    /// The trip held in `settling` while this event's money move is in flight.
    pub fn settling_trip(&self) -> Option<Uuid> {
        match self {
            DomainEvent::FareCaptureRequested { trip_id, .. }
            | DomainEvent::FareSettlementRequested { trip_id, .. }
            | DomainEvent::RefundRequested { trip_id, .. } => Some(*trip_id),
            _ => None,
        }
    }
}
