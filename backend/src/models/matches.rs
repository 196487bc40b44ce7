use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::intents::Place;
use crate::error::{Result, RideError};

/// A passenger's ask for a ride.
#[derive(Debug, Clone, Deserialize)]
pub struct RideRequest {
    pub pickup: Place,
    pub drop: Place,
    pub requested_time: DateTime<Utc>,
    /// Signed so that zero and negative counts reach validation instead of
    /// failing deserialization.
    pub passenger_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

impl MatchStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, MatchStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchDecision {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideMatch {
    pub id: Uuid,
    /// Shared by every candidate produced for the same ride request.
    pub request_id: Uuid,
    pub intent_id: Uuid,
    pub driver_user_id: Uuid,
    pub passenger_user_id: Uuid,
    pub status: MatchStatus,
    pub pickup: Place,
    pub drop: Place,
    pub passenger_count: u32,
    pub requested_time: DateTime<Utc>,
    pub distance_km: f64,
    pub detour_km: f64,
    pub estimated_fare: Decimal,
    pub driver_name: String,
    pub vehicle_model: String,
    pub vehicle_number: String,
    pub driver_rating: f64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl RideMatch {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == MatchStatus::Pending && now >= self.expires_at
    }

    /// Moves a pending match into a terminal status.
    pub fn transition(&mut self, to: MatchStatus, at: DateTime<Utc>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(RideError::InvalidState(format!(
                "match {} is already {:?}",
                self.id, self.status
            )));
        }
        if to == MatchStatus::Pending {
            return Err(RideError::InvalidState(format!(
                "match {} cannot return to pending",
                self.id
            )));
        }
        self.status = to;
        self.decided_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pending_match() -> RideMatch {
        let now = Utc::now();
        RideMatch {
            id: Uuid::new_v4(),
            request_id: Uuid::new_v4(),
            intent_id: Uuid::new_v4(),
            driver_user_id: Uuid::new_v4(),
            passenger_user_id: Uuid::new_v4(),
            status: MatchStatus::Pending,
            pickup: Place::new("Indiranagar, Bangalore", 12.9784, 77.6408),
            drop: Place::new("Whitefield, Bangalore", 12.9698, 77.7499),
            passenger_count: 2,
            requested_time: now,
            distance_km: 11.8,
            detour_km: 0.4,
            estimated_fare: dec!(250.50),
            driver_name: "John Doe".into(),
            vehicle_model: "Toyota Innova".into(),
            vehicle_number: "KA05AB1234".into(),
            driver_rating: 4.8,
            created_at: now,
            expires_at: now,
            decided_at: None,
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [MatchStatus::Accepted, MatchStatus::Rejected, MatchStatus::Expired] {
            let mut m = pending_match();
            m.transition(terminal, Utc::now()).unwrap();
            for next in [MatchStatus::Accepted, MatchStatus::Rejected, MatchStatus::Expired] {
                assert!(matches!(
                    m.transition(next, Utc::now()),
                    Err(RideError::InvalidState(_))
                ));
            }
            assert_eq!(m.status, terminal);
        }
    }

    #[test]
    fn test_cannot_transition_to_pending() {
        let mut m = pending_match();
        assert!(m.transition(MatchStatus::Pending, Utc::now()).is_err());
        assert!(m.decided_at.is_none());
    }
}
