use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A labelled point, e.g. "MG Road, Bangalore".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub label: String,
    #[serde(flatten)]
    pub point: GeoPoint,
}

impl Place {
    pub fn new(label: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            label: label.into(),
            point: GeoPoint::new(lat, lng),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    OneTime,
    Daily,
    Weekly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Active,
    Inactive,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverIntent {
    pub id: Uuid,
    pub driver_user_id: Uuid,
    pub start: Place,
    pub end: Place,
    pub start_time: DateTime<Utc>,
    pub available_seats: u32,
    pub recurrence: Recurrence,
    pub status: IntentStatus,
    pub created_at: DateTime<Utc>,
}

impl DriverIntent {
    /// Takes `seats` off the intent. Going to zero closes the intent.
    ///
    /// Returns false, leaving the intent untouched, when it cannot seat them.
    pub fn reserve_seats(&mut self, seats: u32) -> bool {
        if self.status != IntentStatus::Active || seats > self.available_seats {
            return false;
        }
        self.available_seats -= seats;
        if self.available_seats == 0 {
            self.status = IntentStatus::Inactive;
        }
        true
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIntent {
    pub start: Place,
    pub end: Place,
    pub start_time: DateTime<Utc>,
    pub seats: u32,
    #[serde(default = "default_recurrence")]
    pub recurrence: Recurrence,
}

fn default_recurrence() -> Recurrence {
    Recurrence::OneTime
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(seats: u32) -> DriverIntent {
        DriverIntent {
            id: Uuid::new_v4(),
            driver_user_id: Uuid::new_v4(),
            start: Place::new("MG Road, Bangalore", 12.9716, 77.5946),
            end: Place::new("Whitefield, Bangalore", 12.9698, 77.7499),
            start_time: Utc::now(),
            available_seats: seats,
            recurrence: Recurrence::OneTime,
            status: IntentStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_reserve_all_seats_closes_intent() {
        let mut intent = intent(2);
        assert!(intent.reserve_seats(2));
        assert_eq!(intent.available_seats, 0);
        assert_eq!(intent.status, IntentStatus::Inactive);
    }

    #[test]
    fn test_reserve_more_than_available_is_refused() {
        let mut intent = intent(1);
        assert!(!intent.reserve_seats(2));
        assert_eq!(intent.available_seats, 1);
        assert_eq!(intent.status, IntentStatus::Active);
    }

    #[test]
    fn test_place_flattens_coordinates() {
        let json = serde_json::to_value(Place::new("HSR Layout", 12.91, 77.64)).unwrap();
        assert_eq!(json["label"], "HSR Layout");
        assert_eq!(json["lat"], 12.91);
    }
}
