use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Driver,
    Passenger,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Active,
    Inactive,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vehicle_model: String,
    pub vehicle_number: String,
    pub license_number: String,
    pub license_expiry: DateTime<Utc>,
    pub rating: f64,
    pub rating_count: u32,
    pub total_trips: u32,
    pub status: DriverStatus,
    /// Earnings are credited to the driver's wallet rather than paid out externally.
    pub wallet_payout: bool,
}

impl DriverProfile {
    pub fn license_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.license_expiry > at
    }

    /// Folds a new star rating into the running average.
    pub fn record_rating(&mut self, stars: u8) {
        let total = self.rating * f64::from(self.rating_count) + f64::from(stars);
        self.rating_count += 1;
        self.rating = total / f64::from(self.rating_count);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Wallet,
    Card,
    Cash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassengerProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub preferred_payment: PaymentMethod,
}

/// One identity with optional driver and passenger capabilities.
///
/// Switching role only changes `user.role`; neither profile is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub user: User,
    pub driver: Option<DriverProfile>,
    pub passenger: Option<PassengerProfile>,
    pub wallet_id: Uuid,
}

impl Account {
    pub fn session(&self) -> Session {
        Session {
            user_id: self.user.id,
            role: self.user.role,
        }
    }
}

/// The acting user of an operation, passed explicitly instead of read from
/// ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default = "default_payment")]
    pub preferred_payment: PaymentMethod,
}

fn default_payment() -> PaymentMethod {
    PaymentMethod::Wallet
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDriverProfile {
    pub vehicle_model: String,
    pub vehicle_number: String,
    pub license_number: String,
    pub license_expiry: DateTime<Utc>,
    #[serde(default)]
    pub wallet_payout: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> DriverProfile {
        DriverProfile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            vehicle_model: "Toyota Innova".into(),
            vehicle_number: "KA05AB1234".into(),
            license_number: "DL-2025-XYZ123".into(),
            license_expiry: Utc::now(),
            rating: 4.0,
            rating_count: 1,
            total_trips: 0,
            status: DriverStatus::Active,
            wallet_payout: true,
        }
    }

    #[test]
    fn test_record_rating_running_average() {
        let mut driver = profile();
        driver.record_rating(5);
        assert_eq!(driver.rating_count, 2);
        assert!((driver.rating - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_role_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Passenger).unwrap(), "\"passenger\"");
    }
}
