use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverStats {
    pub total_trips: u32,
    pub completed_trips: u32,
    pub cancelled_trips: u32,
    pub total_earnings: Decimal,
    pub average_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassengerStats {
    pub total_trips: u32,
    pub total_spent: Decimal,
    pub total_rides_this_month: u32,
    pub total_spent_this_month: Decimal,
}
