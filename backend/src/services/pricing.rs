use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::constants::{DEFAULT_FARE_BASE, DEFAULT_FARE_PER_KM};
use crate::error::{Result, RideError};

/// Fare = (base + per_km * distance) per passenger, rounded half away from
/// zero to two places. Distance is rounded to two places first, so equal
/// inputs always price identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FareSchedule {
    pub base: Decimal,
    pub per_km: Decimal,
}

impl Default for FareSchedule {
    fn default() -> Self {
        Self {
            base: Decimal::from_str(DEFAULT_FARE_BASE).unwrap_or(Decimal::ZERO),
            per_km: Decimal::from_str(DEFAULT_FARE_PER_KM).unwrap_or(Decimal::ZERO),
        }
    }
}

impl FareSchedule {
    pub fn fare(&self, distance_km: f64, passengers: u32) -> Result<Decimal> {
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(RideError::InvalidRequest(format!("invalid distance {}", distance_km)));
        }
        let km = Decimal::from_f64_retain(distance_km)
            .ok_or_else(|| RideError::Internal(format!("distance {} not representable", distance_km)))?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        let per_passenger = self.base + self.per_km * km;
        Ok((per_passenger * Decimal::from(passengers))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }
}
