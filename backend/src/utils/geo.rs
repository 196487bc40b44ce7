use crate::constants::EARTH_RADIUS_KM;
use crate::models::GeoPoint;

/// Great-circle distance between two points.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Extra distance a driver covers going start -> pickup -> drop -> end
/// instead of start -> end.
pub fn detour_km(start: GeoPoint, end: GeoPoint, pickup: GeoPoint, drop: GeoPoint) -> f64 {
    let via = haversine_km(start, pickup) + haversine_km(pickup, drop) + haversine_km(drop, end);
    (via - haversine_km(start, end)).max(0.0)
}

/// The passenger travels the same way as the driver: pickup comes before drop.
pub fn preserves_direction(start: GeoPoint, pickup: GeoPoint, drop: GeoPoint) -> bool {
    haversine_km(start, pickup) <= haversine_km(start, drop)
}
