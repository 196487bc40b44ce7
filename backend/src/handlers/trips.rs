use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{AppState, CurrentSession};
use crate::error::RideError;
use crate::models::Trip;

#[derive(Debug, Deserialize)]
pub struct StartTripRequest {
    pub match_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdvanceTripRequest {
    /// Final distance; required on the step that completes the trip.
    #[serde(default)]
    pub distance_km: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CancelTripRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct RateTripRequest {
    pub stars: u8,
}

pub async fn start_trip(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(req): Json<StartTripRequest>,
) -> Result<(StatusCode, Json<Trip>), RideError> {
    let trip = service.start_trip(&session, req.match_id).await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

pub async fn list_trips(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Json<Vec<Trip>> {
    Json(service.trips(&session).await)
}

pub async fn get_trip(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<Trip>, RideError> {
    Ok(Json(service.trip(&session, trip_id).await?))
}

pub async fn advance_trip(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<AdvanceTripRequest>,
) -> Result<Json<Trip>, RideError> {
    Ok(Json(service.advance_trip(&session, trip_id, req.distance_km).await?))
}

pub async fn cancel_trip(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<CancelTripRequest>,
) -> Result<Json<Trip>, RideError> {
    Ok(Json(service.cancel_trip(&session, trip_id, &req.reason).await?))
}

pub async fn rate_trip(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<RateTripRequest>,
) -> Result<Json<Trip>, RideError> {
    Ok(Json(service.rate_trip(&session, trip_id, req.stars).await?))
}
