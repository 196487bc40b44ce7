use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{AppState, CurrentSession};
use crate::error::RideError;
use crate::models::{DriverIntent, MatchDecision, NewIntent, RideMatch, RideRequest};

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: MatchDecision,
}

pub async fn create_intent(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(req): Json<NewIntent>,
) -> Result<(StatusCode, Json<DriverIntent>), RideError> {
    let intent = service.create_intent(&session, req).await?;
    Ok((StatusCode::CREATED, Json(intent)))
}

pub async fn list_intents(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Json<Vec<DriverIntent>> {
    Json(service.list_intents(&session).await)
}

pub async fn cancel_intent(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(intent_id): Path<Uuid>,
) -> Result<Json<DriverIntent>, RideError> {
    Ok(Json(service.cancel_intent(&session, intent_id).await?))
}

/// Ranked candidates, best first. `409 no_capacity` when nothing fits.
pub async fn request_ride(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(req): Json<RideRequest>,
) -> Result<(StatusCode, Json<Vec<RideMatch>>), RideError> {
    let matches = service.request_ride(&session, req).await?;
    Ok((StatusCode::CREATED, Json(matches)))
}

pub async fn list_matches(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Json<Vec<RideMatch>> {
    Json(service.matches(&session).await)
}

pub async fn decide_match(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(match_id): Path<Uuid>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<RideMatch>, RideError> {
    Ok(Json(service.decide_match(&session, match_id, req.decision).await?))
}
