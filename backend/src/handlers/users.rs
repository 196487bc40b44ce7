use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::ensure_self;
use super::{AppState, CurrentSession};
use crate::error::RideError;
use crate::models::{
    Account, DriverStats, DriverStatus, NewDriverProfile, NewUser, PassengerStats, PaymentMethod, Role,
};

#[derive(Debug, Deserialize)]
pub struct PassengerProfileRequest {
    pub preferred_payment: PaymentMethod,
}

#[derive(Debug, Deserialize)]
pub struct DriverStatusRequest {
    pub status: DriverStatus,
}

#[derive(Debug, Deserialize)]
pub struct SwitchRoleRequest {
    pub role: Role,
}

/// Stats for whichever role the user is currently acting in.
#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum StatsResponse {
    Driver(DriverStats),
    Passenger(PassengerStats),
}

pub async fn register(
    State(service): State<AppState>,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<Account>), RideError> {
    let account = service.register_user(req).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn me(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Account>, RideError> {
    Ok(Json(service.account(&session).await?))
}

pub async fn attach_driver(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(user_id): Path<Uuid>,
    Json(req): Json<NewDriverProfile>,
) -> Result<Json<Account>, RideError> {
    ensure_self(&session, user_id)?;
    Ok(Json(service.attach_driver_profile(&session, req).await?))
}

pub async fn set_driver_status(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(user_id): Path<Uuid>,
    Json(req): Json<DriverStatusRequest>,
) -> Result<Json<Account>, RideError> {
    ensure_self(&session, user_id)?;
    Ok(Json(service.set_driver_status(&session, req.status).await?))
}

pub async fn attach_passenger(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(user_id): Path<Uuid>,
    Json(req): Json<PassengerProfileRequest>,
) -> Result<Json<Account>, RideError> {
    ensure_self(&session, user_id)?;
    Ok(Json(service.attach_passenger_profile(&session, req.preferred_payment).await?))
}

pub async fn switch_role(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SwitchRoleRequest>,
) -> Result<Json<Account>, RideError> {
    ensure_self(&session, user_id)?;
    Ok(Json(service.switch_role(&session, req.role).await?))
}

pub async fn stats(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<StatsResponse>, RideError> {
    let stats = match session.role {
        Role::Driver => StatsResponse::Driver(service.driver_stats(&session).await?),
        Role::Passenger => StatsResponse::Passenger(service.passenger_stats(&session).await?),
    };
    Ok(Json(stats))
}
