use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use super::AppState;
use crate::constants::SESSION_USER_HEADER;
use crate::error::RideError;
use crate::models::Session;

/// The acting user, resolved from the `x-user-id` header.
///
/// Authentication is done upstream; this only turns the authenticated id
/// into a `Session` carrying the user's current role.
#[derive(Debug, Clone, Copy)]
pub struct CurrentSession(pub Session);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = RideError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(SESSION_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| RideError::Forbidden(format!("missing {} header", SESSION_USER_HEADER)))?;
        let user_id = Uuid::parse_str(raw.trim())
            .map_err(|_| RideError::InvalidRequest(format!("{} is not a valid user id", SESSION_USER_HEADER)))?;

        match state.session(user_id).await {
            Ok(session) => Ok(CurrentSession(session)),
            Err(RideError::NotFound { .. }) => Err(RideError::Forbidden(format!("unknown user {}", user_id))),
            Err(e) => Err(e),
        }
    }
}

/// Rejects operations on another user's profile.
pub(crate) fn ensure_self(session: &Session, user_id: Uuid) -> Result<(), RideError> {
    if session.user_id != user_id {
        return Err(RideError::Forbidden("cannot modify another user's profile".into()));
    }
    Ok(())
}
