use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RideError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No capacity: {0}")]
    NoCapacity(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RideError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        RideError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable name, used as the `error` field of responses.
    pub fn kind(&self) -> &'static str {
        match self {
            RideError::InvalidRequest(_) => "invalid_request",
            RideError::NoCapacity(_) => "no_capacity",
            RideError::InvalidState(_) => "invalid_state",
            RideError::InvalidAmount(_) => "invalid_amount",
            RideError::NotFound { .. } => "not_found",
            RideError::Forbidden(_) => "forbidden",
            RideError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for RideError {
    fn into_response(self) -> Response {
        let status = match &self {
            RideError::InvalidRequest(_) | RideError::InvalidAmount(_) => {
                tracing::warn!("Rejected request: {}", self);
                StatusCode::BAD_REQUEST
            }
            RideError::NoCapacity(_) | RideError::InvalidState(_) => {
                tracing::warn!("Conflict: {}", self);
                StatusCode::CONFLICT
            }
            RideError::NotFound { .. } => {
                tracing::warn!("{}", self);
                StatusCode::NOT_FOUND
            }
            RideError::Forbidden(_) => {
                tracing::warn!("{}", self);
                StatusCode::FORBIDDEN
            }
            RideError::Internal(_) => {
                tracing::error!("{}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.kind(),
            "details": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RideError>;
