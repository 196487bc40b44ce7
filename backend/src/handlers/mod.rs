pub mod notifications;
pub mod rides;
pub mod session;
pub mod trips;
pub mod users;
pub mod wallet;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::services::RideService;

pub use session::CurrentSession;

pub type AppState = Arc<RideService>;

/// Every route of the API, without CORS. The server binary adds the layer.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Identity
        .route("/api/users", post(users::register))
        .route("/api/me", get(users::me))
        .route("/api/users/{id}/driver", post(users::attach_driver))
        .route("/api/users/{id}/driver/status", post(users::set_driver_status))
        .route("/api/users/{id}/passenger", post(users::attach_passenger))
        .route("/api/users/{id}/role", post(users::switch_role))
        // Intents and matching
        .route("/api/intents", post(rides::create_intent).get(rides::list_intents))
        .route("/api/intents/{id}", delete(rides::cancel_intent))
        .route("/api/rides/request", post(rides::request_ride))
        .route("/api/matches", get(rides::list_matches))
        .route("/api/matches/{id}/decision", post(rides::decide_match))
        // Trips
        .route("/api/trips", post(trips::start_trip).get(trips::list_trips))
        .route("/api/trips/{id}", get(trips::get_trip))
        .route("/api/trips/{id}/advance", post(trips::advance_trip))
        .route("/api/trips/{id}/cancel", post(trips::cancel_trip))
        .route("/api/trips/{id}/rating", post(trips::rate_trip))
        // Wallet
        .route("/api/wallets/{id}", get(wallet::get_wallet))
        .route("/api/wallets/{id}/transactions", post(wallet::apply_transaction))
        // Notifications
        .route("/api/notifications", get(notifications::list))
        .route("/api/notifications/read-all", post(notifications::mark_all_read))
        .route("/api/notifications/{id}/read", post(notifications::mark_read))
        .route("/api/notifications/{id}/archive", post(notifications::archive))
        // Dashboard
        .route("/api/stats", get(users::stats))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
