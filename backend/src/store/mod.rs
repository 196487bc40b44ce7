pub mod seed;
pub mod table;

use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::models::{Account, DriverIntent, Notification, RideMatch, Trip, Wallet};
pub use table::Table;

/// In-memory storage for every aggregate of the core.
#[derive(Debug, Default)]
pub struct Store {
    pub accounts: Table<Account>,
    pub intents: Table<DriverIntent>,
    pub matches: Table<RideMatch>,
    pub trips: Table<Trip>,
    pub wallets: Table<Wallet>,
    pub notifications: Table<Notification>,
    trip_by_match: Mutex<HashMap<Uuid, Uuid>>,
    accepted_by_request: Mutex<HashMap<Uuid, Uuid>>,
    email_index: RwLock<HashMap<String, Uuid>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unique constraint on trips.match_id. Returns false when the match
    /// already produced a trip.
    pub async fn claim_trip_slot(&self, match_id: Uuid, trip_id: Uuid) -> bool {
        let mut index = self.trip_by_match.lock().await;
        if index.contains_key(&match_id) {
            return false;
        }
        index.insert(match_id, trip_id);
        true
    }

    pub async fn release_trip_slot(&self, match_id: Uuid) {
        self.trip_by_match.lock().await.remove(&match_id);
    }

    /// At most one accepted match per ride request. Returns false when a
    /// different match already holds the request.
    pub async fn claim_request(&self, request_id: Uuid, match_id: Uuid) -> bool {
        let mut index = self.accepted_by_request.lock().await;
        match index.get(&request_id) {
            Some(holder) => *holder == match_id,
            None => {
                index.insert(request_id, match_id);
                true
            }
        }
    }

    pub async fn release_request(&self, request_id: Uuid) {
        self.accepted_by_request.lock().await.remove(&request_id);
    }

    /// Unique constraint on users.email (case-insensitive).
    pub async fn claim_email(&self, email: &str, user_id: Uuid) -> bool {
        let key = email.to_lowercase();
        let mut index = self.email_index.write().await;
        if index.contains_key(&key) {
            return false;
        }
        index.insert(key, user_id);
        true
    }
}
