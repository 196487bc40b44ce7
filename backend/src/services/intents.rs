use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, RideError};
use crate::models::{DriverIntent, DriverStatus, IntentStatus, NewIntent, Role, Session};
use crate::store::Store;
use crate::utils::geo::haversine_km;
use crate::utils::Clock;

/// Start and end closer than this are the same place.
const MIN_ROUTE_KM: f64 = 0.05;

#[derive(Clone)]
pub struct IntentRegistry {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
}

impl IntentRegistry {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create_intent(&self, session: &Session, new: NewIntent) -> Result<DriverIntent> {
        if session.role != Role::Driver {
            return Err(RideError::Forbidden("only drivers can offer rides".into()));
        }
        if new.seats == 0 {
            return Err(RideError::InvalidRequest("an intent must offer at least one seat".into()));
        }
        if !new.start.point.is_valid() || !new.end.point.is_valid() {
            return Err(RideError::InvalidRequest("coordinates out of range".into()));
        }
        if haversine_km(new.start.point, new.end.point) < MIN_ROUTE_KM {
            return Err(RideError::InvalidRequest("start and end of a route must differ".into()));
        }

        let now = self.clock.now();
        let account = self
            .store
            .accounts
            .snapshot(session.user_id)
            .await
            .ok_or_else(|| RideError::not_found("user", session.user_id))?;
        let driver = account
            .driver
            .ok_or_else(|| RideError::Forbidden("user has no driver profile".into()))?;
        if driver.status != DriverStatus::Active || !driver.license_valid_at(now) {
            return Err(RideError::InvalidState("driver is not active or license has expired".into()));
        }

        let intent = DriverIntent {
            id: Uuid::new_v4(),
            driver_user_id: session.user_id,
            start: new.start,
            end: new.end,
            start_time: new.start_time,
            available_seats: new.seats,
            recurrence: new.recurrence,
            status: IntentStatus::Active,
            created_at: now,
        };
        self.store.intents.insert(intent.id, intent.clone()).await;

        info!(
            "Driver {} offered {} seat(s) {} -> {} ({:?})",
            session.user_id, intent.available_seats, intent.start.label, intent.end.label, intent.recurrence
        );
        Ok(intent)
    }

    /// Withdraws an intent. Matches already made against it are kept as
    /// history; pending ones can no longer be accepted.
    pub async fn cancel_intent(&self, session: &Session, intent_id: Uuid) -> Result<DriverIntent> {
        let row = self
            .store
            .intents
            .get(intent_id)
            .await
            .ok_or_else(|| RideError::not_found("intent", intent_id))?;
        let mut intent = row.lock().await;
        if intent.driver_user_id != session.user_id {
            return Err(RideError::Forbidden("intent belongs to another driver".into()));
        }
        if intent.status == IntentStatus::Cancelled {
            return Err(RideError::InvalidState(format!("intent {} is already cancelled", intent_id)));
        }
        intent.status = IntentStatus::Cancelled;
        info!("Intent {} cancelled", intent_id);
        Ok(intent.clone())
    }

    pub async fn list_for_driver(&self, driver_user_id: Uuid) -> Vec<DriverIntent> {
        let mut intents = self
            .store
            .intents
            .select(|intent| intent.driver_user_id == driver_user_id)
            .await;
        intents.sort_by_key(|intent| (intent.created_at, intent.id));
        intents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewDriverProfile, NewUser, PaymentMethod, Place, Recurrence};
    use crate::services::identity::IdentityStore;
    use crate::utils::SystemClock;
    use chrono::{Duration, Utc};

    async fn setup() -> (IntentRegistry, IdentityStore, Session) {
        let store = Arc::new(Store::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let identity = IdentityStore::new(store.clone(), clock.clone(), "INR");
        let account = identity
            .register_user(NewUser {
                name: "John Doe".into(),
                email: "john@example.com".into(),
                phone: "+919876543210".into(),
                preferred_payment: PaymentMethod::Wallet,
            })
            .await
            .unwrap();
        identity
            .attach_driver_profile(
                account.user.id,
                NewDriverProfile {
                    vehicle_model: "Toyota Innova".into(),
                    vehicle_number: "KA05AB1234".into(),
                    license_number: "DL-2025-XYZ123".into(),
                    license_expiry: Utc::now() + Duration::days(365),
                    wallet_payout: false,
                },
            )
            .await
            .unwrap();
        let driver = identity.switch_role(account.user.id, Role::Driver).await.unwrap();
        (IntentRegistry::new(store, clock), identity, driver.session())
    }

    fn mg_road_to_whitefield(seats: u32) -> NewIntent {
        NewIntent {
            start: Place::new("MG Road, Bangalore", 12.9716, 77.5946),
            end: Place::new("Whitefield, Bangalore", 12.9698, 77.7499),
            start_time: Utc::now() + Duration::days(1),
            seats,
            recurrence: Recurrence::OneTime,
        }
    }

    #[tokio::test]
    async fn test_create_intent_starts_active() {
        let (registry, _, driver) = setup().await;
        let intent = registry.create_intent(&driver, mg_road_to_whitefield(3)).await.unwrap();
        assert_eq!(intent.status, IntentStatus::Active);
        assert_eq!(intent.available_seats, 3);
        assert_eq!(registry.list_for_driver(driver.user_id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_create_intent_validates_input() {
        let (registry, _, driver) = setup().await;
        assert!(matches!(
            registry.create_intent(&driver, mg_road_to_whitefield(0)).await,
            Err(RideError::InvalidRequest(_))
        ));

        let mut same_place = mg_road_to_whitefield(2);
        same_place.end = same_place.start.clone();
        assert!(matches!(
            registry.create_intent(&driver, same_place).await,
            Err(RideError::InvalidRequest(_))
        ));

        let mut off_map = mg_road_to_whitefield(2);
        off_map.start = Place::new("Nowhere", 95.0, 77.59);
        assert!(matches!(
            registry.create_intent(&driver, off_map).await,
            Err(RideError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_passenger_role_cannot_offer_rides() {
        let (registry, identity, driver) = setup().await;
        let passenger = identity.switch_role(driver.user_id, Role::Passenger).await.unwrap();
        assert!(matches!(
            registry.create_intent(&passenger.session(), mg_road_to_whitefield(2)).await,
            Err(RideError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_offline_driver_cannot_offer_rides() {
        let (registry, identity, driver) = setup().await;
        identity.set_driver_status(driver.user_id, DriverStatus::Offline).await.unwrap();
        assert!(matches!(
            registry.create_intent(&driver, mg_road_to_whitefield(2)).await,
            Err(RideError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_intent_once_and_only_by_owner() {
        let (registry, _, driver) = setup().await;
        let intent = registry.create_intent(&driver, mg_road_to_whitefield(2)).await.unwrap();

        let stranger = Session {
            user_id: Uuid::new_v4(),
            role: Role::Driver,
        };
        assert!(matches!(
            registry.cancel_intent(&stranger, intent.id).await,
            Err(RideError::Forbidden(_))
        ));

        let cancelled = registry.cancel_intent(&driver, intent.id).await.unwrap();
        assert_eq!(cancelled.status, IntentStatus::Cancelled);
        assert!(matches!(
            registry.cancel_intent(&driver, intent.id).await,
            Err(RideError::InvalidState(_))
        ));
        assert!(matches!(
            registry.cancel_intent(&driver, Uuid::new_v4()).await,
            Err(RideError::NotFound { .. })
        ));
    }
}
