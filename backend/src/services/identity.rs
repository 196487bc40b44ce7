use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, RideError};
use crate::models::{
    Account, DriverProfile, DriverStatus, NewDriverProfile, NewUser, PassengerProfile,
    PaymentMethod, Role, Session, User, Wallet,
};
use crate::store::Store;
use crate::utils::validation::{normalize_vehicle_number, validate_email, validate_phone};
use crate::utils::Clock;

/// Users with their optional driver/passenger capabilities and wallet.
#[derive(Clone)]
pub struct IdentityStore {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    currency: String,
}

impl IdentityStore {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>, currency: impl Into<String>) -> Self {
        Self {
            store,
            clock,
            currency: currency.into(),
        }
    }

    /// Creates a passenger account and opens its wallet.
    pub async fn register_user(&self, new: NewUser) -> Result<Account> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(RideError::InvalidRequest("name must not be empty".into()));
        }
        validate_email(&new.email)?;
        validate_phone(&new.phone)?;

        let now = self.clock.now();
        let user_id = Uuid::new_v4();
        if !self.store.claim_email(&new.email, user_id).await {
            return Err(RideError::InvalidState(format!("email {} is already registered", new.email)));
        }

        let wallet = Wallet::open(user_id, self.currency.clone(), now);
        let wallet_id = wallet.id;
        self.store.wallets.insert(wallet_id, wallet).await;

        let account = Account {
            user: User {
                id: user_id,
                name: name.to_string(),
                email: new.email,
                phone: new.phone,
                role: Role::Passenger,
                is_verified: false,
                created_at: now,
                updated_at: now,
            },
            driver: None,
            passenger: Some(PassengerProfile {
                id: Uuid::new_v4(),
                user_id,
                preferred_payment: new.preferred_payment,
            }),
            wallet_id,
        };
        self.store.accounts.insert(user_id, account.clone()).await;

        info!("Registered user {} with wallet {}", user_id, wallet_id);
        Ok(account)
    }

    pub async fn account(&self, user_id: Uuid) -> Result<Account> {
        self.store
            .accounts
            .snapshot(user_id)
            .await
            .ok_or_else(|| RideError::not_found("user", user_id))
    }

    pub async fn open_session(&self, user_id: Uuid) -> Result<Session> {
        Ok(self.account(user_id).await?.session())
    }

    pub async fn attach_driver_profile(&self, user_id: Uuid, new: NewDriverProfile) -> Result<Account> {
        let vehicle_number = normalize_vehicle_number(&new.vehicle_number)?;
        if new.vehicle_model.trim().is_empty() || new.license_number.trim().is_empty() {
            return Err(RideError::InvalidRequest("vehicle model and license number are required".into()));
        }
        let now = self.clock.now();
        if new.license_expiry <= now {
            return Err(RideError::InvalidRequest("driver license has expired".into()));
        }

        self.update(user_id, |account| {
            if account.driver.is_some() {
                return Err(RideError::InvalidState(format!("user {} already has a driver profile", user_id)));
            }
            account.driver = Some(DriverProfile {
                id: Uuid::new_v4(),
                user_id,
                vehicle_model: new.vehicle_model.trim().to_string(),
                vehicle_number,
                license_number: new.license_number.trim().to_string(),
                license_expiry: new.license_expiry,
                rating: 0.0,
                rating_count: 0,
                total_trips: 0,
                status: DriverStatus::Active,
                wallet_payout: new.wallet_payout,
            });
            Ok(())
        })
        .await
    }

    pub async fn attach_passenger_profile(&self, user_id: Uuid, preferred_payment: PaymentMethod) -> Result<Account> {
        self.update(user_id, |account| {
            match account.passenger.as_mut() {
                Some(passenger) => passenger.preferred_payment = preferred_payment,
                None => {
                    account.passenger = Some(PassengerProfile {
                        id: Uuid::new_v4(),
                        user_id,
                        preferred_payment,
                    })
                }
            }
            Ok(())
        })
        .await
    }

    /// Flips the active role. The other profile, and everything recorded
    /// under it, stays in place.
    pub async fn switch_role(&self, user_id: Uuid, role: Role) -> Result<Account> {
        let account = self
            .update(user_id, |account| {
                let has_profile = match role {
                    Role::Driver => account.driver.is_some(),
                    Role::Passenger => account.passenger.is_some(),
                };
                if !has_profile {
                    return Err(RideError::InvalidState(format!(
                        "user {} has no {:?} profile to switch to",
                        user_id, role
                    )));
                }
                account.user.role = role;
                Ok(())
            })
            .await?;
        info!("User {} switched role to {:?}", user_id, role);
        Ok(account)
    }

    pub async fn set_driver_status(&self, user_id: Uuid, status: DriverStatus) -> Result<Account> {
        let now = self.clock.now();
        self.update(user_id, |account| {
            let driver = account
                .driver
                .as_mut()
                .ok_or_else(|| RideError::InvalidState(format!("user {} is not a driver", user_id)))?;
            if status == DriverStatus::Active && !driver.license_valid_at(now) {
                return Err(RideError::InvalidState("cannot activate a driver with an expired license".into()));
            }
            driver.status = status;
            Ok(())
        })
        .await
    }

    pub async fn mark_verified(&self, user_id: Uuid) -> Result<Account> {
        self.update(user_id, |account| {
            account.user.is_verified = true;
            Ok(())
        })
        .await
    }

    pub async fn record_rating(&self, driver_user_id: Uuid, stars: u8) -> Result<Account> {
        self.update(driver_user_id, |account| {
            let driver = account
                .driver
                .as_mut()
                .ok_or_else(|| RideError::InvalidState(format!("user {} is not a driver", driver_user_id)))?;
            driver.record_rating(stars);
            Ok(())
        })
        .await
    }

    pub async fn record_completed_trip(&self, driver_user_id: Uuid) -> Result<Account> {
        self.update(driver_user_id, |account| {
            if let Some(driver) = account.driver.as_mut() {
                driver.total_trips += 1;
            }
            Ok(())
        })
        .await
    }

    async fn update<F>(&self, user_id: Uuid, apply: F) -> Result<Account>
    where
        F: FnOnce(&mut Account) -> Result<()>,
    {
        let row = self
            .store
            .accounts
            .get(user_id)
            .await
            .ok_or_else(|| RideError::not_found("user", user_id))?;
        let mut account = row.lock().await;
        apply(&mut account)?;
        account.user.updated_at = self.clock.now();
        Ok(account.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::SystemClock;
    use chrono::{Duration, Utc};

    fn identity() -> IdentityStore {
        IdentityStore::new(Arc::new(Store::new()), Arc::new(SystemClock), "INR")
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "John Doe".into(),
            email: email.into(),
            phone: "+919876543210".into(),
            preferred_payment: PaymentMethod::Wallet,
        }
    }

    fn driver_profile(expiry_days: i64) -> NewDriverProfile {
        NewDriverProfile {
            vehicle_model: "Toyota Innova".into(),
            vehicle_number: "KA05AB1234".into(),
            license_number: "DL-2025-XYZ123".into(),
            license_expiry: Utc::now() + Duration::days(expiry_days),
            wallet_payout: true,
        }
    }

    #[tokio::test]
    async fn test_register_opens_wallet_and_passenger_role() {
        let identity = identity();
        let account = identity.register_user(new_user("john@example.com")).await.unwrap();
        assert_eq!(account.user.role, Role::Passenger);
        assert!(account.passenger.is_some());
        assert!(identity.store.wallets.contains(account.wallet_id).await);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let identity = identity();
        identity.register_user(new_user("john@example.com")).await.unwrap();
        let err = identity.register_user(new_user("JOHN@example.com")).await.unwrap_err();
        assert!(matches!(err, RideError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_switch_role_keeps_both_profiles() {
        let identity = identity();
        let account = identity.register_user(new_user("john@example.com")).await.unwrap();
        let id = account.user.id;

        let err = identity.switch_role(id, Role::Driver).await.unwrap_err();
        assert!(matches!(err, RideError::InvalidState(_)));

        identity.attach_driver_profile(id, driver_profile(365)).await.unwrap();
        let driver = identity.switch_role(id, Role::Driver).await.unwrap();
        assert_eq!(driver.user.role, Role::Driver);
        assert!(driver.passenger.is_some());

        let back = identity.switch_role(id, Role::Passenger).await.unwrap();
        assert!(back.driver.is_some());
    }

    #[tokio::test]
    async fn test_expired_license_cannot_be_active() {
        let identity = identity();
        let account = identity.register_user(new_user("john@example.com")).await.unwrap();
        let err = identity
            .attach_driver_profile(account.user.id, driver_profile(-1))
            .await
            .unwrap_err();
        assert!(matches!(err, RideError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_unknown_user_not_found() {
        let err = identity().open_session(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RideError::NotFound { .. }));
    }
}
