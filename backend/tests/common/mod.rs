#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use rideshare::models::{
    Account, DriverIntent, NewDriverProfile, NewIntent, NewUser, PaymentMethod, Place, Recurrence,
    RideRequest, Role, Session, TransactionType,
};
use rideshare::services::wallet::InstantProcessor;
use rideshare::utils::{Config, ManualClock};
use rideshare::{Decimal, RideService};
use std::sync::Arc;

pub struct World {
    pub service: Arc<RideService>,
    pub clock: Arc<ManualClock>,
    pub driver: Account,
}

impl World {
    pub fn driver_session(&self) -> Session {
        self.driver.session()
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 20, 8, 0, 0).unwrap()
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 20, hour, minute, 0).unwrap()
}

/// A service on a manual clock with one active driver, John Doe.
pub async fn world_with(config: Config) -> World {
    let clock = Arc::new(ManualClock::new(start_time()));
    let service = Arc::new(RideService::new(&config, clock.clone(), Arc::new(InstantProcessor)));

    let john = service
        .register_user(NewUser {
            name: "John Doe".into(),
            email: "john@example.com".into(),
            phone: "+919876543210".into(),
            preferred_payment: PaymentMethod::Wallet,
        })
        .await
        .unwrap();
    service
        .attach_driver_profile(
            &john.session(),
            NewDriverProfile {
                vehicle_model: "Toyota Innova".into(),
                vehicle_number: "KA05AB1234".into(),
                license_number: "DL-2025-XYZ123".into(),
                license_expiry: start_time() + Duration::days(500),
                wallet_payout: true,
            },
        )
        .await
        .unwrap();
    let driver = service.switch_role(&john.session(), Role::Driver).await.unwrap();

    World { service, clock, driver }
}

pub async fn world() -> World {
    world_with(Config::default()).await
}

pub async fn passenger(world: &World, name: &str, email: &str, phone: &str, opening: Option<Decimal>) -> Account {
    let account = world
        .service
        .register_user(NewUser {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            preferred_payment: PaymentMethod::Wallet,
        })
        .await
        .unwrap();
    if let Some(amount) = opening {
        world
            .service
            .wallet_apply(&account.session(), account.wallet_id, TransactionType::Credit, amount, "Money added via UPI")
            .await
            .unwrap();
    }
    account
}

/// MG Road -> Whitefield at 10:00.
pub async fn mg_road_intent(world: &World, seats: u32) -> DriverIntent {
    world
        .service
        .create_intent(
            &world.driver_session(),
            NewIntent {
                start: Place::new("MG Road, Bangalore", 12.9716, 77.5946),
                end: Place::new("Whitefield, Bangalore", 12.9698, 77.7499),
                start_time: at(10, 0),
                seats,
                recurrence: Recurrence::OneTime,
            },
        )
        .await
        .unwrap()
}

/// Indiranagar -> Whitefield at 10:15, along the MG Road route.
pub fn indiranagar_request(passenger_count: i64) -> RideRequest {
    RideRequest {
        pickup: Place::new("Indiranagar, Bangalore", 12.9784, 77.6408),
        drop: Place::new("Whitefield, Bangalore", 12.9698, 77.7499),
        requested_time: at(10, 15),
        passenger_count,
    }
}
