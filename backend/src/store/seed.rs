use chrono::{Duration, NaiveTime};
use rust_decimal_macros::dec;
use tracing::info;

use crate::error::Result;
use crate::models::{
    Account, DriverIntent, NewDriverProfile, NewIntent, NewUser, PaymentMethod, Place, Recurrence,
    Role, TransactionType,
};
use crate::services::RideService;

/// Accounts and intents created by [`seed_demo`].
#[derive(Debug, Clone)]
pub struct DemoSeed {
    pub driver: Account,
    pub passengers: Vec<Account>,
    pub intents: Vec<DriverIntent>,
}

/// Populates an empty service with Bangalore fixtures: one driver offering
/// two routes for tomorrow, and four passengers.
///
/// Every balance comes from ledger rows: once settled, the driver holds
/// ₹1250.75 and Lisa ₹500.00.
pub async fn seed_demo(service: &RideService) -> Result<DemoSeed> {
    let now = service.now();

    let john = service
        .register_user(NewUser {
            name: "John Doe".into(),
            email: "john@example.com".into(),
            phone: "+919876543210".into(),
            preferred_payment: PaymentMethod::Wallet,
        })
        .await?;
    let session = john.session();
    service
        .attach_driver_profile(
            &session,
            NewDriverProfile {
                vehicle_model: "Toyota Innova".into(),
                vehicle_number: "KA05AB1234".into(),
                license_number: "DL-2025-XYZ123".into(),
                license_expiry: now + Duration::days(730),
                wallet_payout: true,
            },
        )
        .await?;
    service.identity.mark_verified(john.user.id).await?;
    let driver = service.switch_role(&session, Role::Driver).await?;
    let session = driver.session();

    service
        .wallet_apply(
            &session,
            driver.wallet_id,
            TransactionType::Credit,
            dec!(1250.75),
            "Opening balance",
        )
        .await?;

    let tomorrow = (now + Duration::days(1)).date_naive();
    let at = |hour, minute| {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(|time| tomorrow.and_time(time).and_utc())
            .unwrap_or(now)
    };
    let mut intents = Vec::new();
    intents.push(
        service
            .create_intent(
                &session,
                NewIntent {
                    start: Place::new("MG Road, Bangalore", 12.9716, 77.5946),
                    end: Place::new("Whitefield, Bangalore", 12.9698, 77.7499),
                    start_time: at(10, 0),
                    seats: 3,
                    recurrence: Recurrence::OneTime,
                },
            )
            .await?,
    );
    intents.push(
        service
            .create_intent(
                &session,
                NewIntent {
                    start: Place::new("Koramangala, Bangalore", 12.9279, 77.6271),
                    end: Place::new("Electronic City, Bangalore", 12.8456, 77.6603),
                    start_time: at(9, 30),
                    seats: 2,
                    recurrence: Recurrence::Daily,
                },
            )
            .await?,
    );

    let mut passengers = Vec::new();
    for (name, email, phone, payment) in [
        ("Alice Johnson", "alice@example.com", "+919876543214", PaymentMethod::Wallet),
        ("Sarah Wilson", "sarah@example.com", "+919876543211", PaymentMethod::Wallet),
        ("Mike Johnson", "mike@example.com", "+919876543212", PaymentMethod::Card),
        ("Lisa Chen", "lisa@example.com", "+919876543213", PaymentMethod::Wallet),
    ] {
        passengers.push(
            service
                .register_user(NewUser {
                    name: name.into(),
                    email: email.into(),
                    phone: phone.into(),
                    preferred_payment: payment,
                })
                .await?,
        );
    }
    if let Some(lisa) = passengers.last() {
        service
            .wallet_apply(
                &lisa.session(),
                lisa.wallet_id,
                TransactionType::Credit,
                dec!(500.00),
                "Money added via UPI",
            )
            .await?;
    }

    info!(
        "🌱 Seeded demo data: driver {}, {} passengers, {} intents",
        driver.user.id,
        passengers.len(),
        intents.len()
    );
    Ok(DemoSeed {
        driver,
        passengers,
        intents,
    })
}
