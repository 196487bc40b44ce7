use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use clap::{Arg, Command};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rideshare::{
    models::{MatchDecision, Place, RideRequest, TransactionType},
    services::wallet::{InstantProcessor, SettlementPolicy},
    store::seed::seed_demo,
    utils::{init_logging, Config, ManualClock},
    Decimal, RideError, RideService,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Pickup, drop and offset (minutes) from the seeded intent start it rides along.
struct Route {
    pickup: Place,
    drop: Place,
    minutes_after_start: i64,
    intent_hour: u32,
    intent_minute: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let matches = Command::new("ride-simulator")
        .about("Drive seeded ride scenarios end to end against an in-memory core")
        .arg(
            Arg::new("rides")
                .long("rides")
                .help("Number of ride requests to simulate")
                .value_parser(clap::value_parser!(u32))
                .default_value("10"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Seed for the random choices, for reproducible runs")
                .value_parser(clap::value_parser!(u64))
                .default_value("42"),
        )
        .arg(
            Arg::new("capture-at-pickup")
                .long("capture-at-pickup")
                .help("Debit the estimated fare when the passenger is picked up")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("deferred")
                .long("deferred")
                .help("Leave wallet transactions pending until the sweeper settles them")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let rides = matches.get_one::<u32>("rides").copied().unwrap_or(10);
    let seed = matches.get_one::<u64>("seed").copied().unwrap_or(42);

    let mut config = Config::from_env()?;
    config.lifecycle.capture_at_pickup = matches.get_flag("capture-at-pickup");
    if matches.get_flag("deferred") {
        config.ledger.policy = SettlementPolicy::Deferred;
    }

    let start = Utc
        .with_ymd_and_hms(2025, 8, 20, 8, 0, 0)
        .single()
        .ok_or_else(|| anyhow::anyhow!("invalid simulation start"))?;
    let clock = Arc::new(ManualClock::new(start));
    let service = RideService::new(&config, clock.clone(), Arc::new(InstantProcessor));
    let mut rng = StdRng::seed_from_u64(seed);

    info!("🚗 Starting ride simulator: {} rides, seed {}", rides, seed);
    let demo = seed_demo(&service).await?;
    service.sweep().await;
    let driver = demo.driver.session();

    let routes = [
        Route {
            pickup: Place::new("Indiranagar, Bangalore", 12.9784, 77.6408),
            drop: Place::new("Whitefield, Bangalore", 12.9698, 77.7499),
            minutes_after_start: 15,
            intent_hour: 10,
            intent_minute: 0,
        },
        Route {
            pickup: Place::new("BTM Layout, Bangalore", 12.9166, 77.6101),
            drop: Place::new("Electronic City, Bangalore", 12.8456, 77.6603),
            minutes_after_start: 15,
            intent_hour: 9,
            intent_minute: 30,
        },
    ];
    let tomorrow = (start + Duration::days(1)).date_naive();

    let (mut completed, mut cancelled, mut unmatched, mut declined) = (0u32, 0u32, 0u32, 0u32);

    for ride in 1..=rides {
        clock.advance(Duration::minutes(rng.random_range(1..=5)));

        let account = &demo.passengers[rng.random_range(0..demo.passengers.len())];
        let passenger = account.session();
        let route = &routes[rng.random_range(0..routes.len())];

        // Keep wallets funded so most settlements go through
        let top_up = Decimal::from(rng.random_range(2..=6) * 100);
        service
            .wallet_apply(&passenger, account.wallet_id, TransactionType::Credit, top_up, "Money added via UPI")
            .await?;

        let requested_time = tomorrow
            .and_hms_opt(route.intent_hour, route.intent_minute, 0)
            .map(|at| at.and_utc())
            .ok_or_else(|| anyhow::anyhow!("invalid intent time"))?
            + Duration::minutes(route.minutes_after_start + rng.random_range(-10..=10));
        let request = RideRequest {
            pickup: route.pickup.clone(),
            drop: route.drop.clone(),
            requested_time,
            passenger_count: rng.random_range(1..=2),
        };

        info!(
            "🙋 Ride {} | {} wants {} seat(s) {} -> {}",
            ride, account.user.name, request.passenger_count, route.pickup.label, route.drop.label
        );
        let candidates = match service.request_ride(&passenger, request).await {
            Ok(candidates) => candidates,
            Err(RideError::NoCapacity(reason)) => {
                warn!("🚫 Ride {} unmatched: {}", ride, reason);
                unmatched += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let Some(best) = candidates.first() else {
            unmatched += 1;
            continue;
        };

        let decision = if rng.random_bool(0.85) {
            MatchDecision::Accept
        } else {
            MatchDecision::Reject
        };
        let decided = match service.decide_match(&driver, best.id, decision).await {
            Ok(decided) => decided,
            Err(e) => {
                warn!("⚠️ Ride {} decision failed: {}", ride, e);
                declined += 1;
                continue;
            }
        };
        if decision == MatchDecision::Reject {
            info!("👎 Ride {} declined by driver", ride);
            declined += 1;
            continue;
        }

        let trip = service.start_trip(&driver, decided.id).await?;
        clock.advance(Duration::minutes(rng.random_range(3..=10)));

        if rng.random_bool(0.1) {
            service.cancel_trip(&passenger, trip.id, "Change of plans").await?;
            info!("❌ Ride {} cancelled before pickup", ride);
            cancelled += 1;
            continue;
        }

        service.advance_trip(&driver, trip.id, None).await?;
        clock.advance(Duration::minutes(rng.random_range(20..=45)));
        let distance = decided.distance_km * rng.random_range(0.95..1.15);
        let finished = service.advance_trip(&driver, trip.id, Some(distance)).await?;
        info!(
            "🏁 Ride {} completed: {:.1} km, ₹{} ({:?})",
            ride, distance, finished.payment_amount, finished.payment_status
        );
        completed += 1;

        service.rate_trip(&passenger, trip.id, rng.random_range(3..=5)).await?;
    }

    // Let anything still pending expire or settle
    clock.advance(Duration::minutes(10));
    let report = service.sweep().await;

    let stats = service.driver_stats(&driver).await?;
    let wallet = service.wallet(&driver, demo.driver.wallet_id).await?;
    info!(
        "📊 Simulation done | completed: {} | cancelled: {} | declined: {} | unmatched: {}",
        completed, cancelled, declined, unmatched
    );
    info!("🧹 Final sweep: {:?}", report);
    info!(
        "🚘 Driver {} | trips: {} | earnings: ₹{} | rating: {:.2} | wallet: ₹{}",
        demo.driver.user.name, stats.total_trips, stats.total_earnings, stats.average_rating, wallet.balance
    );
    Ok(())
}
