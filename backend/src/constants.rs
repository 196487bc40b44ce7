// =============================================================================
// Rideshare Backend Constants
// =============================================================================
// This file contains the defaults used throughout the backend. Every value
// here can be overridden from the environment through `Config::from_env`.

// =============================================================================
// SERVER CONFIGURATION
// =============================================================================

/// Default server port if not specified in environment
pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Header carrying the acting user id (authentication happens upstream)
pub const SESSION_USER_HEADER: &str = "x-user-id";

// =============================================================================
// WALLET CONFIGURATION
// =============================================================================

/// Currency assigned to newly opened wallets
pub const DEFAULT_CURRENCY: &str = "INR";

/// How long a wallet transaction may stay pending before it is failed
pub const WALLET_PENDING_TIMEOUT_SECS: i64 = 120;

// =============================================================================
// FARE SCHEDULE
// =============================================================================

/// Flat component of every fare, per passenger
pub const DEFAULT_FARE_BASE: &str = "40.00";

/// Distance component of every fare, per passenger per km
pub const DEFAULT_FARE_PER_KM: &str = "12.00";

// =============================================================================
// MATCHING CONFIGURATION
// =============================================================================

/// Largest detour (km) a driver is asked to make for a passenger
pub const DEFAULT_MAX_DETOUR_KM: f64 = 5.0;

/// Minimum overlap between the intent window and the request window
pub const DEFAULT_MIN_TIME_OVERLAP_MINUTES: i64 = 10;

/// How long after its start time an intent still accepts pickups
pub const DEFAULT_INTENT_WINDOW_MINUTES: i64 = 30;

/// Tolerance either side of a passenger's requested time
pub const DEFAULT_REQUEST_FLEX_MINUTES: i64 = 15;

/// How long a match may stay pending before it expires
pub const DEFAULT_MATCH_PENDING_TTL_SECS: i64 = 300;

// =============================================================================
// TIME CONFIGURATION
// =============================================================================

/// Zone used to expand daily and weekly intents
pub const DEFAULT_SERVICE_TIMEZONE: &str = "Asia/Kolkata";

/// How often the expiry sweeper wakes up
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5;

// =============================================================================
// PROFILE VALIDATION
// =============================================================================

/// Lowest and highest star rating a passenger can give
pub const MIN_RATING_STARS: u8 = 1;
pub const MAX_RATING_STARS: u8 = 5;

/// Mean Earth radius used by the haversine distance
pub const EARTH_RADIUS_KM: f64 = 6371.0;
