use anyhow::{Context, Result};
use chrono::Duration;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use std::env;
use std::fmt::Display;
use std::str::FromStr;

use crate::constants::*;
use crate::services::matching::MatchingConfig;
use crate::services::pricing::FareSchedule;
use crate::services::trips::LifecycleConfig;
use crate::services::wallet::{LedgerConfig, SettlementPolicy};
use crate::utils::validation::is_valid_currency;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub currency: String,
    pub sweep_interval: std::time::Duration,
    pub matching: MatchingConfig,
    pub fares: FareSchedule,
    pub lifecycle: LifecycleConfig,
    pub ledger: LedgerConfig,
    /// Load the Bangalore demo fixtures at startup.
    pub seed_demo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
            currency: DEFAULT_CURRENCY.to_string(),
            sweep_interval: std::time::Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            matching: MatchingConfig::default(),
            fares: FareSchedule::default(),
            lifecycle: LifecycleConfig::default(),
            ledger: LedgerConfig::default(),
            seed_demo: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let timezone: Tz = env::var("SERVICE_TIMEZONE")
            .unwrap_or_else(|_| DEFAULT_SERVICE_TIMEZONE.to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("SERVICE_TIMEZONE is not a valid IANA zone: {}", e))?;

        let currency = env::var("CURRENCY").unwrap_or_else(|_| DEFAULT_CURRENCY.to_string());
        if !is_valid_currency(&currency) {
            anyhow::bail!("CURRENCY must be a three-letter ISO code, got '{}'", currency);
        }

        Ok(Self {
            port: env_or("PORT", DEFAULT_SERVER_PORT)?,
            currency,
            sweep_interval: std::time::Duration::from_secs(env_or(
                "SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )?),
            matching: MatchingConfig {
                max_detour_km: env_or("MAX_DETOUR_KM", DEFAULT_MAX_DETOUR_KM)?,
                min_time_overlap: Duration::minutes(env_or(
                    "MIN_TIME_OVERLAP_MINUTES",
                    DEFAULT_MIN_TIME_OVERLAP_MINUTES,
                )?),
                intent_window: Duration::minutes(env_or(
                    "INTENT_WINDOW_MINUTES",
                    DEFAULT_INTENT_WINDOW_MINUTES,
                )?),
                request_flex: Duration::minutes(env_or(
                    "REQUEST_FLEX_MINUTES",
                    DEFAULT_REQUEST_FLEX_MINUTES,
                )?),
                pending_ttl: Duration::seconds(env_or(
                    "MATCH_PENDING_TTL_SECS",
                    DEFAULT_MATCH_PENDING_TTL_SECS,
                )?),
                timezone,
            },
            fares: FareSchedule {
                base: env_or("FARE_BASE", decimal(DEFAULT_FARE_BASE)?)?,
                per_km: env_or("FARE_PER_KM", decimal(DEFAULT_FARE_PER_KM)?)?,
            },
            lifecycle: LifecycleConfig {
                capture_at_pickup: env_or("CAPTURE_AT_PICKUP", false)?,
            },
            ledger: LedgerConfig {
                policy: env_or("SETTLEMENT_POLICY", SettlementPolicy::Immediate)?,
                pending_timeout: Duration::seconds(env_or(
                    "WALLET_PENDING_TIMEOUT_SECS",
                    WALLET_PENDING_TIMEOUT_SECS,
                )?),
            },
            seed_demo: env_or("SEED_DEMO", false)?,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    parse_or(key, env::var(key).ok(), default)
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

fn decimal(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).with_context(|| format!("invalid decimal constant '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = Config::default();
        assert_eq!(config.port, DEFAULT_SERVER_PORT);
        assert_eq!(config.currency, "INR");
        assert_eq!(config.ledger.policy, SettlementPolicy::Immediate);
        assert!(!config.lifecycle.capture_at_pickup);
    }

    #[test]
    fn test_parse_or_reports_bad_values() {
        let err = parse_or::<u16>("PORT", Some("eighty".into()), 80).unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert!(err.to_string().contains("eighty"));
        assert_eq!(parse_or::<u16>("PORT", Some(" 8081 ".into()), 80).unwrap(), 8081);
        assert_eq!(parse_or::<u16>("PORT", None, 80).unwrap(), 80);
    }
}
