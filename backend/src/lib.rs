pub mod constants;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use error::{Result, RideError};
pub use services::RideService;
pub use utils::config::Config;

// Re-export common types
pub use chrono::{DateTime, Utc};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
