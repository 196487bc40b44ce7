pub mod clock;
pub mod config;
pub mod geo;
pub mod logging;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use logging::init_logging;
