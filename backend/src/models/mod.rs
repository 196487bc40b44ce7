pub mod events;
pub mod intents;
pub mod matches;
pub mod notifications;
pub mod stats;
pub mod trips;
pub mod users;
pub mod wallet;

pub use events::DomainEvent;
pub use intents::{DriverIntent, GeoPoint, IntentStatus, NewIntent, Place, Recurrence};
pub use matches::{MatchDecision, MatchStatus, RideMatch, RideRequest};
pub use notifications::{Notification, NotificationStatus, NotificationType};
pub use stats::{DriverStats, PassengerStats};
pub use trips::{Party, PaymentStatus, Trip, TripStatus};
pub use users::{
    Account, DriverProfile, DriverStatus, NewDriverProfile, NewUser, PassengerProfile,
    PaymentMethod, Role, Session, User,
};
pub use wallet::{
    MonthlySummary, TransactionStatus, TransactionType, Wallet, WalletSummary, WalletTransaction,
};
