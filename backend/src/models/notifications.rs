use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, RideError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    RideRequest,
    RideMatch,
    TripUpdate,
    Payment,
    Rating,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Unread,
    Read,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub status: NotificationStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Moves forward along unread -> read -> archived. Re-applying the
    /// current status is a no-op; going backward is an error.
    pub fn advance_to(&mut self, to: NotificationStatus) -> Result<bool> {
        if to < self.status {
            return Err(RideError::InvalidState(format!(
                "notification {} is {:?} and cannot become {:?}",
                self.id, self.status, to
            )));
        }
        let changed = to != self.status;
        self.status = to;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unread() -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            kind: NotificationType::RideRequest,
            status: NotificationStatus::Unread,
            message: "You have a new ride request from Alice Johnson".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_forward_only() {
        let mut n = unread();
        assert!(n.advance_to(NotificationStatus::Read).unwrap());
        assert!(!n.advance_to(NotificationStatus::Read).unwrap());
        assert!(n.advance_to(NotificationStatus::Unread).is_err());
        assert!(n.advance_to(NotificationStatus::Archived).unwrap());
        assert!(n.advance_to(NotificationStatus::Read).is_err());
        assert_eq!(n.status, NotificationStatus::Archived);
    }
}
