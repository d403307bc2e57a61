use chrono::{DateTime, Utc};
use lineup_shared::money::Money;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Hold,
    Confirmed,
    Cancelled,
    Expired,
}

/// A seat reservation for one surf session. Created as `HOLD`, confirmed by
/// the server once its payment settles, expired server-side when the hold
/// TTL elapses without payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub session_id: Uuid,
    pub status: BookingStatus,
    pub hold_expires_at: Option<DateTime<Utc>>,
    pub price: Money,
}

impl Booking {
    /// A booking can still be paid only while it is a `HOLD` whose TTL has
    /// not elapsed. A missing expiry means the server did not bound the hold.
    pub fn hold_is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Hold
            && self.hold_expires_at.map_or(true, |expires| expires > now)
    }
}

/// Filter for the current user's booking list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    pub fn with_status(status: BookingStatus) -> Self {
        Self {
            status: Some(status),
        }
    }
}
