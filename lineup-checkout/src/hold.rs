use chrono::{Duration, Utc};
use lineup_core::booking::{Booking, BookingFilter, BookingStatus};
use lineup_core::error::ApiError;
use lineup_core::idempotency::IdempotencyKey;
use lineup_core::ports::BookingsApi;
use std::sync::Arc;
use uuid::Uuid;

/// Makes sure a live `HOLD` booking exists for a session before payment.
///
/// An existing unexpired hold is reused as-is; creating a second one would
/// decrement the session's seat count twice. No local cache is touched here,
/// invalidation stays with the caller.
pub struct BookingHoldManager {
    bookings: Arc<dyn BookingsApi>,
}

impl BookingHoldManager {
    pub fn new(bookings: Arc<dyn BookingsApi>) -> Self {
        Self { bookings }
    }

    /// The current user's active hold for `session_id`, if any. Read-only.
    pub async fn find_active_hold(&self, session_id: Uuid) -> Result<Option<Booking>, ApiError> {
        let now = Utc::now();
        let held = self
            .bookings
            .list_my_bookings(BookingFilter::with_status(BookingStatus::Hold))
            .await?;
        Ok(held
            .into_iter()
            .find(|booking| booking.session_id == session_id && booking.hold_is_active(now)))
    }

    /// Returns the existing active hold for the session, or creates a new
    /// one with the supplied idempotency key.
    pub async fn ensure_booking(
        &self,
        session_id: Uuid,
        key: &IdempotencyKey,
    ) -> Result<Booking, ApiError> {
        if let Some(existing) = self.find_active_hold(session_id).await? {
            tracing::info!(
                "Reusing active hold {} for session {}",
                existing.id,
                session_id
            );
            return Ok(existing);
        }

        let created = self.bookings.create_booking(session_id, key).await?;
        let mut booking = created.booking;

        // Some responses carry only a relative TTL hint instead of an
        // absolute expiry.
        if booking.hold_expires_at.is_none() {
            if let Some(ttl) = created.hold_ttl_seconds {
                booking.hold_expires_at = Some(Utc::now() + Duration::seconds(ttl as i64));
            }
        }

        tracing::info!("Created hold {} for session {}", booking.id, session_id);
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lineup_core::ports::CreatedBooking;
    use lineup_shared::money::Money;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedBookings {
        existing: Vec<Booking>,
        create_calls: AtomicUsize,
        hold_ttl_seconds: Option<u64>,
    }

    impl ScriptedBookings {
        fn new(existing: Vec<Booking>) -> Self {
            Self {
                existing,
                create_calls: AtomicUsize::new(0),
                hold_ttl_seconds: Some(900),
            }
        }
    }

    #[async_trait]
    impl BookingsApi for ScriptedBookings {
        async fn create_booking(
            &self,
            session_id: Uuid,
            _key: &IdempotencyKey,
        ) -> Result<CreatedBooking, ApiError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            Ok(CreatedBooking {
                booking: Booking {
                    id: Uuid::new_v4(),
                    session_id,
                    status: BookingStatus::Hold,
                    hold_expires_at: None,
                    price: Money::new(790_000, "RUB"),
                },
                hold_ttl_seconds: self.hold_ttl_seconds,
            })
        }

        async fn list_my_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, ApiError> {
            Ok(self
                .existing
                .iter()
                .filter(|b| filter.status.map_or(true, |s| b.status == s))
                .cloned()
                .collect())
        }
    }

    fn hold_for(session_id: Uuid, expires_in_seconds: i64) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            session_id,
            status: BookingStatus::Hold,
            hold_expires_at: Some(Utc::now() + Duration::seconds(expires_in_seconds)),
            price: Money::new(790_000, "RUB"),
        }
    }

    fn key() -> IdempotencyKey {
        IdempotencyKey::derive("session-booking", "test", Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_existing_hold_is_reused_without_create_call() {
        let session_id = Uuid::new_v4();
        let existing = hold_for(session_id, 600);
        let existing_id = existing.id;
        let api = Arc::new(ScriptedBookings::new(vec![existing]));
        let manager = BookingHoldManager::new(api.clone());

        let booking = manager.ensure_booking(session_id, &key()).await.unwrap();

        assert_eq!(booking.id, existing_id);
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_hold_is_not_reused() {
        let session_id = Uuid::new_v4();
        let stale = hold_for(session_id, -5);
        let stale_id = stale.id;
        let api = Arc::new(ScriptedBookings::new(vec![stale]));
        let manager = BookingHoldManager::new(api.clone());

        let booking = manager.ensure_booking(session_id, &key()).await.unwrap();

        assert_ne!(booking.id, stale_id);
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hold_for_other_session_is_ignored() {
        let session_id = Uuid::new_v4();
        let other = hold_for(Uuid::new_v4(), 600);
        let api = Arc::new(ScriptedBookings::new(vec![other]));
        let manager = BookingHoldManager::new(api.clone());

        let booking = manager.ensure_booking(session_id, &key()).await.unwrap();

        assert_eq!(booking.session_id, session_id);
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ttl_hint_fills_missing_expiry() {
        let session_id = Uuid::new_v4();
        let api = Arc::new(ScriptedBookings::new(vec![]));
        let manager = BookingHoldManager::new(api);

        let booking = manager.ensure_booking(session_id, &key()).await.unwrap();

        let expires = booking.hold_expires_at.expect("expiry from ttl hint");
        assert!(expires > Utc::now());
    }
}
