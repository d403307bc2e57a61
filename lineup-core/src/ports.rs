use crate::booking::{Booking, BookingFilter};
use crate::error::ApiError;
use crate::idempotency::IdempotencyKey;
use crate::payment::{CertificateKind, CertificateOrder, Payment, PaymentRequest, ProductKind};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Booking creation response: the new `HOLD` plus an optional TTL hint for
/// clients the server did not give an absolute expiry to.
#[derive(Debug, Clone)]
pub struct CreatedBooking {
    pub booking: Booking,
    pub hold_ttl_seconds: Option<u64>,
}

/// Booking endpoints of the school API.
#[async_trait]
pub trait BookingsApi: Send + Sync {
    /// `POST /sessions/{id}/book`. Idempotent on the supplied key.
    async fn create_booking(
        &self,
        session_id: Uuid,
        key: &IdempotencyKey,
    ) -> Result<CreatedBooking, ApiError>;

    /// Current user's bookings, optionally filtered by status.
    async fn list_my_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, ApiError>;
}

/// Payment endpoints of the school API. The idempotency key is always
/// supplied by the caller; implementations never mint their own.
#[async_trait]
pub trait PaymentsApi: Send + Sync {
    /// `POST /bookings/{id}/payment`.
    async fn create_booking_payment(
        &self,
        booking_id: Uuid,
        request: &PaymentRequest,
        key: &IdempotencyKey,
    ) -> Result<Payment, ApiError>;

    /// `POST /season-ticket-plans/{id}/purchase`.
    async fn purchase_season_ticket(
        &self,
        plan_id: Uuid,
        request: &PaymentRequest,
        key: &IdempotencyKey,
    ) -> Result<Payment, ApiError>;

    /// `POST /certificates`.
    async fn purchase_certificate(
        &self,
        kind: &CertificateKind,
        request: &PaymentRequest,
        key: &IdempotencyKey,
    ) -> Result<CertificateOrder, ApiError>;
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("not running inside the host mini-app container")]
    OutsideHost,
    #[error("payment dialog failed: {0}")]
    Dialog(String),
    #[error("external navigation failed: {0}")]
    Navigation(String),
}

/// Surface of the chat-platform mini-app runtime the resolver drives.
#[async_trait]
pub trait HostRuntime: Send + Sync {
    async fn is_host_environment(&self) -> bool;

    /// Opens the host's blocking payment dialog and waits for its terminal
    /// status string (`paid` / `cancelled` / `failed` / `pending` / other).
    async fn open_invoice(&self, slug: &str) -> Result<String, HostError>;

    /// Non-blocking navigation to an external checkout address.
    async fn open_external(&self, url: &str) -> Result<(), HostError>;
}

/// Post-purchase navigation owned by the page layer.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn to_success_screen(&self, product: ProductKind, reference: Option<String>);
}

/// External re-authentication collaborator. Invoked when the API rejects the
/// session; the checkout abandons silently afterwards.
#[async_trait]
pub trait ReauthHandler: Send + Sync {
    async fn reauthenticate(&self);
}
