use lineup_core::error::{classify, ApiError, FailureKind};
use lineup_core::idempotency::IdempotencyKey;
use lineup_core::payment::{CertificateKind, CertificateOrder, Payment, PaymentRequest};
use lineup_core::ports::PaymentsApi;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// An API failure folded into the stable taxonomy, with the original error
/// kept for diagnostics.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct ClassifiedError {
    pub kind: FailureKind,
    #[source]
    pub source: ApiError,
}

impl ClassifiedError {
    pub fn from_api(source: ApiError) -> Self {
        Self {
            kind: classify(&source),
            source,
        }
    }
}

/// Issues the idempotent purchase calls. The key always comes from the
/// caller — it must be identical across automatic retries of one attempt,
/// and this component has no way of knowing attempt boundaries.
pub struct PaymentIntentClient {
    payments: Arc<dyn PaymentsApi>,
}

impl PaymentIntentClient {
    pub fn new(payments: Arc<dyn PaymentsApi>) -> Self {
        Self { payments }
    }

    pub async fn booking_payment(
        &self,
        booking_id: Uuid,
        request: &PaymentRequest,
        key: &IdempotencyKey,
    ) -> Result<Payment, ClassifiedError> {
        self.payments
            .create_booking_payment(booking_id, request, key)
            .await
            .map_err(ClassifiedError::from_api)
    }

    pub async fn season_ticket(
        &self,
        plan_id: Uuid,
        request: &PaymentRequest,
        key: &IdempotencyKey,
    ) -> Result<Payment, ClassifiedError> {
        self.payments
            .purchase_season_ticket(plan_id, request, key)
            .await
            .map_err(ClassifiedError::from_api)
    }

    pub async fn certificate(
        &self,
        kind: &CertificateKind,
        request: &PaymentRequest,
        key: &IdempotencyKey,
    ) -> Result<CertificateOrder, ClassifiedError> {
        self.payments
            .purchase_certificate(kind, request, key)
            .await
            .map_err(ClassifiedError::from_api)
    }
}
