use crate::compose::compose;
use crate::diagnostics::{AttemptHandle, AttemptRecorder};
use crate::hold::BookingHoldManager;
use crate::intent::{ClassifiedError, PaymentIntentClient};
use crate::resolver::{CancelHandle, NextActionResolver, PaymentOutcome, DEFAULT_DIALOG_DEADLINE};
use chrono::Utc;
use lineup_core::booking::Booking;
use lineup_core::error::{classify, user_message, FailureKind};
use lineup_core::idempotency::IdempotencyKey;
use lineup_core::payment::{
    CertificateKind, MethodSelection, Payment, PaymentRequest, ProductKind,
};
use lineup_core::ports::{BookingsApi, HostRuntime, Navigator, PaymentsApi, ReauthHandler};
use lineup_shared::events::{CheckoutFailedEvent, CheckoutSettledEvent};
use lineup_shared::money::Money;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

const GENERIC_MESSAGE_KEY: &str = "checkout.error.generic";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CheckoutError {
    /// A checkout for this product is already in flight; the caller must
    /// wait for it instead of stacking a second dialog wait.
    #[error("another checkout is already in progress")]
    AlreadyProcessing,
}

/// Terminal result of one `process` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Paid; navigation to the success screen has been handed off.
    Completed,
    /// Settlement arrives out-of-band (external redirect or provider still
    /// processing). Not an error.
    Pending,
    Cancelled,
    /// The API rejected the session. No message is surfaced; the re-auth
    /// collaborator has been invoked.
    AbandonedForAuth,
    Failed {
        message_key: &'static str,
    },
}

/// The single UI-facing error message slot. Cleared at the start of every
/// attempt so stale messages never outlive a retry.
struct ErrorSlot {
    message: RwLock<Option<&'static str>>,
}

impl ErrorSlot {
    fn new() -> Self {
        Self {
            message: RwLock::new(None),
        }
    }

    async fn clear(&self) {
        *self.message.write().await = None;
    }

    async fn set(&self, key: &'static str) {
        *self.message.write().await = Some(key);
    }

    async fn current(&self) -> Option<&'static str> {
        *self.message.read().await
    }
}

/// Explicit idle -> running -> idle transition. The permit flips the flag
/// back on drop, so every exit path releases it.
struct FlowGuard {
    running: Arc<AtomicBool>,
}

impl FlowGuard {
    fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    fn try_begin(&self) -> Option<FlowPermit> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| FlowPermit {
                running: Arc::clone(&self.running),
            })
    }
}

struct FlowPermit {
    running: Arc<AtomicBool>,
}

impl Drop for FlowPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// State every product checkout shares: mutual exclusion, the error slot,
/// diagnostics, and the terminal-outcome bookkeeping.
struct FlowController {
    product: ProductKind,
    guard: FlowGuard,
    error_slot: ErrorSlot,
    recorder: Arc<AttemptRecorder>,
    navigator: Arc<dyn Navigator>,
    reauth: Arc<dyn ReauthHandler>,
}

impl FlowController {
    fn new(
        product: ProductKind,
        recorder: Arc<AttemptRecorder>,
        navigator: Arc<dyn Navigator>,
        reauth: Arc<dyn ReauthHandler>,
    ) -> Self {
        Self {
            product,
            guard: FlowGuard::new(),
            error_slot: ErrorSlot::new(),
            recorder,
            navigator,
            reauth,
        }
    }

    fn try_begin(&self) -> Result<FlowPermit, CheckoutError> {
        self.guard
            .try_begin()
            .ok_or(CheckoutError::AlreadyProcessing)
    }

    /// Local validation failure: sets the error slot without starting an
    /// attempt or touching the network.
    async fn local_failure_key(&self, message_key: &'static str) -> CheckoutOutcome {
        self.error_slot.set(message_key).await;
        CheckoutOutcome::Failed { message_key }
    }

    async fn local_failure(&self, kind: FailureKind) -> CheckoutOutcome {
        self.local_failure_key(user_message(kind).unwrap_or(GENERIC_MESSAGE_KEY))
            .await
    }

    /// Classified failure after the attempt started. Ends the attempt,
    /// surfaces exactly one message, or abandons silently for re-auth.
    async fn failure(
        &self,
        attempt: AttemptHandle,
        kind: FailureKind,
        detail: String,
        target_id: Option<Uuid>,
    ) -> CheckoutOutcome {
        tracing::error!(
            "{} checkout failed ({:?}): {}",
            self.product.as_str(),
            kind,
            detail
        );
        self.recorder
            .log(&attempt, format!("failed ({:?}): {}", kind, detail))
            .await;
        self.recorder
            .finish(attempt, false, Some(format!("{:?}: {}", kind, detail)))
            .await;

        let event = CheckoutFailedEvent {
            product: self.product.as_str().to_string(),
            target_id,
            reason: format!("{:?}", kind),
            timestamp: Utc::now().timestamp(),
        };
        if let Ok(payload) = serde_json::to_string(&event) {
            tracing::info!("checkout failed: {}", payload);
        }

        if kind == FailureKind::AuthRequired {
            self.reauth.reauthenticate().await;
            return CheckoutOutcome::AbandonedForAuth;
        }

        let message_key = user_message(kind).unwrap_or(GENERIC_MESSAGE_KEY);
        self.error_slot.set(message_key).await;
        CheckoutOutcome::Failed { message_key }
    }

    /// Folds the resolver's terminal outcome into the checkout result,
    /// ending the attempt exactly once on every branch.
    async fn finish_terminal(
        &self,
        attempt: AttemptHandle,
        target_id: Option<Uuid>,
        amount: &Money,
        reference: Option<String>,
        outcome: PaymentOutcome,
    ) -> CheckoutOutcome {
        match outcome {
            PaymentOutcome::Paid => {
                self.recorder.finish(attempt, true, None).await;
                let event = CheckoutSettledEvent {
                    product: self.product.as_str().to_string(),
                    target_id,
                    amount_minor: amount.amount_minor,
                    currency: amount.currency.clone(),
                    timestamp: Utc::now().timestamp(),
                };
                if let Ok(payload) = serde_json::to_string(&event) {
                    tracing::info!("checkout settled: {}", payload);
                }
                self.navigator
                    .to_success_screen(self.product, reference)
                    .await;
                CheckoutOutcome::Completed
            }
            PaymentOutcome::Pending => {
                self.recorder
                    .log(&attempt, "settlement pending, arrives out-of-band")
                    .await;
                self.recorder.finish(attempt, true, None).await;
                CheckoutOutcome::Pending
            }
            PaymentOutcome::Cancelled => {
                self.recorder
                    .finish(attempt, false, Some("cancelled by user".to_string()))
                    .await;
                CheckoutOutcome::Cancelled
            }
            PaymentOutcome::Failed { reason } => {
                self.failure(attempt, FailureKind::Generic, reason, target_id)
                    .await
            }
        }
    }
}

/// Everything a product checkout needs from the outside world.
#[derive(Clone)]
pub struct CheckoutDeps {
    pub bookings: Arc<dyn BookingsApi>,
    pub payments: Arc<dyn PaymentsApi>,
    pub host: Arc<dyn HostRuntime>,
    pub navigator: Arc<dyn Navigator>,
    pub reauth: Arc<dyn ReauthHandler>,
    pub recorder: Arc<AttemptRecorder>,
    pub dialog_deadline: Duration,
}

impl CheckoutDeps {
    pub fn new(
        bookings: Arc<dyn BookingsApi>,
        payments: Arc<dyn PaymentsApi>,
        host: Arc<dyn HostRuntime>,
        navigator: Arc<dyn Navigator>,
        reauth: Arc<dyn ReauthHandler>,
    ) -> Self {
        Self {
            bookings,
            payments,
            host,
            navigator,
            reauth,
            recorder: Arc::new(AttemptRecorder::new()),
            dialog_deadline: DEFAULT_DIALOG_DEADLINE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionPurchase {
    pub session_id: Uuid,
    pub methods: MethodSelection,
}

#[derive(Debug, Clone)]
pub struct SeasonTicketPurchase {
    pub plan_id: Option<Uuid>,
    pub price: Money,
    pub methods: MethodSelection,
}

/// Denomination limits for gift certificates, supplied by the product data
/// the page already holds.
#[derive(Debug, Clone)]
pub struct DenominationBounds {
    pub min: Money,
    pub max: Option<Money>,
}

#[derive(Debug, Clone)]
pub struct CertificatePurchase {
    pub kind: Option<CertificateKind>,
    pub price: Money,
    pub bounds: DenominationBounds,
    pub methods: MethodSelection,
}

/// Single-session purchase: hold, pay, drive the next action.
pub struct SessionCheckout {
    flow: FlowController,
    holds: BookingHoldManager,
    intents: PaymentIntentClient,
    resolver: NextActionResolver,
}

impl SessionCheckout {
    pub fn new(deps: CheckoutDeps) -> Self {
        Self {
            flow: FlowController::new(
                ProductKind::Session,
                Arc::clone(&deps.recorder),
                Arc::clone(&deps.navigator),
                Arc::clone(&deps.reauth),
            ),
            holds: BookingHoldManager::new(Arc::clone(&deps.bookings)),
            intents: PaymentIntentClient::new(Arc::clone(&deps.payments)),
            resolver: NextActionResolver::with_deadline(
                Arc::clone(&deps.host),
                deps.dialog_deadline,
            ),
        }
    }

    pub async fn current_error(&self) -> Option<&'static str> {
        self.flow.error_slot.current().await
    }

    pub async fn process(
        &self,
        purchase: SessionPurchase,
        cancel: &CancelHandle,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let _permit = self.flow.try_begin()?;
        self.flow.error_slot.clear().await;

        let attempt = self.flow.recorder.start_attempt("session").await;

        // 1. Make sure a live hold exists; reusing one avoids a double seat
        // decrement.
        let booking_key = IdempotencyKey::derive(
            "session-booking",
            &purchase.session_id.to_string(),
            attempt.id(),
        );
        let booking = match self
            .holds
            .ensure_booking(purchase.session_id, &booking_key)
            .await
        {
            Ok(booking) => booking,
            Err(err) => {
                let kind = classify(&err);
                return Ok(self
                    .flow
                    .failure(attempt, kind, err.to_string(), Some(purchase.session_id))
                    .await);
            }
        };
        self.flow
            .recorder
            .log(&attempt, format!("hold {} ready", booking.id))
            .await;

        // 2. Compose funding against the server-confirmed price.
        let request = compose(&purchase.methods, &booking.price);

        // 3. Create the payment, recovering once from a stale-hold conflict.
        let payment = match self
            .create_payment_with_recovery(purchase.session_id, &booking, &request, &attempt)
            .await
        {
            Ok(payment) => payment,
            Err(err) => {
                return Ok(self
                    .flow
                    .failure(attempt, err.kind, err.to_string(), Some(purchase.session_id))
                    .await);
            }
        };

        // 4. Drive the declared next action to a terminal outcome.
        let outcome = self.resolver.resolve(&payment, cancel).await;
        Ok(self
            .flow
            .finish_terminal(
                attempt,
                Some(booking.id),
                &booking.price,
                Some(booking.id.to_string()),
                outcome,
            )
            .await)
    }

    /// One conflict is recoverable: the server refusing the payment because
    /// another unexpired hold exists. Look that hold up and retry against it
    /// once instead of surfacing the conflict.
    async fn create_payment_with_recovery(
        &self,
        session_id: Uuid,
        booking: &Booking,
        request: &PaymentRequest,
        attempt: &AttemptHandle,
    ) -> Result<Payment, ClassifiedError> {
        let key =
            IdempotencyKey::derive("session-payment", &booking.id.to_string(), attempt.id());
        match self.intents.booking_payment(booking.id, request, &key).await {
            Ok(payment) => Ok(payment),
            Err(err) if err.kind == FailureKind::ConflictExistingHold => {
                tracing::warn!(
                    "Payment for booking {} hit an existing-hold conflict, recovering",
                    booking.id
                );
                self.flow
                    .recorder
                    .log(attempt, "existing-hold conflict, retrying against current hold")
                    .await;
                let existing = self
                    .holds
                    .find_active_hold(session_id)
                    .await
                    .map_err(ClassifiedError::from_api)?;
                // Nothing to recover against: keep the original conflict.
                let existing = existing.ok_or(err)?;
                let retry_key = IdempotencyKey::derive(
                    "session-payment",
                    &existing.id.to_string(),
                    attempt.id(),
                );
                self.intents
                    .booking_payment(existing.id, request, &retry_key)
                    .await
            }
            Err(err) => Err(err),
        }
    }
}

/// Season-ticket plan purchase.
pub struct SeasonTicketCheckout {
    flow: FlowController,
    intents: PaymentIntentClient,
    resolver: NextActionResolver,
}

impl SeasonTicketCheckout {
    pub fn new(deps: CheckoutDeps) -> Self {
        Self {
            flow: FlowController::new(
                ProductKind::SeasonTicket,
                Arc::clone(&deps.recorder),
                Arc::clone(&deps.navigator),
                Arc::clone(&deps.reauth),
            ),
            intents: PaymentIntentClient::new(Arc::clone(&deps.payments)),
            resolver: NextActionResolver::with_deadline(
                Arc::clone(&deps.host),
                deps.dialog_deadline,
            ),
        }
    }

    pub async fn current_error(&self) -> Option<&'static str> {
        self.flow.error_slot.current().await
    }

    pub async fn process(
        &self,
        purchase: SeasonTicketPurchase,
        cancel: &CancelHandle,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let _permit = self.flow.try_begin()?;
        self.flow.error_slot.clear().await;

        // Local validation: a plan must be picked before anything leaves
        // the device.
        let Some(plan_id) = purchase.plan_id else {
            return Ok(self
                .flow
                .local_failure_key("checkout.error.plan_not_selected")
                .await);
        };

        let attempt = self.flow.recorder.start_attempt("season-ticket").await;

        let request = compose(&purchase.methods, &purchase.price);
        let key = IdempotencyKey::derive(
            "season-ticket-payment",
            &plan_id.to_string(),
            attempt.id(),
        );
        let payment = match self.intents.season_ticket(plan_id, &request, &key).await {
            Ok(payment) => payment,
            Err(err) => {
                return Ok(self
                    .flow
                    .failure(attempt, err.kind, err.to_string(), Some(plan_id))
                    .await);
            }
        };

        let outcome = self.resolver.resolve(&payment, cancel).await;
        Ok(self
            .flow
            .finish_terminal(
                attempt,
                Some(plan_id),
                &purchase.price,
                Some(plan_id.to_string()),
                outcome,
            )
            .await)
    }
}

/// Gift-certificate purchase.
pub struct CertificateCheckout {
    flow: FlowController,
    intents: PaymentIntentClient,
    resolver: NextActionResolver,
}

impl CertificateCheckout {
    pub fn new(deps: CheckoutDeps) -> Self {
        Self {
            flow: FlowController::new(
                ProductKind::Certificate,
                Arc::clone(&deps.recorder),
                Arc::clone(&deps.navigator),
                Arc::clone(&deps.reauth),
            ),
            intents: PaymentIntentClient::new(Arc::clone(&deps.payments)),
            resolver: NextActionResolver::with_deadline(
                Arc::clone(&deps.host),
                deps.dialog_deadline,
            ),
        }
    }

    pub async fn current_error(&self) -> Option<&'static str> {
        self.flow.error_slot.current().await
    }

    pub async fn process(
        &self,
        purchase: CertificatePurchase,
        cancel: &CancelHandle,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let _permit = self.flow.try_begin()?;
        self.flow.error_slot.clear().await;

        // Local validation: denomination bounds are checked before any
        // network call.
        let Some(kind) = purchase.kind.clone() else {
            return Ok(self
                .flow
                .local_failure_key("checkout.error.certificate_not_selected")
                .await);
        };
        if let CertificateKind::Denomination { amount } = &kind {
            if amount.amount_minor <= 0 {
                return Ok(self.flow.local_failure(FailureKind::InvalidAmount).await);
            }
            if amount.amount_minor < purchase.bounds.min.amount_minor {
                return Ok(self.flow.local_failure(FailureKind::AmountTooLow).await);
            }
            if let Some(max) = &purchase.bounds.max {
                if amount.amount_minor > max.amount_minor {
                    return Ok(self.flow.local_failure(FailureKind::InvalidAmount).await);
                }
            }
        }

        let attempt = self.flow.recorder.start_attempt("certificate").await;

        let request = compose(&purchase.methods, &purchase.price);
        let kind_tag = match &kind {
            CertificateKind::Denomination { .. } => "denomination",
            CertificateKind::Passes { .. } => "passes",
        };
        let key = IdempotencyKey::derive("certificate-purchase", kind_tag, attempt.id());
        let order = match self.intents.certificate(&kind, &request, &key).await {
            Ok(order) => order,
            Err(err) => {
                return Ok(self.flow.failure(attempt, err.kind, err.to_string(), None).await);
            }
        };

        let outcome = self.resolver.resolve(&order.payment, cancel).await;
        Ok(self
            .flow
            .finish_terminal(
                attempt,
                None,
                &purchase.price,
                Some(order.certificate_id),
                outcome,
            )
            .await)
    }
}
