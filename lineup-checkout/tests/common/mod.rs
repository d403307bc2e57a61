use async_trait::async_trait;
use chrono::{Duration, Utc};
use lineup_checkout::diagnostics::AttemptRecorder;
use lineup_checkout::CheckoutDeps;
use lineup_core::booking::{Booking, BookingFilter, BookingStatus};
use lineup_core::error::{ApiError, ErrorCode};
use lineup_core::idempotency::IdempotencyKey;
use lineup_core::payment::{
    CertificateKind, CertificateOrder, NextAction, Payment, PaymentMethodRequest, PaymentRequest,
    PaymentStatus, ProductKind,
};
use lineup_core::ports::{
    BookingsApi, CreatedBooking, HostError, HostRuntime, Navigator, PaymentsApi, ReauthHandler,
};
use lineup_shared::money::Money;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub fn rub(amount: i64) -> Money {
    Money::new(amount, "RUB")
}

pub fn active_hold(session_id: Uuid, price: Money) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        session_id,
        status: BookingStatus::Hold,
        hold_expires_at: Some(Utc::now() + Duration::minutes(10)),
        price,
    }
}

pub fn invoice_payment(slug: &str, amount: Money) -> Payment {
    Payment {
        id: format!("pay_{}", slug),
        booking_id: None,
        status: PaymentStatus::RequiresAction,
        amount,
        provider: "cloudkassa".to_string(),
        next_action: NextAction::OpenInvoice {
            slug: slug.to_string(),
        },
    }
}

pub fn settled_payment(amount: Money) -> Payment {
    Payment {
        id: "pay_settled".to_string(),
        booking_id: None,
        status: PaymentStatus::Succeeded,
        amount,
        provider: "cloudkassa".to_string(),
        next_action: NextAction::None,
    }
}

pub fn conflict_error() -> ApiError {
    ApiError::Api {
        status: 409,
        code: Some(ErrorCode::ActiveHoldExists),
        message: "user already has an active booking for this session".to_string(),
    }
}

pub fn auth_error() -> ApiError {
    ApiError::Api {
        status: 401,
        code: Some(ErrorCode::AuthRequired),
        message: "session expired".to_string(),
    }
}

/// Bookings port with a scriptable listing sequence. Each `list` call pops
/// the next scripted snapshot; once the script runs dry the static `holds`
/// vector is served.
pub struct MockBookings {
    pub holds: Mutex<Vec<Booking>>,
    pub list_script: Mutex<VecDeque<Vec<Booking>>>,
    pub create_calls: AtomicUsize,
    pub price: Money,
    pub create_error: Mutex<Option<ApiError>>,
}

impl MockBookings {
    pub fn new(price: Money) -> Self {
        Self {
            holds: Mutex::new(Vec::new()),
            list_script: Mutex::new(VecDeque::new()),
            create_calls: AtomicUsize::new(0),
            price,
            create_error: Mutex::new(None),
        }
    }
}

#[async_trait]
impl BookingsApi for MockBookings {
    async fn create_booking(
        &self,
        session_id: Uuid,
        _key: &IdempotencyKey,
    ) -> Result<CreatedBooking, ApiError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.create_error.lock().await.take() {
            return Err(err);
        }
        Ok(CreatedBooking {
            booking: Booking {
                id: Uuid::new_v4(),
                session_id,
                status: BookingStatus::Hold,
                hold_expires_at: None,
                price: self.price.clone(),
            },
            hold_ttl_seconds: Some(900),
        })
    }

    async fn list_my_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, ApiError> {
        let snapshot = match self.list_script.lock().await.pop_front() {
            Some(scripted) => scripted,
            None => self.holds.lock().await.clone(),
        };
        Ok(snapshot
            .into_iter()
            .filter(|b| filter.status.map_or(true, |s| b.status == s))
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct PaymentCall {
    pub target: Option<Uuid>,
    pub key: String,
    pub methods: Vec<PaymentMethodRequest>,
}

/// Payments port that pops scripted responses and records every call with
/// the idempotency key it carried.
pub struct MockPayments {
    pub script: Mutex<VecDeque<Result<Payment, ApiError>>>,
    pub certificate_script: Mutex<VecDeque<Result<CertificateOrder, ApiError>>>,
    pub calls: Mutex<Vec<PaymentCall>>,
}

impl MockPayments {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            certificate_script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub async fn push(&self, result: Result<Payment, ApiError>) {
        self.script.lock().await.push_back(result);
    }

    pub async fn push_certificate(&self, result: Result<CertificateOrder, ApiError>) {
        self.certificate_script.lock().await.push_back(result);
    }

    async fn record(&self, target: Option<Uuid>, key: &IdempotencyKey, request: &PaymentRequest) {
        self.calls.lock().await.push(PaymentCall {
            target,
            key: key.as_str().to_string(),
            methods: request.methods().to_vec(),
        });
    }
}

#[async_trait]
impl PaymentsApi for MockPayments {
    async fn create_booking_payment(
        &self,
        booking_id: Uuid,
        request: &PaymentRequest,
        key: &IdempotencyKey,
    ) -> Result<Payment, ApiError> {
        self.record(Some(booking_id), key, request).await;
        self.script
            .lock()
            .await
            .pop_front()
            .expect("unscripted booking payment call")
    }

    async fn purchase_season_ticket(
        &self,
        plan_id: Uuid,
        request: &PaymentRequest,
        key: &IdempotencyKey,
    ) -> Result<Payment, ApiError> {
        self.record(Some(plan_id), key, request).await;
        self.script
            .lock()
            .await
            .pop_front()
            .expect("unscripted season ticket call")
    }

    async fn purchase_certificate(
        &self,
        _kind: &CertificateKind,
        request: &PaymentRequest,
        key: &IdempotencyKey,
    ) -> Result<CertificateOrder, ApiError> {
        self.record(None, key, request).await;
        self.certificate_script
            .lock()
            .await
            .pop_front()
            .expect("unscripted certificate call")
    }
}

/// Host runtime whose dialog either returns a scripted status or hangs
/// until the deadline/cancellation fires.
pub struct MockHost {
    pub inside: bool,
    pub dialog_status: Option<String>,
    pub invoices: Mutex<Vec<String>>,
    pub external: Mutex<Vec<String>>,
}

impl MockHost {
    pub fn returning(status: &str) -> Self {
        Self {
            inside: true,
            dialog_status: Some(status.to_string()),
            invoices: Mutex::new(Vec::new()),
            external: Mutex::new(Vec::new()),
        }
    }

    pub fn hanging() -> Self {
        Self {
            inside: true,
            dialog_status: None,
            invoices: Mutex::new(Vec::new()),
            external: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl HostRuntime for MockHost {
    async fn is_host_environment(&self) -> bool {
        self.inside
    }

    async fn open_invoice(&self, slug: &str) -> Result<String, HostError> {
        self.invoices.lock().await.push(slug.to_string());
        match &self.dialog_status {
            Some(status) => Ok(status.clone()),
            None => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    async fn open_external(&self, url: &str) -> Result<(), HostError> {
        self.external.lock().await.push(url.to_string());
        Ok(())
    }
}

pub struct MockNavigator {
    pub destinations: Mutex<Vec<(ProductKind, Option<String>)>>,
}

impl MockNavigator {
    pub fn new() -> Self {
        Self {
            destinations: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Navigator for MockNavigator {
    async fn to_success_screen(&self, product: ProductKind, reference: Option<String>) {
        self.destinations.lock().await.push((product, reference));
    }
}

pub struct MockReauth {
    pub calls: AtomicUsize,
}

impl MockReauth {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ReauthHandler for MockReauth {
    async fn reauthenticate(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct TestWorld {
    pub bookings: Arc<MockBookings>,
    pub payments: Arc<MockPayments>,
    pub host: Arc<MockHost>,
    pub navigator: Arc<MockNavigator>,
    pub reauth: Arc<MockReauth>,
    pub recorder: Arc<AttemptRecorder>,
    pub deps: CheckoutDeps,
}

pub fn world_with_host(price: Money, host: MockHost) -> TestWorld {
    let bookings = Arc::new(MockBookings::new(price));
    let payments = Arc::new(MockPayments::new());
    let host = Arc::new(host);
    let navigator = Arc::new(MockNavigator::new());
    let reauth = Arc::new(MockReauth::new());
    let mut deps = CheckoutDeps::new(
        bookings.clone(),
        payments.clone(),
        host.clone(),
        navigator.clone(),
        reauth.clone(),
    );
    deps.dialog_deadline = std::time::Duration::from_millis(500);
    let recorder = deps.recorder.clone();
    TestWorld {
        bookings,
        payments,
        host,
        navigator,
        reauth,
        recorder,
        deps,
    }
}

pub fn world(price: Money) -> TestWorld {
    world_with_host(price, MockHost::returning("paid"))
}
