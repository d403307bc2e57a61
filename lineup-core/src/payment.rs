use lineup_shared::money::Money;
use lineup_shared::pii::Masked;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    RequiresAction,
    Pending,
    Succeeded,
    Failed,
    Canceled,
}

/// Server-declared follow-up step required to complete a payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextAction {
    /// Open the host mini-app payment dialog for this invoice slug.
    OpenInvoice { slug: String },
    /// Navigate to an external checkout page; settlement arrives out-of-band.
    Redirect { url: String },
    /// Nothing left to do, the payment status is already terminal.
    #[default]
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub booking_id: Option<Uuid>,
    pub status: PaymentStatus,
    pub amount: Money,
    pub provider: String,
    #[serde(default)]
    pub next_action: NextAction,
}

/// One funding source inside a payment request, in wire form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "method", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethodRequest {
    Card,
    Certificate { id: String, amount: Money },
    SeasonPass { id: Uuid },
    LoyaltyBalance { amount: Money },
}

/// A single funding method, or an ordered composite applied until the price
/// is covered (fixed-value discounts first, instrument last).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PaymentRequest {
    Single(PaymentMethodRequest),
    Composite(Vec<PaymentMethodRequest>),
}

impl PaymentRequest {
    pub fn methods(&self) -> &[PaymentMethodRequest] {
        match self {
            PaymentRequest::Single(method) => std::slice::from_ref(method),
            PaymentRequest::Composite(methods) => methods,
        }
    }
}

/// Funding sources toggled on in the payment sheet. UI-side input to the
/// composer; the certificate code is masked so selections are loggable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSelection {
    pub certificate: Option<CertificateSelection>,
    pub loyalty: Option<Money>,
    pub season_pass: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSelection {
    pub id: Masked<String>,
    pub balance: Money,
}

/// What a gift certificate is denominated in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateKind {
    Denomination { amount: Money },
    Passes { count: u32 },
}

/// Result of a certificate purchase: the issued certificate plus the payment
/// that funds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateOrder {
    pub certificate_id: String,
    pub payment: Payment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductKind {
    Session,
    SeasonTicket,
    Certificate,
}

impl ProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Session => "session",
            ProductKind::SeasonTicket => "season-ticket",
            ProductKind::Certificate => "certificate",
        }
    }
}
