use uuid::Uuid;

/// Logged when a checkout reaches terminal success (paid, or pending on an
/// external redirect whose settlement arrives out-of-band).
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct CheckoutSettledEvent {
    pub product: String,
    pub target_id: Option<Uuid>,
    pub amount_minor: i64,
    pub currency: String,
    pub timestamp: i64,
}

/// Logged when a checkout fails terminally after at least one network call.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct CheckoutFailedEvent {
    pub product: String,
    pub target_id: Option<Uuid>,
    pub reason: String,
    pub timestamp: i64,
}
