use serde::Deserialize;
use thiserror::Error;

/// Structured error code carried in the booking API's error body.
///
/// The server's code set is not guaranteed complete; anything unrecognized
/// is preserved verbatim in `Other` and classified as generic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    AuthRequired,
    AmountMismatch,
    ProviderUnavailable,
    InvalidAmount,
    AmountTooLow,
    NoSeats,
    HoldExpired,
    ActiveHoldExists,
    SessionNotFound,
    NotFound,
    Other(String),
}

impl ErrorCode {
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "AUTH_REQUIRED" => ErrorCode::AuthRequired,
            "AMOUNT_MISMATCH" => ErrorCode::AmountMismatch,
            "PROVIDER_UNAVAILABLE" => ErrorCode::ProviderUnavailable,
            "INVALID_AMOUNT" => ErrorCode::InvalidAmount,
            "AMOUNT_TOO_LOW" => ErrorCode::AmountTooLow,
            "NO_SEATS" => ErrorCode::NoSeats,
            "HOLD_EXPIRED" => ErrorCode::HoldExpired,
            "ACTIVE_HOLD_EXISTS" => ErrorCode::ActiveHoldExists,
            "SESSION_NOT_FOUND" => ErrorCode::SessionNotFound,
            "NOT_FOUND" => ErrorCode::NotFound,
            other => ErrorCode::Other(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(ErrorCode::from_wire(&raw))
    }
}

/// Error body shape returned by the booking API:
/// `{"error": {"code": "NO_SEATS", "message": "..."}}`.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub code: Option<ErrorCode>,
    #[serde(default)]
    pub message: String,
}

/// Failure of a booking/payment API call, as seen by the orchestration core.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("api error {status}: {message}")]
    Api {
        status: u16,
        code: Option<ErrorCode>,
        message: String,
    },
    #[error("transport error: {0}")]
    Transport(String),
}

/// Stable failure taxonomy every error is folded into before it reaches the
/// UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Session rejected; abandon silently and defer to re-authentication.
    AuthRequired,
    AmountMismatch,
    ProviderUnavailable,
    InvalidAmount,
    AmountTooLow,
    NoSeats,
    HoldExpired,
    NotFound,
    /// Another unexpired hold already exists; auto-recovered by the
    /// orchestrator, never surfaced directly.
    ConflictExistingHold,
    Generic,
}

/// Total classification: always returns exactly one taxonomy value.
///
/// The structured code is the primary signal. The keyword fallback exists
/// only for legacy responses that carry free text without a code and is
/// deliberately small; misses land in `Generic`.
pub fn classify(error: &ApiError) -> FailureKind {
    match error {
        ApiError::Api {
            code: Some(code), ..
        } => classify_code(code),
        ApiError::Api {
            code: None,
            status,
            message,
        } => classify_legacy(*status, message),
        ApiError::Transport(_) => FailureKind::Generic,
    }
}

fn classify_code(code: &ErrorCode) -> FailureKind {
    match code {
        ErrorCode::AuthRequired => FailureKind::AuthRequired,
        ErrorCode::AmountMismatch => FailureKind::AmountMismatch,
        ErrorCode::ProviderUnavailable => FailureKind::ProviderUnavailable,
        ErrorCode::InvalidAmount => FailureKind::InvalidAmount,
        ErrorCode::AmountTooLow => FailureKind::AmountTooLow,
        ErrorCode::NoSeats => FailureKind::NoSeats,
        ErrorCode::HoldExpired => FailureKind::HoldExpired,
        ErrorCode::ActiveHoldExists => FailureKind::ConflictExistingHold,
        ErrorCode::SessionNotFound | ErrorCode::NotFound => FailureKind::NotFound,
        ErrorCode::Other(_) => FailureKind::Generic,
    }
}

fn classify_legacy(status: u16, message: &str) -> FailureKind {
    let message = message.to_lowercase();
    if message.contains("no seats") || message.contains("sold out") {
        return FailureKind::NoSeats;
    }
    if message.contains("hold expired") || message.contains("booking expired") {
        return FailureKind::HoldExpired;
    }
    if message.contains("active hold") || message.contains("active booking") {
        return FailureKind::ConflictExistingHold;
    }
    if message.contains("amount mismatch") {
        return FailureKind::AmountMismatch;
    }
    if message.contains("provider unavailable") {
        return FailureKind::ProviderUnavailable;
    }
    match status {
        401 | 403 => FailureKind::AuthRequired,
        404 => FailureKind::NotFound,
        409 => FailureKind::ConflictExistingHold,
        502 | 503 | 504 => FailureKind::ProviderUnavailable,
        _ => FailureKind::Generic,
    }
}

/// Localized message key for a failure, or `None` when the failure must stay
/// silent (`AuthRequired` defers to the re-authentication collaborator).
pub fn user_message(kind: FailureKind) -> Option<&'static str> {
    match kind {
        FailureKind::AuthRequired => None,
        FailureKind::AmountMismatch => Some("checkout.error.amount_mismatch"),
        FailureKind::ProviderUnavailable => Some("checkout.error.provider_unavailable"),
        FailureKind::InvalidAmount => Some("checkout.error.invalid_amount"),
        FailureKind::AmountTooLow => Some("checkout.error.amount_too_low"),
        FailureKind::NoSeats => Some("checkout.error.no_seats"),
        FailureKind::HoldExpired => Some("checkout.error.hold_expired"),
        FailureKind::NotFound => Some("checkout.error.not_found"),
        FailureKind::ConflictExistingHold => Some("checkout.error.generic"),
        FailureKind::Generic => Some("checkout.error.generic"),
    }
}
