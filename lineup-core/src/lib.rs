pub mod booking;
pub mod error;
pub mod idempotency;
pub mod payment;
pub mod ports;

pub use booking::{Booking, BookingFilter, BookingStatus};
pub use error::{classify, user_message, ApiError, ErrorCode, FailureKind};
pub use idempotency::IdempotencyKey;
pub use payment::{
    CertificateKind, CertificateOrder, MethodSelection, NextAction, Payment, PaymentMethodRequest,
    PaymentRequest, PaymentStatus, ProductKind,
};
pub use ports::{BookingsApi, CreatedBooking, HostError, HostRuntime, Navigator, PaymentsApi, ReauthHandler};
