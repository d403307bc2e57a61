pub mod compose;
pub mod diagnostics;
pub mod hold;
pub mod intent;
pub mod orchestrator;
pub mod resolver;

pub use compose::compose;
pub use diagnostics::{AttemptHandle, AttemptRecorder};
pub use hold::BookingHoldManager;
pub use intent::{ClassifiedError, PaymentIntentClient};
pub use orchestrator::{
    CertificateCheckout, CertificatePurchase, CheckoutDeps, CheckoutError, CheckoutOutcome,
    DenominationBounds, SeasonTicketCheckout, SeasonTicketPurchase, SessionCheckout,
    SessionPurchase,
};
pub use resolver::{CancelHandle, NextActionResolver, PaymentOutcome};
