use lineup_core::payment::{NextAction, Payment, PaymentStatus};
use lineup_core::ports::HostRuntime;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

pub const DEFAULT_DIALOG_DEADLINE: Duration = Duration::from_secs(180);

/// Cooperative cancellation for one dialog wait. Clone it, hand one copy to
/// `resolve`, keep the other to cancel from the caller's side. A handle is
/// good for a single checkout attempt.
#[derive(Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        // notify_one stores a permit, so a waiter that registers after this
        // call still wakes up.
        self.inner.notify.notify_one();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.inner.notify.notified().await;
    }
}

/// Terminal outcome of driving a payment's declared next action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Paid,
    Cancelled,
    /// Settlement arrives out-of-band (external redirect, or the provider
    /// is still processing).
    Pending,
    Failed {
        reason: String,
    },
}

/// Progress of one resolution. Every payment starts `Initiated` and moves to
/// `Settled` (no interaction left) or `AwaitingProvider` (dialog/redirect)
/// before reaching a terminal `PaymentOutcome`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolveState {
    Initiated,
    Settled,
    AwaitingProvider,
}

/// Drives a server-declared next action to a terminal outcome.
///
/// Never returns an error: every failure while driving the host dialog is
/// caught, logged and folded into `PaymentOutcome::Failed` so the caller's
/// UI cannot get stuck in a processing state. Overlapping dialog waits for
/// one payment are the caller's responsibility to prevent (the orchestrator
/// flow guard does).
pub struct NextActionResolver {
    host: Arc<dyn HostRuntime>,
    dialog_deadline: Duration,
}

impl NextActionResolver {
    pub fn new(host: Arc<dyn HostRuntime>) -> Self {
        Self::with_deadline(host, DEFAULT_DIALOG_DEADLINE)
    }

    pub fn with_deadline(host: Arc<dyn HostRuntime>, dialog_deadline: Duration) -> Self {
        Self {
            host,
            dialog_deadline,
        }
    }

    pub async fn resolve(&self, payment: &Payment, cancel: &CancelHandle) -> PaymentOutcome {
        let state = match payment.next_action {
            NextAction::None => ResolveState::Settled,
            _ => ResolveState::AwaitingProvider,
        };
        tracing::debug!(
            "Payment {}: {:?} -> {:?}",
            payment.id,
            ResolveState::Initiated,
            state
        );

        match &payment.next_action {
            // Fully settled by non-interactive funding, nothing to drive.
            NextAction::None => Self::terminal_from_status(payment.status),
            NextAction::Redirect { url } => {
                if let Err(err) = self.host.open_external(url).await {
                    tracing::error!("External checkout navigation failed: {}", err);
                    return PaymentOutcome::Failed {
                        reason: err.to_string(),
                    };
                }
                PaymentOutcome::Pending
            }
            NextAction::OpenInvoice { slug } => self.drive_invoice(&payment.id, slug, cancel).await,
        }
    }

    async fn drive_invoice(
        &self,
        payment_id: &str,
        slug: &str,
        cancel: &CancelHandle,
    ) -> PaymentOutcome {
        if !self.host.is_host_environment().await {
            tracing::error!(
                "Payment {} requested the host dialog outside the host container",
                payment_id
            );
            return PaymentOutcome::Failed {
                reason: "payment dialog is only available inside the host app".to_string(),
            };
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Payment {} dialog wait cancelled by caller", payment_id);
                PaymentOutcome::Cancelled
            }
            result = tokio::time::timeout(self.dialog_deadline, self.host.open_invoice(slug)) => {
                match result {
                    Err(_) => {
                        tracing::error!(
                            "Payment {} dialog timed out after {:?}",
                            payment_id,
                            self.dialog_deadline
                        );
                        PaymentOutcome::Failed {
                            reason: format!(
                                "payment dialog timed out after {}s",
                                self.dialog_deadline.as_secs()
                            ),
                        }
                    }
                    Ok(Err(err)) => {
                        tracing::error!("Payment {} dialog failed: {}", payment_id, err);
                        PaymentOutcome::Failed {
                            reason: err.to_string(),
                        }
                    }
                    Ok(Ok(status)) => Self::from_dialog_status(&status),
                }
            }
        }
    }

    /// Maps the host dialog's terminal status string. Unrecognized strings
    /// fail the payment but keep the original string for diagnostics.
    fn from_dialog_status(raw: &str) -> PaymentOutcome {
        match raw {
            "paid" => PaymentOutcome::Paid,
            "cancelled" => PaymentOutcome::Cancelled,
            "pending" => PaymentOutcome::Pending,
            "failed" => PaymentOutcome::Failed {
                reason: "failed".to_string(),
            },
            other => {
                tracing::warn!("Unrecognized payment dialog status '{}'", other);
                PaymentOutcome::Failed {
                    reason: other.to_string(),
                }
            }
        }
    }

    fn terminal_from_status(status: PaymentStatus) -> PaymentOutcome {
        match status {
            PaymentStatus::Succeeded => PaymentOutcome::Paid,
            PaymentStatus::Canceled => PaymentOutcome::Cancelled,
            PaymentStatus::Failed => PaymentOutcome::Failed {
                reason: "payment failed".to_string(),
            },
            PaymentStatus::RequiresAction | PaymentStatus::Pending => PaymentOutcome::Pending,
        }
    }
}
