use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

pub const MAX_ATTEMPTS: usize = 20;
pub const MAX_EVENTS: usize = 50;

/// One recorded purchase attempt. Postmortem material only; nothing in the
/// orchestration path reads these back for control flow.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PaymentAttempt {
    pub attempt_id: Uuid,
    pub attempt_number: u64,
    pub context: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub success: Option<bool>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DiagnosticEvent {
    pub attempt_id: Uuid,
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Token for one in-flight attempt. `finish` takes it by value, so an
/// attempt cannot be ended twice and there is no ambient "current attempt"
/// pointer — concurrent attempts stay independent.
#[derive(Debug)]
pub struct AttemptHandle {
    attempt_id: Uuid,
}

impl AttemptHandle {
    pub fn id(&self) -> Uuid {
        self.attempt_id
    }
}

/// Bounded, append-only log of purchase attempts and structured events.
/// Oldest entries are evicted once the caps are reached.
pub struct AttemptRecorder {
    attempts: RwLock<VecDeque<PaymentAttempt>>,
    events: RwLock<VecDeque<DiagnosticEvent>>,
    counter: AtomicU64,
}

impl AttemptRecorder {
    pub fn new() -> Self {
        Self {
            attempts: RwLock::new(VecDeque::with_capacity(MAX_ATTEMPTS)),
            events: RwLock::new(VecDeque::with_capacity(MAX_EVENTS)),
            counter: AtomicU64::new(0),
        }
    }

    pub async fn start_attempt(&self, context: &str) -> AttemptHandle {
        let attempt_id = Uuid::new_v4();
        let attempt_number = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let mut attempts = self.attempts.write().await;
        if attempts.len() == MAX_ATTEMPTS {
            attempts.pop_front();
        }
        attempts.push_back(PaymentAttempt {
            attempt_id,
            attempt_number,
            context: context.to_string(),
            started_at: Utc::now(),
            ended_at: None,
            success: None,
            error: None,
        });
        AttemptHandle { attempt_id }
    }

    pub async fn log(&self, handle: &AttemptHandle, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("Attempt {}: {}", handle.attempt_id, message);
        let mut events = self.events.write().await;
        if events.len() == MAX_EVENTS {
            events.pop_front();
        }
        events.push_back(DiagnosticEvent {
            attempt_id: handle.attempt_id,
            at: Utc::now(),
            message,
        });
    }

    /// Ends the attempt. Consumes the handle; an attempt already evicted by
    /// the ring buffer is silently skipped.
    pub async fn finish(&self, handle: AttemptHandle, success: bool, error: Option<String>) {
        let mut attempts = self.attempts.write().await;
        if let Some(attempt) = attempts
            .iter_mut()
            .find(|a| a.attempt_id == handle.attempt_id)
        {
            attempt.ended_at = Some(Utc::now());
            attempt.success = Some(success);
            attempt.error = error;
        }
    }

    pub async fn attempts(&self) -> Vec<PaymentAttempt> {
        self.attempts.read().await.iter().cloned().collect()
    }

    pub async fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.read().await.iter().cloned().collect()
    }
}

impl Default for AttemptRecorder {
    fn default() -> Self {
        Self::new()
    }
}
