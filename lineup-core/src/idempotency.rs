use std::fmt;
use thiserror::Error;
use uuid::Uuid;

const MIN_LEN: usize = 8;
const MAX_LEN: usize = 128;

/// Opaque client-generated token the API uses to de-duplicate side effects.
///
/// Must stay identical across automatic retries of one logical attempt and
/// differ between independently initiated attempts; `derive` encodes both by
/// folding the diagnostic attempt id into the key.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IdempotencyKey(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdempotencyKeyError {
    #[error("idempotency key must be {MIN_LEN}-{MAX_LEN} chars, got {0}")]
    Length(usize),
}

impl IdempotencyKey {
    pub fn new(raw: impl Into<String>) -> Result<Self, IdempotencyKeyError> {
        let raw = raw.into();
        if raw.len() < MIN_LEN || raw.len() > MAX_LEN {
            return Err(IdempotencyKeyError::Length(raw.len()));
        }
        Ok(Self(raw))
    }

    /// Deterministic key for one purchase attempt against one target.
    ///
    /// `scope` is a short product tag ("session-payment"), `target` the id
    /// the call acts on, `attempt` the diagnostic attempt id. The format is
    /// bounded well inside the 8-128 char contract for uuid-sized targets.
    pub fn derive(scope: &str, target: &str, attempt: Uuid) -> Self {
        Self(format!("{}-{}-{}", scope, target, attempt.simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_validation() {
        assert!(IdempotencyKey::new("short").is_err());
        assert!(IdempotencyKey::new("x".repeat(129)).is_err());
        assert!(IdempotencyKey::new("long-enough-key").is_ok());
    }

    #[test]
    fn test_derive_is_stable_for_one_attempt() {
        let attempt = Uuid::new_v4();
        let target = Uuid::new_v4().to_string();
        let a = IdempotencyKey::derive("session-payment", &target, attempt);
        let b = IdempotencyKey::derive("session-payment", &target, attempt);
        assert_eq!(a, b);
    }

    #[test]
    fn test_derive_differs_across_attempts() {
        let target = Uuid::new_v4().to_string();
        let a = IdempotencyKey::derive("session-payment", &target, Uuid::new_v4());
        let b = IdempotencyKey::derive("session-payment", &target, Uuid::new_v4());
        assert_ne!(a, b);
    }

    #[test]
    fn test_derived_key_is_within_length_contract() {
        let key = IdempotencyKey::derive(
            "season-ticket-payment",
            &Uuid::new_v4().to_string(),
            Uuid::new_v4(),
        );
        assert!(IdempotencyKey::new(key.as_str()).is_ok());
    }
}
