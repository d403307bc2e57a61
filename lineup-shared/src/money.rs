use serde::{Deserialize, Serialize};
use std::fmt;

/// Monetary value in minor units (kopecks, cents) with its currency code.
///
/// All arithmetic in the checkout core happens on minor units; nothing in
/// this crate ever converts to a fractional major-unit representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount_minor: i64,
    pub currency: String,
}

impl Money {
    pub fn new(amount_minor: i64, currency: impl Into<String>) -> Self {
        Self {
            amount_minor,
            currency: currency.into(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount_minor == 0
    }

    /// Same currency, different amount.
    pub fn with_amount(&self, amount_minor: i64) -> Self {
        Self {
            amount_minor,
            currency: self.currency.clone(),
        }
    }

    /// Subtraction that never goes below zero.
    pub fn saturating_sub(&self, amount_minor: i64) -> i64 {
        (self.amount_minor - amount_minor).max(0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount_minor, self.currency)
    }
}
