use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wrapper for sensitive values (certificate codes, phone numbers) that must
/// never reach logs or the diagnostics buffer in the clear.
///
/// `Debug` and `Display` print a fixed mask, so formatting a whole selection
/// with `{:?}` stays safe. `Serialize` passes the inner value through because
/// API request bodies need the real thing.
#[derive(Clone, Deserialize)]
pub struct Masked<T>(pub T);

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn as_inner(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T: PartialEq> PartialEq for Masked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T: Eq> Eq for Masked<T> {}

/// Masks everything but the last four characters, for operator-facing
/// diagnostic lines ("certificate ****7031").
pub fn mask_tail(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_debug_hides_value() {
        let code = Masked::new("GIFT-2024-7031".to_string());
        assert_eq!(format!("{:?}", code), "********");
        assert_eq!(format!("{}", code), "********");
    }

    #[test]
    fn test_masked_serializes_inner_value() {
        let code = Masked::new("GIFT-2024-7031".to_string());
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, r#""GIFT-2024-7031""#);
    }

    #[test]
    fn test_mask_tail() {
        assert_eq!(mask_tail("GIFT-2024-7031"), "****7031");
        assert_eq!(mask_tail("abc"), "****");
    }
}
