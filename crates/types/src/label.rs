use crate::hashes::LabelHash;
use serde::{Deserialize, Serialize};

/// Shortest label the registrar will lease.
pub const MIN_LABEL_LENGTH: usize = 3;
/// Longest label the registrar will lease.
pub const MAX_LABEL_LENGTH: usize = 63;

/// A single name label, e.g. `alice` in `alice.nc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label(String);

impl Label {
    /// Create a new label from a string. Validity is checked separately.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Get the label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of characters in the label; pricing is keyed on this.
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    /// Whether the label is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validate label format: lowercase alphanumerics and interior hyphens,
    /// within the configured length bounds.
    pub fn is_valid(&self) -> bool {
        let len = self.len();
        (MIN_LABEL_LENGTH..=MAX_LABEL_LENGTH).contains(&len)
            && !self.0.starts_with('-')
            && !self.0.ends_with('-')
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    }

    /// Hash of this label; also the leasehold token identifier.
    pub fn hash(&self) -> LabelHash {
        LabelHash::of(&self.0)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_labels() {
        assert!(Label::new("alice").is_valid());
        assert!(Label::new("abc").is_valid());
        assert!(Label::new("a-1").is_valid());
        assert!(Label::new("x0-9z").is_valid());
    }

    #[test]
    fn rejects_malformed_labels() {
        assert!(!Label::new("").is_valid());
        assert!(!Label::new("ab").is_valid());
        assert!(!Label::new("Alice").is_valid());
        assert!(!Label::new("-abc").is_valid());
        assert!(!Label::new("abc-").is_valid());
        assert!(!Label::new("a.b.c").is_valid());
        assert!(!Label::new(&"x".repeat(64)).is_valid());
    }

    #[test]
    fn hash_matches_labelhash_of_string() {
        assert_eq!(Label::new("alice").hash(), LabelHash::of("alice"));
    }
}
