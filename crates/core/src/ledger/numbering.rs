//! Human-readable entry numbers.
//!
//! The number is a display convention over the per-tenant sequence value;
//! uniqueness is enforced on the sequence, never on the formatted string.

use serde::{Deserialize, Serialize};

/// A tenant-scoped entry number such as `JE-00001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryNumber {
    /// Tenant prefix.
    pub prefix: String,
    /// Reserved sequence value, starting at 1.
    pub sequence: i64,
    /// Minimum digits of the zero-padded sequence.
    pub width: usize,
}

impl EntryNumber {
    /// Creates an entry number.
    pub fn new(prefix: impl Into<String>, sequence: i64, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            sequence,
            width,
        }
    }

    /// Recovers the sequence from a formatted number with the given prefix.
    #[must_use]
    pub fn parse(formatted: &str, prefix: &str) -> Option<Self> {
        let digits = formatted.strip_prefix(prefix)?.strip_prefix('-')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let sequence = digits.parse().ok()?;
        Some(Self::new(prefix, sequence, digits.len()))
    }
}

impl std::fmt::Display for EntryNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:0width$}", self.prefix, self.sequence, width = self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("JE", 1, 5, "JE-00001")]
    #[case("JE", 2, 5, "JE-00002")]
    #[case("AP", 123_456, 5, "AP-123456")]
    #[case("GL", 42, 7, "GL-0000042")]
    fn test_display(
        #[case] prefix: &str,
        #[case] sequence: i64,
        #[case] width: usize,
        #[case] expected: &str,
    ) {
        assert_eq!(EntryNumber::new(prefix, sequence, width).to_string(), expected);
    }

    #[test]
    fn test_parse() {
        let number = EntryNumber::parse("JE-00017", "JE").unwrap();
        assert_eq!(number.sequence, 17);
        assert_eq!(number.to_string(), "JE-00017");

        assert!(EntryNumber::parse("JE-", "JE").is_none());
        assert!(EntryNumber::parse("AP-00017", "JE").is_none());
        assert!(EntryNumber::parse("JE-00x17", "JE").is_none());
    }
}
