//! Owner identifier and secret types

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// Plaintext secret as supplied by the user. Wiped from memory on drop.
pub type Secret = Zeroizing<String>;

/// Opaque owner identifier: the Argon2 PHC string of the owner's secret.
///
/// Never chosen by the system, only computed. Salted, so it cannot be
/// recomputed and compared by equality; it is recovered by verification.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Short non-reversible tag for log correlation (the tail of the hash).
    pub fn log_tag(&self) -> &str {
        let start = self.0.len().saturating_sub(8);
        self.0.get(start..).unwrap_or("")
    }
}

// Hash values stay out of logs and debug output.
impl fmt::Debug for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerId(..{})", self.log_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let owner = OwnerId::new("$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$abcdefghijklmnop");
        let printed = format!("{:?}", owner);
        assert!(!printed.contains("argon2id"));
        assert!(printed.ends_with("ijklmnop)"));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let owner = OwnerId::new("hash-value");
        assert_eq!(serde_json::to_string(&owner).unwrap(), "\"hash-value\"");
    }
}
