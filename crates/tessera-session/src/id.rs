//! Session identifier generation.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix of SSO session identifiers.
pub const SESSION_ID_PREFIX: &str = "TGT";

/// Default node suffix.
pub const DEFAULT_SESSION_ID_SUFFIX: &str = "tessera";

/// Random bytes per identifier (256 bits).
const RANDOM_BYTES: usize = 32;

/// Generates identifiers of the form `TGT-<counter>-<random>-<suffix>`.
///
/// The random part is 256 bits from the OS RNG, base64url encoded. The
/// suffix names the issuing node.
#[derive(Debug)]
pub struct SessionIdGenerator {
    counter: AtomicU64,
    suffix: String,
}

impl Default for SessionIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_ID_SUFFIX)
    }
}

impl SessionIdGenerator {
    /// Create a generator with the given node suffix.
    #[must_use]
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            counter: AtomicU64::new(1),
            suffix: suffix.into(),
        }
    }

    /// Generate a fresh identifier.
    pub fn generate(&self) -> String {
        let count = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut bytes = [0u8; RANDOM_BYTES];
        OsRng.fill_bytes(&mut bytes);
        format!(
            "{SESSION_ID_PREFIX}-{count}-{}-{}",
            URL_SAFE_NO_PAD.encode(bytes),
            self.suffix
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_format() {
        let id = SessionIdGenerator::new("node-a").generate();
        assert!(id.starts_with("TGT-1-"));
        assert!(id.ends_with("-node-a"));
    }

    #[test]
    fn test_counter_increments() {
        let generator = SessionIdGenerator::default();
        assert!(generator.generate().starts_with("TGT-1-"));
        assert!(generator.generate().starts_with("TGT-2-"));
    }

    #[test]
    fn test_uniqueness() {
        let generator = SessionIdGenerator::default();
        let ids: HashSet<String> = (0..1000).map(|_| generator.generate()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
