//! Error types for token operations.
//!
//! Provides explicit error variants for all token build and parse failures.

use tessera_services::ServiceError;
use thiserror::Error;

/// Failures raised by a cipher executor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CipherError {
    /// Key material is missing or malformed.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Signing or encryption failed.
    #[error("Token encoding failed: {0}")]
    Encode(String),

    /// Signature verification or decryption failed, or the input is corrupt.
    #[error("Token decoding failed: {0}")]
    Decode(String),

    /// Cipher configuration is incomplete or inconsistent.
    #[error("Invalid cipher configuration: {detail}")]
    Config {
        /// What is wrong with the configuration.
        detail: String,
    },
}

/// Token error types.
///
/// Each variant maps to a specific failure mode in token building or parsing.
#[derive(Debug, Clone, Error)]
pub enum TokenError {
    /// A claim that must always be present is missing (issuer, expiration).
    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    /// Token text is neither a structured token nor a bare claims set.
    #[error("Unable to parse token: {0}")]
    Parse(String),

    /// A protected token arrived and no matching cipher can verify it.
    #[error("Unsupported token: {0}")]
    UnsupportedToken(String),

    /// No registered service matches any of the candidate audiences.
    #[error("Unable to locate registered service via any of {candidates:?}")]
    ServiceResolution {
        /// The audiences that were tried, in order.
        candidates: Vec<String>,
    },

    /// The service is disabled or the caller is not authorized.
    #[error(transparent)]
    AccessDenied(#[from] ServiceError),

    /// The cipher failed while protecting a token.
    #[error("Cipher failure: {0}")]
    Cipher(#[from] CipherError),

    /// Claims could not be serialized.
    #[error("Claims serialization failed: {0}")]
    Serialization(String),
}

impl TokenError {
    /// Check if this error reports malformed token text.
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(self, TokenError::Parse(_))
    }

    /// Check if this error rejects a protected token without a matching cipher.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, TokenError::UnsupportedToken(_))
    }

    /// Check if this error reports an unresolvable audience.
    #[must_use]
    pub fn is_service_resolution_error(&self) -> bool {
        matches!(self, TokenError::ServiceResolution { .. })
    }

    /// Check if this error denies access to the service.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        matches!(self, TokenError::AccessDenied(e) if e.is_access_denied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TokenError::MissingClaim("iss".to_string());
        assert_eq!(err.to_string(), "Missing required claim: iss");

        let err = TokenError::ServiceResolution {
            candidates: vec!["https://a.example".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unable to locate registered service via any of [\"https://a.example\"]"
        );

        let err = TokenError::Cipher(CipherError::Decode("bad tag".to_string()));
        assert_eq!(err.to_string(), "Cipher failure: Token decoding failed: bad tag");
    }

    #[test]
    fn test_access_denied_is_transparent() {
        let inner = ServiceError::AccessDenied {
            service: "App".to_string(),
            reason: "service is disabled".to_string(),
        };
        let err = TokenError::from(inner.clone());
        assert_eq!(err.to_string(), inner.to_string());
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_predicates() {
        assert!(TokenError::Parse("x".to_string()).is_parse_error());
        assert!(TokenError::UnsupportedToken("x".to_string()).is_unsupported());
        assert!(TokenError::ServiceResolution { candidates: vec![] }.is_service_resolution_error());
        assert!(!TokenError::Parse("x".to_string()).is_unsupported());
        assert!(!TokenError::AccessDenied(ServiceError::DuplicateId(1)).is_access_denied());
    }
}
