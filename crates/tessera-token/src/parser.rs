//! Token parsing and verification.

use crate::cipher::CipherSelector;
use crate::claims::ClaimsSet;
use crate::error::TokenError;
use crate::jose::{inspect, payload_of, EnvelopeKind};
use std::sync::Arc;
use tessera_services::{AccessStrategyChecker, RegisteredService};
use tracing::{debug, trace, warn};

/// Recovers claims from token text.
///
/// [`TokenParser::parse`] only recovers the format and never verifies
/// anything. [`TokenParser::unpack`] is the verifying path: a protected token
/// is only accepted when a cipher with matching keys decodes it.
#[derive(Clone)]
pub struct TokenParser {
    access: Arc<dyn AccessStrategyChecker>,
    ciphers: Arc<CipherSelector>,
}

impl TokenParser {
    /// Create a parser.
    pub fn new(access: Arc<dyn AccessStrategyChecker>, ciphers: Arc<CipherSelector>) -> Self {
        Self { access, ciphers }
    }

    /// Recover claims from a compact token or a bare JSON claims set.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Parse` when the text is neither.
    pub fn parse(token: &str) -> Result<ClaimsSet, TokenError> {
        match Self::parse_structured(token) {
            Ok(claims) => Ok(claims),
            Err(structured) => {
                trace!(error = %structured, "Unable to parse structured token, trying bare claims set");
                ClaimsSet::from_json(token.trim()).map_err(|bare| {
                    debug!(error = %bare, "Unable to parse token");
                    match bare {
                        TokenError::Parse(detail) => TokenError::Parse(detail),
                        other => TokenError::Parse(other.to_string()),
                    }
                })
            }
        }
    }

    fn parse_structured(token: &str) -> Result<ClaimsSet, TokenError> {
        let envelope = inspect(token)?;
        match envelope.kind {
            EnvelopeKind::Unprotected | EnvelopeKind::Signed => {
                ClaimsSet::from_json(&payload_of(token)?)
            }
            EnvelopeKind::Encrypted => Err(TokenError::Parse(
                "Encrypted token payload cannot be read without decryption".to_string(),
            )),
        }
    }

    /// Verify and unpack a token for `service`.
    ///
    /// # Errors
    ///
    /// - `TokenError::AccessDenied` if the service refuses access
    /// - `TokenError::Parse` if the token text is malformed
    /// - `TokenError::UnsupportedToken` if the token is protected and no
    ///   cipher with matching keys can decode it
    pub fn unpack(
        &self,
        service: Option<&RegisteredService>,
        token: &str,
    ) -> Result<ClaimsSet, TokenError> {
        if let Some(service) = service {
            trace!(service_id = service.id, "Checking service access before unpacking token");
            self.access.check(service)?;
        }

        let envelope = inspect(token)?;
        if !envelope.kind.is_protected() {
            return Self::parse(token);
        }

        let Some(cipher) = self.ciphers.select(service) else {
            warn!(
                service_id = service.map(|s| s.id),
                "Protected token received but no cipher is available"
            );
            return Err(TokenError::UnsupportedToken(
                "Unable to validate token: no matching cipher".to_string(),
            ));
        };

        trace!(
            service_specific = cipher.is_service_specific(),
            "Decoding protected token"
        );
        let decoded = cipher.decode(token).map_err(|e| {
            warn!(
                service_id = service.map(|s| s.id),
                error = %e,
                "Protected token could not be decoded"
            );
            TokenError::UnsupportedToken(format!("Unable to validate token: {e}"))
        })?;
        Self::parse(&decoded)
    }

    /// Verify and unpack a token without a known service.
    pub fn unpack_any(&self, token: &str) -> Result<ClaimsSet, TokenError> {
        self.unpack(None, token)
    }
}

impl std::fmt::Debug for TokenParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenParser")
            .field("ciphers", &self.ciphers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TokenBuilder;
    use chrono::{TimeZone, Utc};
    use tessera_services::{AccessStrategy, DefaultAccessStrategyChecker};

    fn parser() -> TokenParser {
        TokenParser::new(
            Arc::new(DefaultAccessStrategyChecker),
            Arc::new(CipherSelector::default()),
        )
    }

    fn claims() -> ClaimsSet {
        ClaimsSet::builder()
            .issuer("https://idp.example")
            .subject("alice")
            .expiration_time(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_parse_plain_token() {
        let token = TokenBuilder::build_plain(&claims(), None).unwrap();
        assert_eq!(TokenParser::parse(&token).unwrap(), claims());
    }

    #[test]
    fn test_parse_bare_claims_set() {
        let json = claims().to_json().unwrap();
        assert_eq!(TokenParser::parse(&json).unwrap(), claims());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(TokenParser::parse("definitely not a token").unwrap_err().is_parse_error());
        assert!(TokenParser::parse("").unwrap_err().is_parse_error());
    }

    #[test]
    fn test_parse_error_message_is_not_repeated() {
        let message = TokenParser::parse("definitely not a token").unwrap_err().to_string();
        assert_eq!(message.matches("Unable to parse token").count(), 1);
    }

    #[test]
    fn test_parse_rejects_blank_issuer() {
        let err = TokenParser::parse(r#"{"iss":"   ","exp":1}"#).unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_unpack_plain_token() {
        let token = TokenBuilder::build_plain(&claims(), None).unwrap();
        assert_eq!(parser().unpack_any(&token).unwrap(), claims());
    }

    #[test]
    fn test_unpack_checks_access_first() {
        let token = TokenBuilder::build_plain(&claims(), None).unwrap();
        let service = RegisteredService::new(3, "Off", ".*")
            .with_access_strategy(AccessStrategy::disabled());

        assert!(parser().unpack(Some(&service), &token).unwrap_err().is_access_denied());
    }

    #[test]
    fn test_unpack_malformed_token() {
        assert!(parser().unpack_any("a.b").unwrap_err().is_parse_error());
    }
}
