//! Token build/unpack integration tests.
//!
//! Run with: cargo test -p tessera-token --test token_lifecycle
//!
//! Covers:
//! - Round trips for unprotected, globally protected and service-protected tokens
//! - Cipher mismatch rejection
//! - Unresolved audience rejection
//! - Access denial propagation

mod common;

use chrono::{TimeZone, Utc};
use common::*;
use serde_json::json;
use tessera_services::{AccessStrategy, RegisteredService};
use tessera_token::{
    inspect, CipherConfig, ClaimsSet, EnvelopeKind, TokenError, TokenParser, TokenRequest,
};

fn claims_for(audience: &str) -> ClaimsSet {
    ClaimsSet::builder()
        .issuer("https://idp.example")
        .subject("alice")
        .audience([audience])
        .jwt_id("TOKEN-1")
        .issue_time(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap())
        .expiration_time(Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap())
        .claim("mail", json!("alice@example.org"))
        .claim("groups", json!(["staff", "admins"]))
        .build()
        .unwrap()
}

mod round_trip {
    use super::*;

    #[test]
    fn test_unprotected_round_trip() {
        init_test_logging();
        let (builder, parser) = token_pair(&CipherConfig::disabled());
        let claims = claims_for("https://app.example");

        let token = builder.build_for_service(&app_service(), &claims).unwrap();
        assert_eq!(inspect(&token).unwrap().kind, EnvelopeKind::Unprotected);
        assert_eq!(TokenParser::parse(&token).unwrap(), claims);
        assert_eq!(parser.unpack(Some(&app_service()), &token).unwrap(), claims);
    }

    #[test]
    fn test_global_cipher_round_trip() {
        init_test_logging();
        let (builder, parser) = token_pair(&global_config());
        let claims = claims_for("https://app.example");

        let token = builder.build_for_service(&app_service(), &claims).unwrap();
        let envelope = inspect(&token).unwrap();
        assert_eq!(envelope.kind, EnvelopeKind::Signed);
        assert_eq!(envelope.key_id(), Some("global-1"));

        assert_eq!(parser.unpack(Some(&app_service()), &token).unwrap(), claims);
        assert_eq!(parser.unpack_any(&token).unwrap(), claims);
    }

    #[test]
    fn test_service_cipher_round_trip() {
        init_test_logging();
        let (builder, parser) = token_pair(&global_config());
        let claims = claims_for("https://keyed.example");

        let token = builder.build_for_service(&keyed_service(), &claims).unwrap();
        let envelope = inspect(&token).unwrap();
        assert_eq!(envelope.kind, EnvelopeKind::Encrypted);
        assert_eq!(envelope.key_id(), Some("keyed-1"));

        assert_eq!(parser.unpack(Some(&keyed_service()), &token).unwrap(), claims);
    }

    #[test]
    fn test_encrypted_global_round_trip() {
        let config = CipherConfig::enabled(
            tessera_services::TokenKeySet::signing(GLOBAL_SECRET).with_encryption(AES_KEY),
        );
        let (builder, parser) = token_pair(&config);
        let claims = claims_for("https://app.example");

        let token = builder.build_for_service(&app_service(), &claims).unwrap();
        assert_eq!(inspect(&token).unwrap().kind, EnvelopeKind::Encrypted);
        assert_eq!(parser.unpack_any(&token).unwrap(), claims);
    }

    #[test]
    fn test_times_are_preserved_exactly() {
        let (builder, parser) = token_pair(&global_config());
        let claims = claims_for("https://app.example");

        let token = builder.build_for_service(&app_service(), &claims).unwrap();
        let unpacked = parser.unpack_any(&token).unwrap();
        assert_eq!(unpacked.iat, claims.iat);
        assert_eq!(unpacked.exp, claims.exp);
        assert!(unpacked.is_expired_at(Utc::now()));
    }
}

mod rejection {
    use super::*;

    #[test]
    fn test_service_token_rejected_by_global_cipher() {
        init_test_logging();
        let (builder, _) = token_pair(&global_config());
        let token = builder
            .build_for_service(&keyed_service(), &claims_for("https://keyed.example"))
            .unwrap();

        let (_, parser) = token_pair(&global_config());
        let err = parser.unpack_any(&token).unwrap_err();
        assert!(err.is_unsupported(), "unexpected error: {err}");

        let err = parser.unpack(Some(&app_service()), &token).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_global_token_rejected_by_service_cipher() {
        init_test_logging();
        let (builder, parser) = token_pair(&global_config());
        let token = builder
            .build_for_service(&app_service(), &claims_for("https://keyed.example"))
            .unwrap();
        assert_eq!(inspect(&token).unwrap().key_id(), Some("global-1"));

        // Keyed services never fall back to the global keys.
        let err = parser.unpack(Some(&keyed_service()), &token).unwrap_err();
        assert!(err.is_unsupported(), "unexpected error: {err}");

        assert_eq!(
            parser.unpack(Some(&app_service()), &token).unwrap(),
            claims_for("https://keyed.example")
        );
    }

    #[test]
    fn test_protected_token_without_any_cipher() {
        let (builder, _) = token_pair(&global_config());
        let token = builder
            .build_for_service(&app_service(), &claims_for("https://app.example"))
            .unwrap();

        let (_, parser) = token_pair(&CipherConfig::disabled());
        let err = parser.unpack(Some(&app_service()), &token).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_unresolved_audience_produces_no_token() {
        let (builder, _) = token_pair(&global_config());
        let request = TokenRequest::builder()
            .issuer("https://idp.example")
            .audience("https://nowhere.example")
            .audience("https://elsewhere.example")
            .build();

        match builder.build(&request) {
            Err(TokenError::ServiceResolution { candidates }) => {
                assert_eq!(
                    candidates,
                    vec!["https://nowhere.example", "https://elsewhere.example"]
                );
            }
            other => panic!("expected service resolution error, got {other:?}"),
        }
    }

    #[test]
    fn test_access_denied_propagates_from_build() {
        let (builder, _) = token_pair(&CipherConfig::disabled());
        let service = RegisteredService::new(30, "Closed", "https://closed\\.example")
            .with_access_strategy(AccessStrategy::disabled());
        let request = TokenRequest::builder()
            .issuer("https://idp.example")
            .registered_service(service)
            .build();

        let err = builder.build(&request).unwrap_err();
        assert!(err.is_access_denied());
        assert!(err.to_string().contains("Closed"));
    }

    #[test]
    fn test_missing_issuer_fails_before_resolution() {
        let (builder, _) = token_pair(&CipherConfig::disabled());
        let request = TokenRequest::builder()
            .audience("https://nowhere.example")
            .build();

        assert!(matches!(
            builder.build(&request),
            Err(TokenError::MissingClaim(claim)) if claim == "iss"
        ));
    }
}

mod scenarios {
    use super::*;

    #[test]
    fn test_unprotected_token_names_its_service() {
        init_test_logging();
        let (builder, parser) = token_pair(&CipherConfig::disabled());
        let request = TokenRequest::builder()
            .issuer("https://idp.example")
            .audience("https://app.example")
            .subject("alice")
            .attribute("mail", "alice@example.org")
            .attribute("tessera.authenticationMethod", "password")
            .build();

        let token = builder.build(&request).unwrap();
        let envelope = inspect(&token).unwrap();
        assert_eq!(envelope.kind, EnvelopeKind::Unprotected);
        assert_eq!(envelope.registered_service_id(), Some(APP_SERVICE_ID));

        let claims = parser.unpack_any(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("alice"));
        assert_eq!(claims.string_claim("mail"), Some("alice@example.org"));
        assert!(claims.claim("tessera.authenticationMethod").is_none());
        assert_eq!(claims.jti.as_deref(), Some(request.jwt_id.as_str()));
    }

    #[test]
    fn test_service_without_supporting_cipher_rejects_protected_token() {
        init_test_logging();
        let (builder, _) = token_pair(&global_config());
        let protected = builder
            .build_for_service(&app_service(), &claims_for("https://app.example"))
            .unwrap();

        let (_, parser) = token_pair(&CipherConfig::disabled());
        let err = parser.unpack(Some(&app_service()), &protected).unwrap_err();
        assert!(matches!(err, TokenError::UnsupportedToken(_)));
    }

    #[test]
    fn test_keyed_audience_resolves_to_service_cipher() {
        let (builder, parser) = token_pair(&CipherConfig::disabled());
        let request = TokenRequest::builder()
            .issuer("https://idp.example")
            .audience("https://keyed.example/login")
            .subject("alice")
            .build();

        let token = builder.build(&request).unwrap();
        assert_eq!(inspect(&token).unwrap().kind, EnvelopeKind::Encrypted);
        assert!(parser.unpack_any(&token).unwrap_err().is_unsupported());

        let claims = parser.unpack(Some(&keyed_service()), &token).unwrap();
        assert_eq!(claims.aud, vec!["https://keyed.example/login"]);
    }
}
