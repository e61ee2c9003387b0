//! Service tokens for tessera.
//!
//! This crate provides:
//! - [`ClaimsSet`] with the RFC 7519 registered claims plus released attributes
//! - HMAC signing (`jsonwebtoken`) and direct AES-256-GCM encryption of tokens
//! - [`CipherSelector`] choosing between service-specific and global keys
//! - [`TokenBuilder`] issuing tokens for registered services
//! - [`TokenParser`] recovering and verifying claims
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tessera_services::{DefaultAccessStrategyChecker, InMemoryServiceRegistry, RegisteredService};
//! use tessera_token::{CipherSelector, TokenBuilder, TokenParser, TokenRequest};
//!
//! let registry = InMemoryServiceRegistry::new();
//! registry
//!     .register(RegisteredService::new(10, "App", "https://app\\.example(/.*)?"))
//!     .unwrap();
//!
//! let ciphers = Arc::new(CipherSelector::default());
//! let builder = TokenBuilder::new(
//!     Arc::new(registry),
//!     Arc::new(DefaultAccessStrategyChecker),
//!     ciphers.clone(),
//! );
//! let parser = TokenParser::new(Arc::new(DefaultAccessStrategyChecker), ciphers);
//!
//! let request = TokenRequest::builder()
//!     .issuer("https://idp.example")
//!     .audience("https://app.example")
//!     .subject("alice")
//!     .build();
//! let token = builder.build(&request).unwrap();
//!
//! let claims = parser.unpack_any(&token).unwrap();
//! assert_eq!(claims.sub.as_deref(), Some("alice"));
//! ```

mod builder;
mod cipher;
mod claims;
mod config;
mod error;
mod jose;
mod jwe;
mod parser;

// Re-export public API
pub use builder::{
    ClaimsFinalizer, IdentityFinalizer, TokenBuilder, TokenRequest, TokenRequestBuilder,
    DEFAULT_TOKEN_LIFETIME_SECS,
};
pub use cipher::{
    CipherExecutor, CipherSelector, GlobalCipherExecutor, SelectedCipher, ServiceCipherExecutor,
};
pub use claims::{attribute_claim_value, ClaimsSet, ClaimsSetBuilder, REGISTERED_CLAIMS};
pub use config::{CipherConfig, MIN_SIGNING_KEY_LEN};
pub use error::{CipherError, TokenError};
pub use jose::{
    inspect, Envelope, EnvelopeKind, ALG_NONE, CUSTOM_HEADER_REGISTERED_SERVICE_ID,
};
pub use jwe::ContentEncryption;
pub use parser::TokenParser;
