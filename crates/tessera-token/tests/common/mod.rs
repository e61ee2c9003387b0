//! Test helpers for tessera-token integration tests.
//!
//! Provides an in-memory service registry, key material and wired-up
//! builder/parser pairs.

#![allow(dead_code)]

use std::sync::Arc;
use tessera_services::{
    DefaultAccessStrategyChecker, InMemoryServiceRegistry, RegisteredService, TokenKeySet,
};
use tessera_token::{CipherConfig, CipherSelector, TokenBuilder, TokenParser};

/// HMAC secret used by service-specific key sets.
pub const SERVICE_SECRET: &str = "service-specific-hmac-secret-0123456789";

/// HMAC secret used by the global configuration.
pub const GLOBAL_SECRET: &str = "global-default-hmac-secret-abcdefghijklm";

/// AES-256 key, hex-encoded.
pub const AES_KEY: &str = "4f1a2b3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f708192a3b4c5d6e7f8";

/// Service id of the unprotected application.
pub const APP_SERVICE_ID: i64 = 10;

/// Service id of the application with its own keys.
pub const KEYED_SERVICE_ID: i64 = 20;

/// Initialize logging for tests.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

/// Service without its own keys.
pub fn app_service() -> RegisteredService {
    RegisteredService::new(APP_SERVICE_ID, "App", "https://app\\.example(/.*)?")
}

/// Service that signs and encrypts with its own keys.
pub fn keyed_service() -> RegisteredService {
    RegisteredService::new(KEYED_SERVICE_ID, "Keyed", "https://keyed\\.example(/.*)?")
        .with_token_keys(
            TokenKeySet::signing(SERVICE_SECRET)
                .with_encryption(AES_KEY)
                .with_key_id("keyed-1"),
        )
}

/// Registry holding both test services.
pub fn registry() -> InMemoryServiceRegistry {
    let registry = InMemoryServiceRegistry::new();
    registry.register(app_service()).unwrap();
    registry.register(keyed_service()).unwrap();
    registry
}

/// Global configuration signing with [`GLOBAL_SECRET`].
pub fn global_config() -> CipherConfig {
    CipherConfig::enabled(TokenKeySet::signing(GLOBAL_SECRET).with_key_id("global-1"))
}

/// Builder and parser sharing one cipher selector.
pub fn token_pair(config: &CipherConfig) -> (TokenBuilder, TokenParser) {
    let ciphers = Arc::new(CipherSelector::from_config(config).unwrap());
    let access = Arc::new(DefaultAccessStrategyChecker);
    (
        TokenBuilder::new(Arc::new(registry()), access.clone(), ciphers.clone()),
        TokenParser::new(access, ciphers),
    )
}
