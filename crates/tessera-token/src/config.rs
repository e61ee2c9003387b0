//! Global default cipher configuration parsed from environment variables.

use std::env;

use crate::error::CipherError;
use tessera_services::{SigningAlgorithm, TokenKeySet};

/// Minimum HMAC secret length in bytes.
pub const MIN_SIGNING_KEY_LEN: usize = 32;

/// Key material and switches for the global default cipher.
///
/// The default configuration is disabled: tokens for services without their
/// own keys are then issued unprotected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CipherConfig {
    /// Whether the global cipher is active.
    pub enabled: bool,
    /// Signing and encryption keys. Debug output is redacted.
    pub keys: TokenKeySet,
}

impl CipherConfig {
    /// A disabled configuration.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// An enabled configuration using the given key set.
    #[must_use]
    pub fn enabled(keys: TokenKeySet) -> Self {
        Self {
            enabled: true,
            keys,
        }
    }

    /// Parse configuration from environment variables.
    ///
    /// Reads:
    /// - `TESSERA_TOKEN_CIPHER_ENABLED`: "true"/"1" to enable (default: disabled)
    /// - `TESSERA_TOKEN_SIGNING_KEY`: HMAC secret, required when enabled
    /// - `TESSERA_TOKEN_SIGNING_ALG`: HS256, HS384 or HS512 (default: HS512)
    /// - `TESSERA_TOKEN_ENCRYPTION_KEY`: hex-encoded AES-256 key (optional)
    /// - `TESSERA_TOKEN_KEY_ID`: key identifier placed in headers (optional)
    pub fn from_env() -> Result<Self, CipherError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Parse configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CipherError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let enabled = var("TESSERA_TOKEN_CIPHER_ENABLED")
            .is_some_and(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"));
        if !enabled {
            return Ok(Self::disabled());
        }

        let signing_key = var("TESSERA_TOKEN_SIGNING_KEY").ok_or_else(|| CipherError::Config {
            detail: "TESSERA_TOKEN_SIGNING_KEY is required when TESSERA_TOKEN_CIPHER_ENABLED=true"
                .to_string(),
        })?;

        let signing_algorithm = match var("TESSERA_TOKEN_SIGNING_ALG") {
            Some(alg) => SigningAlgorithm::from_str_value(&alg).ok_or_else(|| CipherError::Config {
                detail: format!(
                    "Unknown TESSERA_TOKEN_SIGNING_ALG value '{alg}'. Valid options: HS256, HS384, HS512"
                ),
            })?,
            None => SigningAlgorithm::default(),
        };

        let mut keys = TokenKeySet::signing(signing_key).with_algorithm(signing_algorithm);
        if let Some(encryption_key) = var("TESSERA_TOKEN_ENCRYPTION_KEY") {
            keys = keys.with_encryption(encryption_key);
        }
        if let Some(kid) = var("TESSERA_TOKEN_KEY_ID") {
            keys = keys.with_key_id(kid);
        }

        let config = Self::enabled(keys);
        config.validate()?;
        Ok(config)
    }

    /// Check that an enabled configuration carries usable key material.
    pub fn validate(&self) -> Result<(), CipherError> {
        if !self.enabled {
            return Ok(());
        }
        match &self.keys.signing_key {
            Some(key) if self.keys.signing_enabled => {
                if key.len() < MIN_SIGNING_KEY_LEN {
                    return Err(CipherError::Config {
                        detail: format!(
                            "Signing key must be at least {MIN_SIGNING_KEY_LEN} bytes, got {}",
                            key.len()
                        ),
                    });
                }
            }
            _ => {
                return Err(CipherError::Config {
                    detail: "An enabled cipher requires a signing key".to_string(),
                });
            }
        }
        if self.keys.encryption_enabled && self.keys.encryption_key.is_none() {
            return Err(CipherError::Config {
                detail: "Encryption is enabled without an encryption key".to_string(),
            });
        }
        Ok(())
    }
}
