//! Registered service definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

/// HMAC algorithms accepted for token signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256.
    HS256,
    /// HMAC with SHA-384.
    HS384,
    /// HMAC with SHA-512.
    #[default]
    HS512,
}

impl SigningAlgorithm {
    /// Parse from a string value (case-insensitive).
    #[must_use]
    pub fn from_str_value(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "HS256" => Some(Self::HS256),
            "HS384" => Some(Self::HS384),
            "HS512" => Some(Self::HS512),
            _ => None,
        }
    }
}

/// Signing and encryption keys used to protect tokens.
///
/// Attached to a [`RegisteredService`] to give it its own key material, and
/// reused by the global default cipher configuration.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenKeySet {
    /// Whether tokens are signed.
    #[serde(default)]
    pub signing_enabled: bool,

    /// HMAC secret used for signing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<String>,

    /// HMAC algorithm used for signing.
    #[serde(default)]
    pub signing_algorithm: SigningAlgorithm,

    /// Whether tokens are encrypted.
    #[serde(default)]
    pub encryption_enabled: bool,

    /// Hex-encoded 256-bit AES key used for encryption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,

    /// Key identifier placed in the token header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
}

impl TokenKeySet {
    /// Key set that signs with the given HMAC secret.
    #[must_use]
    pub fn signing(secret: impl Into<String>) -> Self {
        Self {
            signing_enabled: true,
            signing_key: Some(secret.into()),
            ..Default::default()
        }
    }

    /// Add encryption with a hex-encoded AES-256 key.
    #[must_use]
    pub fn with_encryption(mut self, key_hex: impl Into<String>) -> Self {
        self.encryption_enabled = true;
        self.encryption_key = Some(key_hex.into());
        self
    }

    /// Set the signing algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: SigningAlgorithm) -> Self {
        self.signing_algorithm = algorithm;
        self
    }

    /// Set the key identifier.
    #[must_use]
    pub fn with_key_id(mut self, kid: impl Into<String>) -> Self {
        self.key_id = Some(kid.into());
        self
    }

    /// Whether the key set protects tokens at all.
    #[must_use]
    pub fn is_protecting(&self) -> bool {
        (self.signing_enabled && self.signing_key.is_some())
            || (self.encryption_enabled && self.encryption_key.is_some())
    }
}

impl Debug for TokenKeySet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeySet")
            .field("signing_enabled", &self.signing_enabled)
            .field("signing_key", &self.signing_key.as_ref().map(|_| "[REDACTED]"))
            .field("signing_algorithm", &self.signing_algorithm)
            .field("encryption_enabled", &self.encryption_enabled)
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("key_id", &self.key_id)
            .finish()
    }
}

/// Access rules for a registered service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessStrategy {
    /// Whether the service may be used at all.
    pub enabled: bool,

    /// Access is refused before this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,

    /// Access is refused after this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
}

impl Default for AccessStrategy {
    fn default() -> Self {
        Self {
            enabled: true,
            starts_at: None,
            ends_at: None,
        }
    }
}

impl AccessStrategy {
    /// Strategy that refuses all access.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Restrict access to the window `[starts_at, ends_at]`.
    #[must_use]
    pub fn within(starts_at: Option<DateTime<Utc>>, ends_at: Option<DateTime<Utc>>) -> Self {
        Self {
            enabled: true,
            starts_at,
            ends_at,
        }
    }

    /// Evaluate the strategy at `now`; returns the reason when access is refused.
    pub fn evaluate_at(&self, now: DateTime<Utc>) -> Result<(), String> {
        if !self.enabled {
            return Err("service is disabled".to_string());
        }
        if let Some(starts_at) = self.starts_at {
            if now < starts_at {
                return Err(format!("service access starts at {starts_at}"));
            }
        }
        if let Some(ends_at) = self.ends_at {
            if now > ends_at {
                return Err(format!("service access ended at {ends_at}"));
            }
        }
        Ok(())
    }
}

/// A configured consumer of tokens and sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredService {
    /// Numeric service identifier.
    pub id: i64,

    /// Human-readable name.
    pub name: String,

    /// Regular expression matched against service URLs and audiences.
    pub service_id: String,

    /// Lower values are evaluated first when several patterns match.
    #[serde(default)]
    pub evaluation_order: i32,

    /// Access rules.
    #[serde(default)]
    pub access_strategy: AccessStrategy,

    /// Service-specific token keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_keys: Option<TokenKeySet>,
}

impl RegisteredService {
    /// Create an enabled service without its own keys.
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, service_id: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            service_id: service_id.into(),
            evaluation_order: 0,
            access_strategy: AccessStrategy::default(),
            token_keys: None,
        }
    }

    /// Set the evaluation order.
    #[must_use]
    pub fn with_evaluation_order(mut self, order: i32) -> Self {
        self.evaluation_order = order;
        self
    }

    /// Set the access strategy.
    #[must_use]
    pub fn with_access_strategy(mut self, strategy: AccessStrategy) -> Self {
        self.access_strategy = strategy;
        self
    }

    /// Assign service-specific token keys.
    #[must_use]
    pub fn with_token_keys(mut self, keys: TokenKeySet) -> Self {
        self.token_keys = Some(keys);
        self
    }
}
