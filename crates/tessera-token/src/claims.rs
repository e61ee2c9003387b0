//! Token claims set.
//!
//! Provides the `ClaimsSet` struct carrying the RFC 7519 registered claims
//! plus the released principal attributes as flat custom claims.

use crate::error::TokenError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tessera_core::{is_reserved_attribute, AttributeMap, AttributeValue};
use tracing::debug;

/// Registered claim names that attributes may never overwrite.
pub const REGISTERED_CLAIMS: [&str; 7] = ["iss", "sub", "aud", "jti", "iat", "exp", "nbf"];

/// Claims carried by a token.
///
/// # Registered Claims (RFC 7519)
///
/// - `iss`: Issuer, always present and non-empty
/// - `sub`: Subject (the principal id)
/// - `aud`: Audience (target service identifiers)
/// - `jti`: Token identifier
/// - `iat`: Issued at (Unix timestamp)
/// - `exp`: Expiration time (Unix timestamp), always present
///
/// Every other key is a released attribute. Single-valued attributes are
/// carried as scalars, multi-valued ones as arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimsSet {
    /// Issuer.
    pub iss: String,

    /// Subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Audience.
    #[serde(
        default,
        deserialize_with = "deserialize_audience",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub aud: Vec<String>,

    /// Token identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Issued at as Unix timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiration time as Unix timestamp.
    pub exp: i64,

    /// Released attributes; only writable through [`ClaimsSet::insert_claim`].
    #[serde(flatten)]
    attributes: Map<String, Value>,
}

impl ClaimsSet {
    /// Create a new builder for constructing a claims set.
    #[must_use]
    pub fn builder() -> ClaimsSetBuilder {
        ClaimsSetBuilder::default()
    }

    /// Serialize to the canonical JSON text carried as token payload.
    pub fn to_json(&self) -> Result<String, TokenError> {
        serde_json::to_string(self).map_err(|e| TokenError::Serialization(e.to_string()))
    }

    /// Parse a bare JSON claims set.
    ///
    /// # Errors
    ///
    /// - `TokenError::Parse` if the text is not a JSON claims object
    /// - `TokenError::MissingClaim` if the issuer is empty or blank
    pub fn from_json(json: &str) -> Result<Self, TokenError> {
        let claims: ClaimsSet =
            serde_json::from_str(json).map_err(|e| TokenError::Parse(e.to_string()))?;
        if claims.iss.trim().is_empty() {
            return Err(TokenError::MissingClaim("iss".to_string()));
        }
        Ok(claims)
    }

    /// Expiration time as a UTC instant.
    #[must_use]
    pub fn expiration_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }

    /// Issue time as a UTC instant.
    #[must_use]
    pub fn issue_time(&self) -> Option<DateTime<Utc>> {
        self.iat.and_then(|iat| Utc.timestamp_opt(iat, 0).single())
    }

    /// Check whether the claims are expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.exp
    }

    /// Look up a custom claim.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Custom claims carried next to the registered ones.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Add or replace a custom claim.
    ///
    /// Registered claim names and reserved attribute keys are refused and
    /// leave the claims untouched. Returns whether the claim was stored.
    pub fn insert_claim(&mut self, name: impl Into<String>, value: Value) -> bool {
        let name = name.into();
        if !is_releasable_claim(&name) {
            debug!(claim = %name, "Refusing custom claim that shadows a registered or reserved name");
            return false;
        }
        self.attributes.insert(name, value);
        true
    }

    /// Read a custom claim as a string, if it is one.
    #[must_use]
    pub fn string_claim(&self, name: &str) -> Option<&str> {
        self.claim(name).and_then(Value::as_str)
    }
}

/// Whether `name` may be carried as a custom claim.
fn is_releasable_claim(name: &str) -> bool {
    !REGISTERED_CLAIMS.contains(&name) && !is_reserved_attribute(name)
}

/// Accept `aud` either as a single string or as an array of strings.
fn deserialize_audience<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Audience {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Audience::deserialize(deserializer)? {
        Audience::One(aud) => vec![aud],
        Audience::Many(aud) => aud,
    })
}

/// Convert an attribute's values to its claim value.
///
/// A single value is flattened to a scalar; instants become RFC 3339 strings.
#[must_use]
pub fn attribute_claim_value(values: &[AttributeValue]) -> Value {
    match values {
        [single] => Value::String(single.as_text()),
        many => Value::Array(many.iter().map(|v| Value::String(v.as_text())).collect()),
    }
}

/// Builder for constructing a claims set.
#[derive(Debug, Default)]
pub struct ClaimsSetBuilder {
    iss: Option<String>,
    sub: Option<String>,
    aud: Vec<String>,
    jti: Option<String>,
    iat: Option<i64>,
    exp: Option<i64>,
    attributes: Map<String, Value>,
}

impl ClaimsSetBuilder {
    /// Set the issuer.
    #[must_use]
    pub fn issuer(mut self, iss: impl Into<String>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    /// Set the subject.
    #[must_use]
    pub fn subject(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Set the audience; duplicates are dropped, order is kept.
    #[must_use]
    pub fn audience<I, S>(mut self, aud: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aud.clear();
        for entry in aud {
            let entry = entry.into();
            if !self.aud.contains(&entry) {
                self.aud.push(entry);
            }
        }
        self
    }

    /// Set the token identifier.
    #[must_use]
    pub fn jwt_id(mut self, jti: impl Into<String>) -> Self {
        self.jti = Some(jti.into());
        self
    }

    /// Set the issue time.
    #[must_use]
    pub fn issue_time(mut self, iat: DateTime<Utc>) -> Self {
        self.iat = Some(iat.timestamp());
        self
    }

    /// Set the expiration time.
    #[must_use]
    pub fn expiration_time(mut self, exp: DateTime<Utc>) -> Self {
        self.exp = Some(exp.timestamp());
        self
    }

    /// Set a custom claim. Registered claim names and reserved keys are ignored.
    #[must_use]
    pub fn claim(mut self, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        if !is_releasable_claim(&name) {
            debug!(claim = %name, "Ignoring attribute that collides with a registered or reserved name");
        } else {
            self.attributes.insert(name, value);
        }
        self
    }

    /// Release attributes as claims, dropping keys under the reserved namespace.
    #[must_use]
    pub fn attributes(mut self, attributes: &AttributeMap) -> Self {
        for (name, values) in attributes {
            if is_reserved_attribute(name) {
                continue;
            }
            self = self.claim(name.clone(), attribute_claim_value(values));
        }
        self
    }

    /// Build the claims set.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::MissingClaim` when the issuer is absent or empty,
    /// or when no expiration time was set.
    pub fn build(self) -> Result<ClaimsSet, TokenError> {
        let iss = self
            .iss
            .filter(|iss| !iss.trim().is_empty())
            .ok_or_else(|| TokenError::MissingClaim("iss".to_string()))?;
        let exp = self
            .exp
            .ok_or_else(|| TokenError::MissingClaim("exp".to_string()))?;

        Ok(ClaimsSet {
            iss,
            sub: self.sub,
            aud: self.aud,
            jti: self.jti,
            iat: self.iat,
            exp,
            attributes: self.attributes,
        })
    }
}
