//! Compact JOSE envelope handling.
//!
//! Tokens travel as dot-delimited compact serializations:
//!
//! - unprotected: `header.payload.` with `"alg":"none"`
//! - signed (JWS): `header.payload.signature`
//! - encrypted (JWE): `header.encrypted_key.iv.ciphertext.tag`
//!
//! This module classifies a token by its envelope without verifying it, and
//! produces unprotected tokens.

use crate::error::TokenError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{Map, Value};

/// Custom header naming the registered service that owns an unprotected token.
pub const CUSTOM_HEADER_REGISTERED_SERVICE_ID: &str = "RegisteredServiceId";

/// Algorithm name declared by unprotected tokens.
pub const ALG_NONE: &str = "none";

/// Protection state of a token, read from its envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// No cryptographic protection.
    Unprotected,
    /// JWS compact serialization.
    Signed,
    /// JWE compact serialization.
    Encrypted,
}

impl EnvelopeKind {
    /// Whether the token claims any cryptographic protection.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        !matches!(self, EnvelopeKind::Unprotected)
    }
}

/// A classified token envelope.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Protection state.
    pub kind: EnvelopeKind,
    /// Decoded protected header.
    pub header: Map<String, Value>,
}

impl Envelope {
    /// The declared algorithm.
    #[must_use]
    pub fn algorithm(&self) -> Option<&str> {
        self.header.get("alg").and_then(Value::as_str)
    }

    /// The declared key identifier.
    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        self.header.get("kid").and_then(Value::as_str)
    }

    /// The owning service id carried by unprotected tokens.
    #[must_use]
    pub fn registered_service_id(&self) -> Option<i64> {
        self.header
            .get(CUSTOM_HEADER_REGISTERED_SERVICE_ID)
            .and_then(Value::as_i64)
    }
}

/// Classify a token by its envelope.
///
/// # Errors
///
/// Returns `TokenError::Parse` if the text is not a compact JWS, JWE or
/// unsecured token.
pub fn inspect(token: &str) -> Result<Envelope, TokenError> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    let header = decode_header(parts[0])?;
    let alg = header
        .get("alg")
        .and_then(Value::as_str)
        .ok_or_else(|| TokenError::Parse("Token header has no algorithm".to_string()))?;

    let kind = match parts.len() {
        3 if alg == ALG_NONE => {
            if !parts[2].is_empty() {
                return Err(TokenError::Parse(
                    "Unsecured token carries a signature".to_string(),
                ));
            }
            EnvelopeKind::Unprotected
        }
        3 => EnvelopeKind::Signed,
        5 if header.contains_key("enc") => EnvelopeKind::Encrypted,
        5 => {
            return Err(TokenError::Parse(
                "Encrypted token header has no content encryption".to_string(),
            ))
        }
        n => {
            return Err(TokenError::Parse(format!(
                "Expected 3 or 5 token segments, found {n}"
            )))
        }
    };

    Ok(Envelope { kind, header })
}

/// Read the payload of a signed or unprotected token without verifying it.
pub fn payload_of(token: &str) -> Result<String, TokenError> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::Parse(
            "Token payload is not readable without decryption".to_string(),
        ));
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|e| TokenError::Parse(format!("Invalid payload encoding: {e}")))?;
    String::from_utf8(bytes).map_err(|e| TokenError::Parse(format!("Payload is not UTF-8: {e}")))
}

/// Serialize an unprotected token: `base64url(header).base64url(payload).`
pub fn encode_unprotected(header: &Map<String, Value>, payload: &str) -> Result<String, TokenError> {
    let header_json =
        serde_json::to_string(header).map_err(|e| TokenError::Serialization(e.to_string()))?;
    Ok(format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(payload)
    ))
}

/// Header for an unprotected token, optionally naming the owning service.
#[must_use]
pub fn unprotected_header(registered_service_id: Option<i64>) -> Map<String, Value> {
    let mut header = Map::new();
    header.insert("alg".to_string(), Value::String(ALG_NONE.to_string()));
    header.insert("typ".to_string(), Value::String("JWT".to_string()));
    if let Some(id) = registered_service_id {
        header.insert(
            CUSTOM_HEADER_REGISTERED_SERVICE_ID.to_string(),
            Value::from(id),
        );
    }
    header
}

fn decode_header(segment: &str) -> Result<Map<String, Value>, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::Parse(format!("Invalid header encoding: {e}")))?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(header)) => Ok(header),
        Ok(_) => Err(TokenError::Parse("Token header is not an object".to_string())),
        Err(e) => Err(TokenError::Parse(format!("Invalid header JSON: {e}"))),
    }
}
