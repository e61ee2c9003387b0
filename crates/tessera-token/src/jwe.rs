//! Direct AES-256-GCM content encryption for JWE compact tokens.
//!
//! Implements `"alg":"dir"` with `"enc":"A256GCM"` (RFC 7516 / RFC 7518):
//! the shared key is the content encryption key, the encrypted-key segment is
//! empty, and the protected header segment is the additional authenticated data.

use crate::error::CipherError;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use serde_json::{json, Value};

/// Size of the AES-256 key in bytes.
const KEY_SIZE: usize = 32;

/// Size of the GCM nonce (IV) in bytes.
const NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag in bytes.
const TAG_SIZE: usize = 16;

/// Encrypts and decrypts JWE compact tokens with a shared AES-256 key.
#[derive(Clone)]
pub struct ContentEncryption {
    cipher: Aes256Gcm,
}

impl ContentEncryption {
    /// Create from a hex-encoded 256-bit key.
    pub fn from_hex_key(key_hex: &str) -> Result<Self, CipherError> {
        let key_bytes = hex::decode(key_hex.trim())
            .map_err(|e| CipherError::InvalidKey(format!("Invalid encryption key format: {e}")))?;
        Self::from_key(&key_bytes)
    }

    /// Create from raw key bytes.
    pub fn from_key(key: &[u8]) -> Result<Self, CipherError> {
        if key.len() != KEY_SIZE {
            return Err(CipherError::InvalidKey(format!(
                "Invalid encryption key length: expected {KEY_SIZE} bytes, got {}",
                key.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CipherError::InvalidKey(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Encrypt `plaintext` into a JWE compact token.
    ///
    /// `content_type` is set to `"JWT"` when the plaintext is itself a signed token.
    pub fn encrypt(
        &self,
        plaintext: &str,
        key_id: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<String, CipherError> {
        let mut header = json!({ "alg": "dir", "enc": "A256GCM" });
        if let Some(kid) = key_id {
            header["kid"] = Value::from(kid);
        }
        if let Some(cty) = content_type {
            header["cty"] = Value::from(cty);
        }
        let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string());

        let mut iv = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut iv);
        let nonce = Nonce::from_slice(&iv);

        let sealed = self
            .cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: header_b64.as_bytes(),
                },
            )
            .map_err(|e| CipherError::Encode(format!("Encryption failed: {e}")))?;

        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_SIZE);
        Ok(format!(
            "{header_b64}..{}.{}.{}",
            URL_SAFE_NO_PAD.encode(iv),
            URL_SAFE_NO_PAD.encode(ciphertext),
            URL_SAFE_NO_PAD.encode(tag)
        ))
    }

    /// Decrypt a JWE compact token back to its plaintext.
    pub fn decrypt(&self, token: &str) -> Result<String, CipherError> {
        let parts: Vec<&str> = token.trim().split('.').collect();
        let [header_b64, encrypted_key, iv_b64, ciphertext_b64, tag_b64] = parts[..] else {
            return Err(CipherError::Decode(format!(
                "Expected 5 JWE segments, found {}",
                parts.len()
            )));
        };

        let header: Value = URL_SAFE_NO_PAD
            .decode(header_b64)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or_else(|| CipherError::Decode("Invalid JWE header".to_string()))?;
        if header["alg"] != "dir" || header["enc"] != "A256GCM" {
            return Err(CipherError::Decode(format!(
                "Unsupported JWE algorithms alg={} enc={}",
                header["alg"], header["enc"]
            )));
        }
        if !encrypted_key.is_empty() {
            return Err(CipherError::Decode(
                "Direct encryption must not carry an encrypted key".to_string(),
            ));
        }

        let iv = decode_segment(iv_b64, "IV")?;
        if iv.len() != NONCE_SIZE {
            return Err(CipherError::Decode(format!(
                "Invalid IV length: expected {NONCE_SIZE} bytes, got {}",
                iv.len()
            )));
        }
        let mut sealed = decode_segment(ciphertext_b64, "ciphertext")?;
        let tag = decode_segment(tag_b64, "tag")?;
        if tag.len() != TAG_SIZE {
            return Err(CipherError::Decode("Invalid authentication tag".to_string()));
        }
        sealed.extend_from_slice(&tag);

        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(&iv),
                Payload {
                    msg: &sealed,
                    aad: header_b64.as_bytes(),
                },
            )
            .map_err(|e| CipherError::Decode(format!("Decryption failed: {e}")))?;

        String::from_utf8(plaintext)
            .map_err(|e| CipherError::Decode(format!("Plaintext is not UTF-8: {e}")))
    }

    /// Generate a new random encryption key, hex-encoded (for initial setup).
    #[must_use]
    pub fn generate_key() -> String {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        hex::encode(key)
    }
}

impl std::fmt::Debug for ContentEncryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentEncryption")
            .field("cipher", &"[REDACTED]")
            .finish()
    }
}

fn decode_segment(segment: &str, what: &str) -> Result<Vec<u8>, CipherError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| CipherError::Decode(format!("Invalid {what} encoding: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encryption() -> ContentEncryption {
        ContentEncryption::from_hex_key(
            "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f",
        )
        .unwrap()
    }

    #[test]
    fn test_encrypt_decrypt() {
        let enc = encryption();
        let token = enc.encrypt("hello tokens", Some("k1"), None).unwrap();

        assert_eq!(token.split('.').count(), 5);
        assert_eq!(token.split('.').nth(1), Some(""));
        assert_eq!(enc.decrypt(&token).unwrap(), "hello tokens");
    }

    #[test]
    fn test_unique_iv_per_encryption() {
        let enc = encryption();
        let a = enc.encrypt("same", None, None).unwrap();
        let b = enc.encrypt("same", None, None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let token = encryption().encrypt("secret", None, None).unwrap();
        let other = ContentEncryption::from_hex_key(&ContentEncryption::generate_key()).unwrap();

        assert!(matches!(other.decrypt(&token), Err(CipherError::Decode(_))));
    }

    #[test]
    fn test_tampered_header_fails() {
        let enc = encryption();
        let token = enc.encrypt("secret", None, None).unwrap();
        let forged_header = URL_SAFE_NO_PAD.encode(r#"{"alg":"dir","enc":"A256GCM","kid":"x"}"#);
        let rest: Vec<&str> = token.split('.').skip(1).collect();
        let forged = format!("{forged_header}.{}", rest.join("."));

        assert!(enc.decrypt(&forged).is_err());
    }

    #[test]
    fn test_invalid_key_length() {
        assert!(matches!(
            ContentEncryption::from_key(&[0u8; 16]),
            Err(CipherError::InvalidKey(_))
        ));
        assert!(ContentEncryption::from_hex_key("zz").is_err());
    }

    #[test]
    fn test_malformed_token() {
        let enc = encryption();
        assert!(enc.decrypt("a.b.c").is_err());
        assert!(enc.decrypt("....").is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        assert!(format!("{:?}", encryption()).contains("[REDACTED]"));
    }
}
