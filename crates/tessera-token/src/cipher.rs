//! Token cipher executors.
//!
//! A cipher executor turns a claims JSON payload into a protected token and
//! back. Two executors exist:
//!
//! - [`ServiceCipherExecutor`] uses the key set attached to a registered service
//! - [`GlobalCipherExecutor`] uses the deployment-wide [`CipherConfig`]
//!
//! [`CipherSelector`] picks between them: the service's own keys win, the
//! global executor is the fallback, and `None` means no protection is available.

use crate::config::{CipherConfig, MIN_SIGNING_KEY_LEN};
use crate::error::CipherError;
use crate::jwe::ContentEncryption;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use tessera_services::{RegisteredService, SigningAlgorithm, TokenKeySet};
use tracing::trace;

/// Content type announced by a JWE wrapping a signed token.
const NESTED_CONTENT_TYPE: &str = "JWT";

/// Signs/encrypts claims into a token and reverses the operation.
pub trait CipherExecutor: Send + Sync {
    /// Whether this executor can protect tokens for `service`.
    fn supports(&self, service: &RegisteredService) -> bool;

    /// Protect a claims JSON payload.
    fn encode(
        &self,
        claims_json: &str,
        service: Option<&RegisteredService>,
    ) -> Result<String, CipherError>;

    /// Verify and unwrap a protected token, returning the claims JSON.
    fn decode(&self, token: &str, service: Option<&RegisteredService>)
        -> Result<String, CipherError>;
}

fn jwt_algorithm(algorithm: SigningAlgorithm) -> Algorithm {
    match algorithm {
        SigningAlgorithm::HS256 => Algorithm::HS256,
        SigningAlgorithm::HS384 => Algorithm::HS384,
        SigningAlgorithm::HS512 => Algorithm::HS512,
    }
}

struct SigningKey {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Sign-then-encrypt with one key set.
struct JwtCipher {
    signing: Option<SigningKey>,
    encryption: Option<ContentEncryption>,
    key_id: Option<String>,
}

impl JwtCipher {
    fn from_keys(keys: &TokenKeySet) -> Result<Self, CipherError> {
        let signing = match (&keys.signing_key, keys.signing_enabled) {
            (Some(secret), true) => {
                if secret.len() < MIN_SIGNING_KEY_LEN {
                    return Err(CipherError::InvalidKey(format!(
                        "Signing key must be at least {MIN_SIGNING_KEY_LEN} bytes"
                    )));
                }
                Some(SigningKey {
                    algorithm: jwt_algorithm(keys.signing_algorithm),
                    encoding: EncodingKey::from_secret(secret.as_bytes()),
                    decoding: DecodingKey::from_secret(secret.as_bytes()),
                })
            }
            (None, true) => {
                return Err(CipherError::InvalidKey(
                    "Signing is enabled without a signing key".to_string(),
                ))
            }
            (_, false) => None,
        };

        let encryption = match (&keys.encryption_key, keys.encryption_enabled) {
            (Some(key_hex), true) => Some(ContentEncryption::from_hex_key(key_hex)?),
            (None, true) => {
                return Err(CipherError::InvalidKey(
                    "Encryption is enabled without an encryption key".to_string(),
                ))
            }
            (_, false) => None,
        };

        if signing.is_none() && encryption.is_none() {
            return Err(CipherError::InvalidKey(
                "Key set neither signs nor encrypts".to_string(),
            ));
        }

        Ok(Self {
            signing,
            encryption,
            key_id: keys.key_id.clone(),
        })
    }

    fn encode(&self, claims_json: &str) -> Result<String, CipherError> {
        let mut token = claims_json.to_string();

        if let Some(signing) = &self.signing {
            let claims: Value = serde_json::from_str(claims_json)
                .map_err(|e| CipherError::Encode(format!("Claims are not JSON: {e}")))?;
            let mut header = Header::new(signing.algorithm);
            header.kid.clone_from(&self.key_id);
            token = encode(&header, &claims, &signing.encoding)
                .map_err(|e| CipherError::Encode(format!("Signing failed: {e}")))?;
        }

        if let Some(encryption) = &self.encryption {
            let content_type = self.signing.as_ref().map(|_| NESTED_CONTENT_TYPE);
            token = encryption.encrypt(&token, self.key_id.as_deref(), content_type)?;
        }

        Ok(token)
    }

    fn decode(&self, token: &str) -> Result<String, CipherError> {
        let token = token.trim();
        let segments = token.split('.').count();

        let inner = match &self.encryption {
            Some(encryption) => encryption.decrypt(token)?,
            None if segments == 5 => {
                return Err(CipherError::Decode(
                    "Encrypted token received but no encryption key is configured".to_string(),
                ))
            }
            None => token.to_string(),
        };

        let Some(signing) = &self.signing else {
            return Ok(inner);
        };

        let mut validation = Validation::new(signing.algorithm);
        validation.algorithms = vec![signing.algorithm];
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let data = decode::<Value>(&inner, &signing.decoding, &validation)
            .map_err(|e| CipherError::Decode(format!("Signature verification failed: {e}")))?;
        serde_json::to_string(&data.claims).map_err(|e| CipherError::Decode(e.to_string()))
    }
}

impl Debug for JwtCipher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCipher")
            .field("signing", &self.signing.as_ref().map(|s| s.algorithm))
            .field("encryption", &self.encryption.as_ref().map(|_| "A256GCM"))
            .field("key_id", &self.key_id)
            .finish()
    }
}

/// Cipher executor using the key set attached to each registered service.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceCipherExecutor;

impl ServiceCipherExecutor {
    /// Create a new service cipher executor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn cipher_for(service: Option<&RegisteredService>) -> Result<JwtCipher, CipherError> {
        let keys = service.and_then(|s| s.token_keys.as_ref()).ok_or_else(|| {
            CipherError::InvalidKey("Service has no token keys configured".to_string())
        })?;
        JwtCipher::from_keys(keys)
    }
}

impl CipherExecutor for ServiceCipherExecutor {
    fn supports(&self, service: &RegisteredService) -> bool {
        service
            .token_keys
            .as_ref()
            .is_some_and(TokenKeySet::is_protecting)
    }

    fn encode(
        &self,
        claims_json: &str,
        service: Option<&RegisteredService>,
    ) -> Result<String, CipherError> {
        Self::cipher_for(service)?.encode(claims_json)
    }

    fn decode(
        &self,
        token: &str,
        service: Option<&RegisteredService>,
    ) -> Result<String, CipherError> {
        Self::cipher_for(service)?.decode(token)
    }
}

/// Cipher executor using the deployment-wide default keys.
#[derive(Debug, Default)]
pub struct GlobalCipherExecutor {
    cipher: Option<JwtCipher>,
}

impl GlobalCipherExecutor {
    /// Build from configuration. A disabled configuration yields a disabled executor.
    pub fn from_config(config: &CipherConfig) -> Result<Self, CipherError> {
        config.validate()?;
        if !config.enabled {
            return Ok(Self::disabled());
        }
        Ok(Self {
            cipher: Some(JwtCipher::from_keys(&config.keys)?),
        })
    }

    /// An executor that protects nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self { cipher: None }
    }

    /// Whether the global cipher is active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.cipher.is_some()
    }

    fn cipher(&self) -> Result<&JwtCipher, CipherError> {
        self.cipher.as_ref().ok_or_else(|| CipherError::Config {
            detail: "Global cipher is disabled".to_string(),
        })
    }
}

impl CipherExecutor for GlobalCipherExecutor {
    fn supports(&self, _service: &RegisteredService) -> bool {
        self.is_enabled()
    }

    fn encode(
        &self,
        claims_json: &str,
        _service: Option<&RegisteredService>,
    ) -> Result<String, CipherError> {
        self.cipher()?.encode(claims_json)
    }

    fn decode(
        &self,
        token: &str,
        _service: Option<&RegisteredService>,
    ) -> Result<String, CipherError> {
        self.cipher()?.decode(token)
    }
}

/// The executor chosen for a token, bound to its service where relevant.
#[derive(Debug, Clone, Copy)]
pub enum SelectedCipher<'a> {
    /// The service's own key set.
    Service(&'a ServiceCipherExecutor, &'a RegisteredService),
    /// The global default keys.
    Default(&'a GlobalCipherExecutor),
}

impl SelectedCipher<'_> {
    /// Protect a claims JSON payload.
    pub fn encode(&self, claims_json: &str) -> Result<String, CipherError> {
        match self {
            SelectedCipher::Service(executor, service) => {
                executor.encode(claims_json, Some(service))
            }
            SelectedCipher::Default(executor) => executor.encode(claims_json, None),
        }
    }

    /// Verify and unwrap a protected token.
    pub fn decode(&self, token: &str) -> Result<String, CipherError> {
        match self {
            SelectedCipher::Service(executor, service) => executor.decode(token, Some(service)),
            SelectedCipher::Default(executor) => executor.decode(token, None),
        }
    }

    /// Whether the service's own keys were chosen.
    #[must_use]
    pub fn is_service_specific(&self) -> bool {
        matches!(self, SelectedCipher::Service(..))
    }
}

/// Chooses the cipher executor for a service.
#[derive(Debug, Default)]
pub struct CipherSelector {
    service: ServiceCipherExecutor,
    global: GlobalCipherExecutor,
}

impl CipherSelector {
    /// Create a selector falling back to the given global executor.
    #[must_use]
    pub fn new(global: GlobalCipherExecutor) -> Self {
        Self {
            service: ServiceCipherExecutor::new(),
            global,
        }
    }

    /// Build a selector from the global cipher configuration.
    pub fn from_config(config: &CipherConfig) -> Result<Self, CipherError> {
        Ok(Self::new(GlobalCipherExecutor::from_config(config)?))
    }

    /// Select the executor for `service`.
    ///
    /// Returns `None` when neither the service nor the global configuration
    /// provides keys; callers then fall back to an unprotected token.
    #[must_use]
    pub fn select<'a>(&'a self, service: Option<&'a RegisteredService>) -> Option<SelectedCipher<'a>> {
        if let Some(service) = service {
            if self.service.supports(service) {
                trace!(service_id = service.id, "Using service-specific token cipher");
                return Some(SelectedCipher::Service(&self.service, service));
            }
        }
        if self.global.is_enabled() {
            trace!("Using global default token cipher");
            return Some(SelectedCipher::Default(&self.global));
        }
        trace!("No token cipher available");
        None
    }

    /// The global default executor.
    #[must_use]
    pub fn global(&self) -> &GlobalCipherExecutor {
        &self.global
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "an-hmac-secret-that-is-long-enough-1234";
    const OTHER_SECRET: &str = "another-hmac-secret-that-is-long-enough";
    const AES_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
    const CLAIMS: &str = r#"{"exp":1700000000,"iss":"https://idp.example","sub":"alice"}"#;

    fn keyed_service(keys: TokenKeySet) -> RegisteredService {
        RegisteredService::new(7, "Keyed", "https://keyed\\.example.*").with_token_keys(keys)
    }

    mod jwt_cipher {
        use super::*;

        #[test]
        fn test_sign_only_produces_jws() {
            let cipher = JwtCipher::from_keys(&TokenKeySet::signing(SECRET).with_key_id("k1")).unwrap();
            let token = cipher.encode(CLAIMS).unwrap();

            assert_eq!(token.split('.').count(), 3);
            let header = jsonwebtoken::decode_header(&token).unwrap();
            assert_eq!(header.alg, Algorithm::HS512);
            assert_eq!(header.kid.as_deref(), Some("k1"));
            assert_eq!(cipher.decode(&token).unwrap(), CLAIMS);
        }

        #[test]
        fn test_sign_and_encrypt_produces_jwe() {
            let cipher =
                JwtCipher::from_keys(&TokenKeySet::signing(SECRET).with_encryption(AES_KEY)).unwrap();
            let token = cipher.encode(CLAIMS).unwrap();

            assert_eq!(token.split('.').count(), 5);
            assert_eq!(cipher.decode(&token).unwrap(), CLAIMS);
        }

        #[test]
        fn test_encrypt_only() {
            let keys = TokenKeySet {
                encryption_enabled: true,
                encryption_key: Some(AES_KEY.to_string()),
                ..Default::default()
            };
            let cipher = JwtCipher::from_keys(&keys).unwrap();
            let token = cipher.encode(CLAIMS).unwrap();
            assert_eq!(cipher.decode(&token).unwrap(), CLAIMS);
        }

        #[test]
        fn test_wrong_secret_fails() {
            let token = JwtCipher::from_keys(&TokenKeySet::signing(SECRET))
                .unwrap()
                .encode(CLAIMS)
                .unwrap();
            let other = JwtCipher::from_keys(&TokenKeySet::signing(OTHER_SECRET)).unwrap();
            assert!(matches!(other.decode(&token), Err(CipherError::Decode(_))));
        }

        #[test]
        fn test_unencrypted_token_rejected_when_encryption_configured() {
            let signed = JwtCipher::from_keys(&TokenKeySet::signing(SECRET))
                .unwrap()
                .encode(CLAIMS)
                .unwrap();
            let both =
                JwtCipher::from_keys(&TokenKeySet::signing(SECRET).with_encryption(AES_KEY)).unwrap();
            assert!(both.decode(&signed).is_err());
        }

        #[test]
        fn test_invalid_key_sets() {
            assert!(matches!(
                JwtCipher::from_keys(&TokenKeySet::signing("short")),
                Err(CipherError::InvalidKey(_))
            ));
            assert!(JwtCipher::from_keys(&TokenKeySet::default()).is_err());
            assert!(JwtCipher::from_keys(&TokenKeySet::signing(SECRET).with_encryption("abc")).is_err());
        }
    }

    mod selector {
        use super::*;

        fn global() -> GlobalCipherExecutor {
            GlobalCipherExecutor::from_config(&CipherConfig::enabled(TokenKeySet::signing(OTHER_SECRET)))
                .unwrap()
        }

        #[test]
        fn test_service_keys_win() {
            let selector = CipherSelector::new(global());
            let service = keyed_service(TokenKeySet::signing(SECRET));

            let selected = selector.select(Some(&service)).unwrap();
            assert!(selected.is_service_specific());
        }

        #[test]
        fn test_global_fallback() {
            let selector = CipherSelector::new(global());
            let service = RegisteredService::new(1, "Plain", ".*");

            let selected = selector.select(Some(&service)).unwrap();
            assert!(!selected.is_service_specific());
            assert!(selector.select(None).is_some());
        }

        #[test]
        fn test_nothing_available() {
            let selector = CipherSelector::default();
            let service = RegisteredService::new(1, "Plain", ".*");
            assert!(selector.select(Some(&service)).is_none());
            assert!(!selector.global().is_enabled());
        }

        #[test]
        fn test_disabled_service_keys_are_not_supported() {
            let mut keys = TokenKeySet::signing(SECRET);
            keys.signing_enabled = false;
            let service = keyed_service(keys);
            assert!(!ServiceCipherExecutor::new().supports(&service));
        }

        #[test]
        fn test_service_and_global_ciphers_do_not_interoperate() {
            let selector = CipherSelector::new(global());
            let service = keyed_service(TokenKeySet::signing(SECRET));

            let token = selector.select(Some(&service)).unwrap().encode(CLAIMS).unwrap();
            assert!(selector.select(None).unwrap().decode(&token).is_err());
            assert_eq!(
                selector.select(Some(&service)).unwrap().decode(&token).unwrap(),
                CLAIMS
            );
        }

        #[test]
        fn test_disabled_global_refuses_to_encode() {
            let executor = GlobalCipherExecutor::disabled();
            assert!(matches!(
                executor.encode(CLAIMS, None),
                Err(CipherError::Config { .. })
            ));
        }
    }
}
