//! Token building.
//!
//! [`TokenBuilder`] assembles a [`ClaimsSet`] from a [`TokenRequest`], resolves
//! the registered service the token is meant for, checks access, and protects
//! the claims with the selected cipher. Without any cipher the token is issued
//! unprotected, with a header naming the owning service.

use crate::cipher::CipherSelector;
use crate::claims::ClaimsSet;
use crate::error::TokenError;
use crate::jose::{encode_unprotected, unprotected_header};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tessera_core::{AttributeMap, AttributeValue};
use tessera_services::{AccessStrategyChecker, RegisteredService, ServiceResolver};
use tracing::{debug, trace};
use uuid::Uuid;

/// Lifetime applied when a request carries no `valid_until`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// A request to issue a token.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    /// Token identifier.
    pub jwt_id: String,
    /// Issue instant.
    pub issue_date: DateTime<Utc>,
    /// Expiration instant.
    pub valid_until: Option<DateTime<Utc>>,
    /// Principal the token is about.
    pub subject: Option<String>,
    /// Issuer; building fails without it.
    pub issuer: Option<String>,
    /// Target service identifiers, in preference order without duplicates.
    pub service_audience: Vec<String>,
    /// Attributes released as claims.
    pub attributes: AttributeMap,
    /// Explicit target service; skips audience resolution.
    pub registered_service: Option<RegisteredService>,
}

impl TokenRequest {
    /// Create a new builder for a token request.
    #[must_use]
    pub fn builder() -> TokenRequestBuilder {
        TokenRequestBuilder::default()
    }

    /// Expiration instant, defaulting to one hour after issue.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::MissingClaim("exp")` when the default lifetime
    /// would run past the representable time range.
    pub fn expiration(&self) -> Result<DateTime<Utc>, TokenError> {
        match self.valid_until {
            Some(valid_until) => Ok(valid_until),
            None => self
                .issue_date
                .checked_add_signed(Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS))
                .ok_or_else(|| TokenError::MissingClaim("exp".to_string())),
        }
    }
}

/// Builder for [`TokenRequest`].
#[derive(Debug, Default)]
pub struct TokenRequestBuilder {
    jwt_id: Option<String>,
    issue_date: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
    subject: Option<String>,
    issuer: Option<String>,
    service_audience: Vec<String>,
    attributes: AttributeMap,
    registered_service: Option<RegisteredService>,
}

impl TokenRequestBuilder {
    /// Set the token identifier (default: random UUID).
    #[must_use]
    pub fn jwt_id(mut self, jti: impl Into<String>) -> Self {
        self.jwt_id = Some(jti.into());
        self
    }

    /// Set the issue instant (default: now).
    #[must_use]
    pub fn issue_date(mut self, at: DateTime<Utc>) -> Self {
        self.issue_date = Some(at);
        self
    }

    /// Set the expiration instant.
    #[must_use]
    pub fn valid_until(mut self, at: DateTime<Utc>) -> Self {
        self.valid_until = Some(at);
        self
    }

    /// Set the subject.
    #[must_use]
    pub fn subject(mut self, sub: impl Into<String>) -> Self {
        self.subject = Some(sub.into());
        self
    }

    /// Set the issuer.
    #[must_use]
    pub fn issuer(mut self, iss: impl Into<String>) -> Self {
        self.issuer = Some(iss.into());
        self
    }

    /// Add a target service identifier. Duplicates are ignored.
    #[must_use]
    pub fn audience(mut self, aud: impl Into<String>) -> Self {
        let aud = aud.into();
        if !self.service_audience.contains(&aud) {
            self.service_audience.push(aud);
        }
        self
    }

    /// Add an attribute value.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Replace all attributes.
    #[must_use]
    pub fn attributes(mut self, attributes: AttributeMap) -> Self {
        self.attributes = attributes;
        self
    }

    /// Target an explicit service.
    #[must_use]
    pub fn registered_service(mut self, service: RegisteredService) -> Self {
        self.registered_service = Some(service);
        self
    }

    /// Build the request.
    #[must_use]
    pub fn build(self) -> TokenRequest {
        TokenRequest {
            jwt_id: self.jwt_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            issue_date: self.issue_date.unwrap_or_else(Utc::now),
            valid_until: self.valid_until,
            subject: self.subject,
            issuer: self.issuer,
            service_audience: self.service_audience,
            attributes: self.attributes,
            registered_service: self.registered_service,
        }
    }
}

/// Last chance to adjust assembled claims before service resolution.
pub trait ClaimsFinalizer: Send + Sync {
    /// Return the claims to issue.
    fn finalize(&self, claims: ClaimsSet, request: &TokenRequest) -> Result<ClaimsSet, TokenError>;
}

/// Finalizer that returns the claims unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityFinalizer;

impl ClaimsFinalizer for IdentityFinalizer {
    fn finalize(&self, claims: ClaimsSet, _request: &TokenRequest) -> Result<ClaimsSet, TokenError> {
        Ok(claims)
    }
}

/// Issues tokens for registered services.
#[derive(Clone)]
pub struct TokenBuilder {
    resolver: Arc<dyn ServiceResolver>,
    access: Arc<dyn AccessStrategyChecker>,
    ciphers: Arc<CipherSelector>,
    finalizer: Arc<dyn ClaimsFinalizer>,
}

impl TokenBuilder {
    /// Create a builder with the identity claims finalizer.
    pub fn new(
        resolver: Arc<dyn ServiceResolver>,
        access: Arc<dyn AccessStrategyChecker>,
        ciphers: Arc<CipherSelector>,
    ) -> Self {
        Self {
            resolver,
            access,
            ciphers,
            finalizer: Arc::new(IdentityFinalizer),
        }
    }

    /// Replace the claims finalizer.
    #[must_use]
    pub fn with_finalizer(mut self, finalizer: Arc<dyn ClaimsFinalizer>) -> Self {
        self.finalizer = finalizer;
        self
    }

    /// Build a token from a raw request.
    ///
    /// # Errors
    ///
    /// - `TokenError::MissingClaim` if the request has no issuer
    /// - `TokenError::ServiceResolution` if no audience entry resolves to a service
    /// - `TokenError::AccessDenied` if the resolved service refuses access
    /// - `TokenError::Cipher` if the selected cipher fails
    pub fn build(&self, request: &TokenRequest) -> Result<String, TokenError> {
        let issuer = request
            .issuer
            .as_deref()
            .filter(|iss| !iss.trim().is_empty())
            .ok_or_else(|| TokenError::MissingClaim("iss".to_string()))?;

        let mut claims = ClaimsSet::builder()
            .audience(request.service_audience.iter().cloned())
            .issuer(issuer)
            .jwt_id(request.jwt_id.clone())
            .issue_time(request.issue_date)
            .attributes(&request.attributes)
            .expiration_time(request.expiration()?);
        if let Some(subject) = &request.subject {
            claims = claims.subject(subject.clone());
        }
        let claims = self.finalizer.finalize(claims.build()?, request)?;

        let service = match &request.registered_service {
            Some(service) => service.clone(),
            None => self.resolve_audience(&request.service_audience)?,
        };
        self.build_for_service(&service, &claims)
    }

    /// Build a token for an already-resolved service.
    pub fn build_for_service(
        &self,
        service: &RegisteredService,
        claims: &ClaimsSet,
    ) -> Result<String, TokenError> {
        self.access.check(service)?;

        let claims_json = claims.to_json()?;
        trace!(service_id = service.id, claims = %claims_json, "Generated token claims");

        if let Some(cipher) = self.ciphers.select(Some(service)) {
            debug!(
                service_id = service.id,
                service_specific = cipher.is_service_specific(),
                "Protecting token"
            );
            return Ok(cipher.encode(&claims_json)?);
        }

        let token = Self::build_plain(claims, Some(service))?;
        debug!(service_id = service.id, "No token cipher available, issuing unprotected token");
        trace!(token = %token, "Generated unprotected token");
        Ok(token)
    }

    /// Serialize claims as an unprotected token.
    ///
    /// The header names the owning service for traceability only; it does not
    /// make the token authentic.
    pub fn build_plain(
        claims: &ClaimsSet,
        service: Option<&RegisteredService>,
    ) -> Result<String, TokenError> {
        let header = unprotected_header(service.map(|s| s.id));
        encode_unprotected(&header, &claims.to_json()?)
    }

    fn resolve_audience(&self, audience: &[String]) -> Result<RegisteredService, TokenError> {
        trace!(audience = ?audience, "Locating service in service registry");
        audience
            .iter()
            .find_map(|candidate| self.resolver.resolve(candidate))
            .ok_or_else(|| TokenError::ServiceResolution {
                candidates: audience.to_vec(),
            })
    }
}

impl std::fmt::Debug for TokenBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBuilder")
            .field("ciphers", &self.ciphers)
            .finish_non_exhaustive()
    }
}
