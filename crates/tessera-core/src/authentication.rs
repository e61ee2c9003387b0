//! Principals and authentication records.
//!
//! An [`Authentication`] is the record a login leaves behind: who logged in,
//! what was released about them, and which handlers vouched for it. An
//! [`AuthenticationOutcome`] groups the records produced by one login attempt
//! (one per authentication transaction, e.g. primary credential plus MFA).

use crate::attributes::{merge_attributes, AttributeMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Principal identifier (typically the username).
    pub id: String,

    /// Attributes resolved for the principal.
    #[serde(default)]
    pub attributes: AttributeMap,
}

impl Principal {
    /// Create a principal without attributes.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: AttributeMap::new(),
        }
    }

    /// Create a principal with attributes.
    #[must_use]
    pub fn with_attributes(id: impl Into<String>, attributes: AttributeMap) -> Self {
        Self {
            id: id.into(),
            attributes,
        }
    }
}

/// A completed authentication for a principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authentication {
    /// The authenticated principal.
    pub principal: Principal,

    /// Authentication metadata (method, MFA context, ...).
    #[serde(default)]
    pub attributes: AttributeMap,

    /// When the authentication happened.
    pub authentication_date: DateTime<Utc>,

    /// Names of the handlers that successfully authenticated the credentials.
    #[serde(default)]
    pub successful_handlers: Vec<String>,
}

impl Authentication {
    /// Create an authentication dated now.
    #[must_use]
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            attributes: AttributeMap::new(),
            authentication_date: Utc::now(),
            successful_handlers: Vec::new(),
        }
    }

    /// Attach authentication attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: AttributeMap) -> Self {
        self.attributes = attributes;
        self
    }

    /// Record a successful handler.
    #[must_use]
    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.successful_handlers.push(handler.into());
        self
    }

    /// Value equality used to decide whether a login replays an existing session.
    ///
    /// Two records are equal when the principal id, the principal attributes and
    /// the authentication attributes all match. Dates and handler names do not
    /// participate: a replayed login is never dated the same as the original.
    #[must_use]
    pub fn is_equal_to(&self, other: &Authentication) -> bool {
        self.principal == other.principal && self.attributes == other.attributes
    }

    /// Refresh this record in place from a newer authentication of the same principal.
    pub fn update_attributes(&mut self, other: &Authentication) {
        merge_attributes(&mut self.principal.attributes, &other.principal.attributes);
        merge_attributes(&mut self.attributes, &other.attributes);
        for handler in &other.successful_handlers {
            if !self.successful_handlers.contains(handler) {
                self.successful_handlers.push(handler.clone());
            }
        }
        self.authentication_date = other.authentication_date;
    }
}

/// Everything one login attempt produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationOutcome {
    principal: Principal,
    authentications: Vec<Authentication>,
    service: Option<String>,
}

impl AuthenticationOutcome {
    /// Create an outcome from a single authentication.
    #[must_use]
    pub fn new(authentication: Authentication) -> Self {
        Self {
            principal: authentication.principal.clone(),
            authentications: vec![authentication],
            service: None,
        }
    }

    /// Create an outcome from several authentication transactions.
    ///
    /// Returns `None` when `authentications` is empty.
    #[must_use]
    pub fn from_authentications(authentications: Vec<Authentication>) -> Option<Self> {
        let principal = authentications.last()?.principal.clone();
        Some(Self {
            principal,
            authentications,
            service: None,
        })
    }

    /// Record the service the login was started for.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// The authenticated principal.
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// The individual authentication records, in the order they happened.
    #[must_use]
    pub fn authentications(&self) -> &[Authentication] {
        &self.authentications
    }

    /// The service the login was started for, if any.
    #[must_use]
    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    /// Collapse the records into the single authentication bound to a session.
    ///
    /// Attributes are merged in order so later transactions win per key; the
    /// date is the latest record's date.
    #[must_use]
    pub fn authentication(&self) -> Authentication {
        let mut combined = Authentication::new(self.principal.clone());
        combined.principal.attributes.clear();
        if let Some(last) = self.authentications.last() {
            combined.authentication_date = last.authentication_date;
        }
        for authn in &self.authentications {
            merge_attributes(&mut combined.principal.attributes, &authn.principal.attributes);
            merge_attributes(&mut combined.attributes, &authn.attributes);
            for handler in &authn.successful_handlers {
                if !combined.successful_handlers.contains(handler) {
                    combined.successful_handlers.push(handler.clone());
                }
            }
        }
        combined
    }
}
