//! Error types for service registry and access operations.

use thiserror::Error;

/// Service registry and access strategy errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The service is disabled or the caller is not authorized to use it.
    #[error("Service access denied for '{service}': {reason}")]
    AccessDenied {
        /// Name of the service access was denied for.
        service: String,
        /// Why access was denied.
        reason: String,
    },

    /// The service identifier pattern does not compile.
    #[error("Invalid service pattern '{pattern}': {detail}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Compiler message.
        detail: String,
    },

    /// A service with the same numeric id is already registered.
    #[error("Duplicate service id: {0}")]
    DuplicateId(i64),
}

impl ServiceError {
    /// Check if this error denies access to a service.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        matches!(self, ServiceError::AccessDenied { .. })
    }
}
