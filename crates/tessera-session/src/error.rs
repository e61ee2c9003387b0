//! Error types for session storage and session decisions.

use thiserror::Error;

/// Failures raised by a [`SessionStore`](crate::SessionStore).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The session does not exist.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The backing storage failed.
    #[error("Session storage failure: {0}")]
    Storage(String),

    /// The principal may not hold a session.
    #[error("Principal '{principal}' rejected: {reason}")]
    PrincipalRejected {
        /// Rejected principal id.
        principal: String,
        /// Why the principal was rejected.
        reason: String,
    },
}

/// Caller-visible session decision errors.
///
/// Internal failures are folded into [`SessionError::InvalidSession`]; only a
/// principal rejection passes through with its detail.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The session could not be reused, renewed or created.
    #[error("Invalid session: {session_id}")]
    InvalidSession {
        /// The identifier the caller presented (empty if none).
        session_id: String,
    },

    /// The principal may not hold a session.
    #[error("Principal '{principal}' rejected: {reason}")]
    PrincipalRejected {
        /// Rejected principal id.
        principal: String,
        /// Why the principal was rejected.
        reason: String,
    },
}

impl SessionError {
    /// Check if this is the catch-all invalid session error.
    #[must_use]
    pub fn is_invalid_session(&self) -> bool {
        matches!(self, SessionError::InvalidSession { .. })
    }

    /// Check if the principal was rejected.
    #[must_use]
    pub fn is_principal_rejected(&self) -> bool {
        matches!(self, SessionError::PrincipalRejected { .. })
    }
}
