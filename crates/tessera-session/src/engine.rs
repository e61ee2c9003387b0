//! Session reuse and renewal decisions.
//!
//! After every successful login the engine decides whether the caller's
//! existing SSO session can be reused or must be replaced:
//!
//! - no (or blank) session id: create a session
//! - unknown session id: drop any leftover entry, then create a session
//! - bound authentication equal to the new one: refresh it in place, keep the id
//! - bound authentication different: delete the old id, then create a session
//!
//! Failures other than a principal rejection are logged and reported as
//! [`SessionError::InvalidSession`] so storage detail never reaches the caller.

use crate::error::{SessionError, StoreError};
use crate::store::SessionStore;
use crate::types::Session;
use std::sync::Arc;
use tessera_core::AuthenticationOutcome;
use tracing::{debug, error, info, warn};

/// Decides between reusing, renewing and creating SSO sessions.
#[derive(Clone)]
pub struct SessionDecisionEngine {
    store: Arc<dyn SessionStore>,
}

impl SessionDecisionEngine {
    /// Create an engine over `store`.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Decide which session the caller holds after `outcome`.
    ///
    /// # Errors
    ///
    /// - `SessionError::PrincipalRejected` if the store refuses the principal
    /// - `SessionError::InvalidSession` for any other failure, carrying the
    ///   presented identifier
    pub fn decide(
        &self,
        existing_session_id: Option<&str>,
        outcome: &AuthenticationOutcome,
    ) -> Result<Session, SessionError> {
        let session_id = existing_session_id
            .map(str::trim)
            .filter(|id| !id.is_empty());

        self.try_decide(session_id, outcome).map_err(|e| match e {
            StoreError::PrincipalRejected { principal, reason } => {
                SessionError::PrincipalRejected { principal, reason }
            }
            other => {
                error!(
                    session_id = session_id.unwrap_or_default(),
                    error = %other,
                    "Session decision failed"
                );
                SessionError::InvalidSession {
                    session_id: session_id.unwrap_or_default().to_string(),
                }
            }
        })
    }

    fn try_decide(
        &self,
        session_id: Option<&str>,
        outcome: &AuthenticationOutcome,
    ) -> Result<Session, StoreError> {
        let Some(session_id) = session_id else {
            debug!(principal = %outcome.principal().id, "No existing session presented");
            return self.create(outcome);
        };

        let Some(mut session) = self.store.get(session_id)? else {
            warn!(session_id = %session_id, "Presented session is unknown, creating a new one");
            if let Err(e) = self.store.delete(session_id) {
                warn!(session_id = %session_id, error = %e, "Unable to clean up stale session");
            }
            return self.create(outcome);
        };

        let authentication = outcome.authentication();
        if session.authentication.is_equal_to(&authentication) {
            debug!(session_id = %session_id, "Authentication unchanged, reusing session");
            session.authentication.update_attributes(&authentication);
            let session = self.store.update(session)?;
            info!(
                session_id = %session.id,
                principal = %session.principal_id(),
                "Session reused"
            );
            return Ok(session);
        }

        debug!(session_id = %session_id, "Authentication changed, renewing session");
        self.store.delete(session_id)?;
        let renewed = self.create(outcome)?;
        info!(
            previous_session_id = %session_id,
            session_id = %renewed.id,
            "Session renewed"
        );
        Ok(renewed)
    }

    fn create(&self, outcome: &AuthenticationOutcome) -> Result<Session, StoreError> {
        let session = self.store.create(outcome)?;
        info!(
            session_id = %session.id,
            principal = %session.principal_id(),
            "Session created"
        );
        Ok(session)
    }
}

impl std::fmt::Debug for SessionDecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionDecisionEngine").finish_non_exhaustive()
    }
}
