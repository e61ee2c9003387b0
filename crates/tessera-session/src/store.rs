//! Session storage.
//!
//! Provides the [`SessionStore`] seam and an in-memory implementation.

use crate::error::StoreError;
use crate::id::SessionIdGenerator;
use crate::types::Session;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tessera_core::{Authentication, AuthenticationOutcome, Principal};
use tracing::{debug, warn};

/// Decides whether a principal may hold a session. `Err` carries the reason.
pub type PrincipalPolicy = Arc<dyn Fn(&Principal) -> Result<(), String> + Send + Sync>;

/// Keyed storage of SSO sessions.
///
/// Implementations must offer read-your-writes consistency per identifier.
pub trait SessionStore: Send + Sync {
    /// Look up a session.
    fn get(&self, id: &str) -> Result<Option<Session>, StoreError>;

    /// Look up the authentication bound to a session.
    fn authentication_of(&self, id: &str) -> Result<Option<Authentication>, StoreError> {
        Ok(self.get(id)?.map(|session| session.authentication))
    }

    /// Allocate a new identifier and bind `outcome` to it.
    fn create(&self, outcome: &AuthenticationOutcome) -> Result<Session, StoreError>;

    /// Persist changes to an existing session, recording its use.
    fn update(&self, session: Session) -> Result<Session, StoreError>;

    /// Remove a session. Removing an unknown identifier succeeds.
    fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// In-memory session store.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ids: SessionIdGenerator,
    policy: Option<PrincipalPolicy>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific identifier generator.
    #[must_use]
    pub fn with_id_generator(mut self, ids: SessionIdGenerator) -> Self {
        self.ids = ids;
        self
    }

    /// Reject principals the policy refuses when creating sessions.
    #[must_use]
    pub fn with_principal_policy(mut self, policy: PrincipalPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl std::fmt::Debug for InMemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySessionStore")
            .field("sessions", &self.len())
            .field("ids", &self.ids)
            .field("policy", &self.policy.is_some())
            .finish()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.read().get(id).cloned())
    }

    fn create(&self, outcome: &AuthenticationOutcome) -> Result<Session, StoreError> {
        if let Some(policy) = &self.policy {
            policy(outcome.principal()).map_err(|reason| {
                warn!(principal = %outcome.principal().id, reason = %reason, "Principal rejected");
                StoreError::PrincipalRejected {
                    principal: outcome.principal().id.clone(),
                    reason,
                }
            })?;
        }

        let mut sessions = self.sessions.write();
        let mut id = self.ids.generate();
        while sessions.contains_key(&id) {
            id = self.ids.generate();
        }
        let session = Session::new(id.clone(), outcome);
        sessions.insert(id, session.clone());

        debug!(session_id = %session.id, principal = %session.principal_id(), "Session stored");
        Ok(session)
    }

    fn update(&self, mut session: Session) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.write();
        let Some(stored) = sessions.get_mut(&session.id) else {
            return Err(StoreError::NotFound(session.id));
        };
        session.touch();
        *stored = session.clone();
        Ok(session)
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        if self.sessions.write().remove(id).is_some() {
            debug!(session_id = %id, "Session deleted");
        }
        Ok(())
    }
}
