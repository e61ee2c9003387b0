//! Test helpers for tessera-session integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use tessera_core::{attribute_map, Authentication, AuthenticationOutcome, Principal};
use tessera_session::{InMemorySessionStore, Session, SessionStore, StoreError};

/// Initialize logging for tests.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

/// A login outcome for `principal` with the given mail attribute.
pub fn outcome(principal: &str, mail: &str) -> AuthenticationOutcome {
    let principal = Principal::with_attributes(principal, attribute_map([("mail", vec![mail])]));
    AuthenticationOutcome::new(
        Authentication::new(principal)
            .with_attributes(attribute_map([("authenticationMethod", vec!["password"])]))
            .with_handler("password"),
    )
}

/// Which store operation should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    Get,
    Update,
    Delete,
    Create,
}

/// Store wrapper that fails one operation and records deletes.
pub struct FaultyStore {
    pub inner: InMemorySessionStore,
    pub fail_on: Mutex<Option<FailOn>>,
    pub deleted: Mutex<Vec<String>>,
}

impl FaultyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: InMemorySessionStore::new(),
            fail_on: Mutex::new(None),
            deleted: Mutex::new(Vec::new()),
        })
    }

    pub fn fail(&self, op: FailOn) {
        *self.fail_on.lock() = Some(op);
    }

    fn check(&self, op: FailOn) -> Result<(), StoreError> {
        if *self.fail_on.lock() == Some(op) {
            return Err(StoreError::Storage(format!("{op:?} failed: connection reset")));
        }
        Ok(())
    }
}

impl SessionStore for FaultyStore {
    fn get(&self, id: &str) -> Result<Option<Session>, StoreError> {
        self.check(FailOn::Get)?;
        self.inner.get(id)
    }

    fn create(&self, outcome: &AuthenticationOutcome) -> Result<Session, StoreError> {
        self.check(FailOn::Create)?;
        self.inner.create(outcome)
    }

    fn update(&self, session: Session) -> Result<Session, StoreError> {
        self.check(FailOn::Update)?;
        self.inner.update(session)
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.deleted.lock().push(id.to_string());
        self.check(FailOn::Delete)?;
        self.inner.delete(id)
    }
}
