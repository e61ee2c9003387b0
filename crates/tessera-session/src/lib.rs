//! SSO sessions for tessera.
//!
//! This crate provides:
//! - [`Session`] records binding an authentication to a canonical identifier
//! - The [`SessionStore`] seam plus an in-memory store
//! - [`SessionDecisionEngine`], which reuses, renews or creates sessions after a login
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tessera_core::{Authentication, AuthenticationOutcome, Principal};
//! use tessera_session::{InMemorySessionStore, SessionDecisionEngine};
//!
//! let engine = SessionDecisionEngine::new(Arc::new(InMemorySessionStore::new()));
//! let outcome = AuthenticationOutcome::new(Authentication::new(Principal::new("alice")));
//!
//! let session = engine.decide(None, &outcome).unwrap();
//! let again = engine.decide(Some(&session.id), &outcome).unwrap();
//! assert_eq!(again.id, session.id);
//! ```

mod engine;
mod error;
mod id;
mod store;
mod types;

// Re-export public API
pub use engine::SessionDecisionEngine;
pub use error::{SessionError, StoreError};
pub use id::{SessionIdGenerator, DEFAULT_SESSION_ID_SUFFIX, SESSION_ID_PREFIX};
pub use store::{InMemorySessionStore, PrincipalPolicy, SessionStore};
pub use types::Session;
