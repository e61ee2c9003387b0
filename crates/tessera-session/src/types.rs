//! SSO session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_core::{Authentication, AuthenticationOutcome};

/// A server-side record of a completed login, reusable across service accesses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Canonical session identifier.
    pub id: String,
    /// The authentication bound to this session.
    pub authentication: Authentication,
    /// Service the login was started for.
    pub service: Option<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last updated.
    pub last_used_at: DateTime<Utc>,
    /// How many times the session has been updated.
    pub use_count: u32,
}

impl Session {
    /// Create a session binding `outcome` to `id`.
    #[must_use]
    pub fn new(id: impl Into<String>, outcome: &AuthenticationOutcome) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            authentication: outcome.authentication(),
            service: outcome.service().map(str::to_string),
            created_at: now,
            last_used_at: now,
            use_count: 0,
        }
    }

    /// Record a use of this session.
    pub fn touch(&mut self) {
        self.last_used_at = Utc::now();
        self.use_count = self.use_count.saturating_add(1);
    }

    /// The authenticated principal's id.
    #[must_use]
    pub fn principal_id(&self) -> &str {
        &self.authentication.principal.id
    }
}
