//! Service resolution.
//!
//! A [`ServiceResolver`] maps a service URL or audience string to the
//! registered service that claims it. In [`InMemoryServiceRegistry`]
//! patterns are full-match regular expressions,
//! tried in evaluation order.

use crate::error::ServiceError;
use crate::service::RegisteredService;
use parking_lot::RwLock;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, trace};

/// Looks up registered services by service identifier.
pub trait ServiceResolver: Send + Sync {
    /// Resolve the service that matches `service_id`, if any.
    fn resolve(&self, service_id: &str) -> Option<RegisteredService>;
}

/// A registered service together with its compiled pattern.
#[derive(Debug, Clone)]
struct RegistryEntry {
    service: RegisteredService,
    pattern: Regex,
}

/// In-memory service registry.
#[derive(Debug, Default, Clone)]
pub struct InMemoryServiceRegistry {
    entries: Arc<RwLock<Vec<RegistryEntry>>>,
}

impl InMemoryServiceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service, compiling its pattern.
    ///
    /// # Errors
    ///
    /// - `ServiceError::InvalidPattern` if the pattern does not compile
    /// - `ServiceError::DuplicateId` if the numeric id is already taken
    pub fn register(&self, service: RegisteredService) -> Result<(), ServiceError> {
        let pattern = compile_pattern(&service.service_id)?;
        let mut entries = self.entries.write();

        if entries.iter().any(|e| e.service.id == service.id) {
            return Err(ServiceError::DuplicateId(service.id));
        }

        debug!(
            service_id = service.id,
            service_name = %service.name,
            pattern = %service.service_id,
            "Registered service"
        );

        entries.push(RegistryEntry { service, pattern });
        entries.sort_by_key(|e| (e.service.evaluation_order, e.service.id));
        Ok(())
    }

    /// Remove a service by numeric id. Returns the removed service.
    pub fn unregister(&self, id: i64) -> Option<RegisteredService> {
        let mut entries = self.entries.write();
        let index = entries.iter().position(|e| e.service.id == id)?;
        Some(entries.remove(index).service)
    }

    /// Find a service by numeric id.
    #[must_use]
    pub fn find_by_id(&self, id: i64) -> Option<RegisteredService> {
        self.entries
            .read()
            .iter()
            .find(|e| e.service.id == id)
            .map(|e| e.service.clone())
    }

    /// Number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl ServiceResolver for InMemoryServiceRegistry {
    fn resolve(&self, service_id: &str) -> Option<RegisteredService> {
        let entries = self.entries.read();
        let found = entries
            .iter()
            .find(|e| e.pattern.is_match(service_id))
            .map(|e| e.service.clone());

        match &found {
            Some(service) => trace!(
                candidate = %service_id,
                service_id = service.id,
                "Resolved registered service"
            ),
            None => trace!(candidate = %service_id, "No registered service matches"),
        }
        found
    }
}

/// Compile a service pattern as a full match.
fn compile_pattern(pattern: &str) -> Result<Regex, ServiceError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|e| ServiceError::InvalidPattern {
        pattern: pattern.to_string(),
        detail: e.to_string(),
    })
}
