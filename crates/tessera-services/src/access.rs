//! Service access enforcement.

use crate::error::ServiceError;
use crate::service::RegisteredService;
use chrono::Utc;
use tracing::warn;

/// Decides whether a registered service may be used right now.
pub trait AccessStrategyChecker: Send + Sync {
    /// Fail with `ServiceError::AccessDenied` when the service is disabled or
    /// the caller is not authorized to use it.
    fn check(&self, service: &RegisteredService) -> Result<(), ServiceError>;
}

/// Enforces the service's own [`AccessStrategy`](crate::AccessStrategy).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAccessStrategyChecker;

impl AccessStrategyChecker for DefaultAccessStrategyChecker {
    fn check(&self, service: &RegisteredService) -> Result<(), ServiceError> {
        service
            .access_strategy
            .evaluate_at(Utc::now())
            .map_err(|reason| {
                warn!(
                    service_id = service.id,
                    service_name = %service.name,
                    reason = %reason,
                    "Service access denied"
                );
                ServiceError::AccessDenied {
                    service: service.name.clone(),
                    reason,
                }
            })
    }
}
