//! Registered services for tessera.
//!
//! This crate provides:
//! - [`RegisteredService`] definitions with access strategies and optional token keys
//! - The [`ServiceResolver`] seam plus a regex-backed in-memory registry
//! - The [`AccessStrategyChecker`] seam plus the default enabled/time-window checker
//!
//! # Example
//!
//! ```
//! use tessera_services::{InMemoryServiceRegistry, RegisteredService, ServiceResolver};
//!
//! let registry = InMemoryServiceRegistry::new();
//! registry
//!     .register(RegisteredService::new(10, "App", "https://app\\.example(/.*)?"))
//!     .unwrap();
//!
//! let service = registry.resolve("https://app.example/home").unwrap();
//! assert_eq!(service.id, 10);
//! ```

mod access;
mod error;
mod registry;
mod service;

// Re-export public API
pub use access::{AccessStrategyChecker, DefaultAccessStrategyChecker};
pub use error::ServiceError;
pub use registry::{InMemoryServiceRegistry, ServiceResolver};
pub use service::{AccessStrategy, RegisteredService, SigningAlgorithm, TokenKeySet};
