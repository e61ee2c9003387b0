//! tessera Core Library
//!
//! Shared types for the tessera SSO engine.
//!
//! # Modules
//!
//! - [`attributes`] - Multi-valued attribute maps and the reserved internal namespace
//! - [`authentication`] - Principals, authentication records and login outcomes
//!
//! # Example
//!
//! ```
//! use tessera_core::{attribute_map, Authentication, AuthenticationOutcome, Principal};
//!
//! let principal = Principal::with_attributes(
//!     "alice",
//!     attribute_map([("mail", vec!["alice@example.org"])]),
//! );
//! let outcome = AuthenticationOutcome::new(Authentication::new(principal));
//!
//! assert_eq!(outcome.principal().id, "alice");
//! ```

pub mod attributes;
pub mod authentication;

// Re-export main types for convenient access
pub use attributes::{
    attribute_map, is_reserved_attribute, merge_attributes, AttributeMap, AttributeValue,
    RESERVED_ATTRIBUTE_NAMESPACE,
};
pub use authentication::{Authentication, AuthenticationOutcome, Principal};
