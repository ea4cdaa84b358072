//! Core types for the frontdoor gateway.
//!
//! This crate provides the pieces every other crate builds on:
//!
//! - **Identifiers**: the validated [`ServiceName`]
//! - **Service registry**: the immutable name → base URL map
//! - **Error types**: [`RegistryError`] for strict registry construction
//!
//! # Example
//!
//! ```
//! use frontdoor_core::ServiceRegistry;
//!
//! let registry = ServiceRegistry::parse("orders=http://localhost:4001,ads=http://localhost:4002");
//!
//! assert_eq!(registry.resolve("orders"), Some("http://localhost:4001"));
//! assert_eq!(registry.resolve("unknown"), None);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod registry;

pub use error::{RegistryError, Result};
pub use ids::{IdError, ServiceName};
pub use registry::{RegistryEntry, ServiceRegistry};
