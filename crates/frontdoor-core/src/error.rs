//! Error types for the core crate.

use thiserror::Error;

/// A result type using `RegistryError`.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors raised while building a service registry in strict mode.
///
/// Lenient construction never returns these; it logs and skips instead.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// An entry was not of the form `name=url`.
    #[error("malformed service entry: {0:?}")]
    MalformedEntry(String),

    /// The service name is not usable as a path segment.
    #[error("invalid service name {name:?}: {source}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        source: crate::ids::IdError,
    },

    /// The base URL is not absolute (scheme and host are required).
    #[error("invalid base URL for service {name}: {url:?}")]
    InvalidBaseUrl {
        /// The service the URL belongs to.
        name: String,
        /// The rejected URL.
        url: String,
    },

    /// The JSON form of the service map could not be parsed.
    #[error("invalid service map JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
