//! Identifier types for frontdoor.
//!
//! A service is addressed by a short name taken from the first path segment
//! after the gateway prefix, so names are restricted to what can appear in a
//! single segment.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The identifier was empty.
    #[error("identifier is empty")]
    Empty,

    /// The identifier contains a character that cannot appear in a path segment.
    #[error("identifier contains invalid character {0:?}")]
    InvalidChar(char),
}

/// The name of a backend service, e.g. `orders`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceName(String);

impl ServiceName {
    /// Parse a service name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or contains `/`, `?`, `#`
    /// or whitespace.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.is_empty() {
            return Err(IdError::Empty);
        }
        if let Some(c) = s
            .chars()
            .find(|c| matches!(c, '/' | '?' | '#') || c.is_whitespace())
        {
            return Err(IdError::InvalidChar(c));
        }
        Ok(Self(s.to_string()))
    }

    /// Return the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceName({})", self.0)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ServiceName {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ServiceName {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ServiceName> for String {
    fn from(name: ServiceName) -> Self {
        name.0
    }
}

impl AsRef<str> for ServiceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ServiceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_names() {
        assert_eq!(ServiceName::parse("orders").unwrap().as_str(), "orders");
        assert_eq!(
            ServiceName::parse("ad-service_2").unwrap().to_string(),
            "ad-service_2"
        );
    }

    #[test]
    fn reject_invalid_names() {
        assert_eq!(ServiceName::parse(""), Err(IdError::Empty));
        assert_eq!(ServiceName::parse("a/b"), Err(IdError::InvalidChar('/')));
        assert_eq!(ServiceName::parse("a b"), Err(IdError::InvalidChar(' ')));
        assert_eq!(ServiceName::parse("a?x"), Err(IdError::InvalidChar('?')));
    }

    #[test]
    fn serde_roundtrip_validates() {
        let name: ServiceName = serde_json::from_str("\"assets\"").unwrap();
        assert_eq!(name.as_str(), "assets");
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"assets\"");

        let bad: Result<ServiceName, _> = serde_json::from_str("\"a/b\"");
        assert!(bad.is_err());
    }
}
