//! Token minting for tests.
//!
//! Produces HS256 tokens shaped like the ones the auth service issues.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Builder for signed test tokens.
#[derive(Debug, Clone)]
pub struct TokenBuilder {
    subject: Value,
    email: Option<String>,
    role: Option<String>,
    expires_in: Option<Duration>,
}

impl TokenBuilder {
    /// A token for `subject` that expires in one hour.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: Value::String(subject.into()),
            email: None,
            role: None,
            expires_in: Some(Duration::hours(1)),
        }
    }

    /// A token whose `sub` claim is a JSON number.
    #[must_use]
    pub fn numeric_subject(subject: u64) -> Self {
        Self {
            subject: json!(subject),
            ..Self::new("")
        }
    }

    /// Set the `email` claim.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the `role` claim.
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set `exp` relative to now. Negative durations produce expired tokens.
    #[must_use]
    pub fn expires_in(mut self, duration: Duration) -> Self {
        self.expires_in = Some(duration);
        self
    }

    /// Omit the `exp` claim.
    #[must_use]
    pub fn without_expiry(mut self) -> Self {
        self.expires_in = None;
        self
    }

    /// Sign the token with `secret` using HS256.
    ///
    /// # Panics
    ///
    /// Panics if encoding fails, which does not happen for HMAC keys.
    #[must_use]
    pub fn sign(self, secret: &str) -> String {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("sub".to_string(), self.subject);
        claims.insert("iat".to_string(), json!(now.timestamp()));
        if let Some(email) = self.email {
            claims.insert("email".to_string(), json!(email));
        }
        if let Some(role) = self.role {
            claims.insert("role".to_string(), json!(role));
        }
        if let Some(expires_in) = self.expires_in {
            claims.insert("exp".to_string(), json!((now + expires_in).timestamp()));
        }

        encode(
            &Header::default(),
            &Value::Object(claims),
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("HMAC encoding cannot fail")
    }
}
