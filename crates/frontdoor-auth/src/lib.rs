//! Bearer token verification for frontdoor.
//!
//! This crate turns an `Authorization` header into verified [`Claims`]:
//!
//! - `Bearer <token>` header parsing
//! - HMAC (HS256/HS384/HS512) signature verification with a shared secret
//! - Expiry checking and claims normalization
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │   Gateway        │────▶│   JwtValidator   │
//! │   (auth gate)    │     │   (trait)        │
//! └──────────────────┘     └────────┬─────────┘
//!                                   │
//!                          ┌────────▼─────────┐
//!                          │  HmacValidator   │
//!                          │  (shared secret) │
//!                          └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use frontdoor_auth::{bearer_token, AuthConfig, HmacValidator, JwtValidator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let validator = HmacValidator::new(&AuthConfig::new("s3cr3t"));
//!
//! // In a request handler:
//! let token = bearer_token(Some("Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9..."))?;
//! let claims = validator.validate(token).await?;
//!
//! println!("Subject: {}", claims.subject);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod bearer;
pub mod error;
pub mod jwt;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use bearer::bearer_token;
pub use error::{AuthError, Result};
pub use jwt::{Claims, HmacValidator, JwtValidator};

/// Configuration for token verification.
#[derive(Clone)]
pub struct AuthConfig {
    /// Shared HMAC secret the auth service signs tokens with.
    pub secret: String,
    /// Clock-skew allowance applied to `exp`, in seconds.
    pub leeway_seconds: u64,
}

impl AuthConfig {
    /// Create a configuration with the given secret and no leeway.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            leeway_seconds: 0,
        }
    }

    /// Set the expiry leeway.
    #[must_use]
    pub const fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds;
        self
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}
