//! Authentication error types.

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while authenticating a request.
///
/// All variants are reported to the caller as the same 401 response; the
/// distinction exists for logs and tests.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization` header, or it is not `Bearer <token>`.
    #[error("missing bearer token")]
    MissingToken,

    /// The token is malformed or its signature does not verify.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The token's `exp` claim is in the past.
    #[error("token expired")]
    ExpiredToken,
}

impl AuthError {
    /// Returns `true` if this error indicates the client should retry with a new token.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::ExpiredToken)
    }

    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        401
    }

    /// A stable, machine-readable reason for logs and metrics.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::InvalidToken(_) => "invalid_token",
            Self::ExpiredToken => "expired_token",
        }
    }
}
