//! JWT validation and claims extraction.
//!
//! This module provides the core JWT validation logic: HMAC signature
//! verification, expiry checking, and normalization of the payload into
//! [`Claims`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::{AuthError, Result};
use crate::AuthConfig;

/// Claims extracted from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// The `sub` claim. Numeric subjects are rendered as decimal strings.
    pub subject: String,
    /// The `email` claim, if present.
    pub email: Option<String>,
    /// The `role` claim, if present.
    pub role: Option<String>,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

/// Trait for validating bearer tokens.
#[async_trait]
pub trait JwtValidator: Send + Sync {
    /// Validate a token and extract claims.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ExpiredToken`] if the token has expired and
    /// [`AuthError::InvalidToken`] for any other verification failure.
    async fn validate(&self, token: &str) -> Result<Claims>;
}

/// Raw claims from a JWT before normalization.
#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: Subject,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
    exp: u64,
}

/// The auth service signs user ids, which may be numbers or strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Subject {
    Text(String),
    Number(serde_json::Number),
}

impl From<Subject> for String {
    fn from(subject: Subject) -> Self {
        match subject {
            Subject::Text(s) => s,
            Subject::Number(n) => n.to_string(),
        }
    }
}

/// Validator for tokens signed with a shared HMAC secret.
pub struct HmacValidator {
    key: DecodingKey,
    validation: Validation,
}

impl HmacValidator {
    /// Create a validator from the given configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = config.leeway_seconds;
        validation.validate_exp = true;
        // Tokens from the auth service carry no audience.
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }
}

impl std::fmt::Debug for HmacValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacValidator")
            .field("algorithms", &self.validation.algorithms)
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl JwtValidator for HmacValidator {
    async fn validate(&self, token: &str) -> Result<Claims> {
        let token_data =
            decode::<RawClaims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken(e.to_string()),
            })?;

        let claims = token_data.claims;

        let exp_secs = i64::try_from(claims.exp).unwrap_or(i64::MAX);
        let expires_at = DateTime::from_timestamp(exp_secs, 0)
            .ok_or_else(|| AuthError::InvalidToken("invalid exp timestamp".to_string()))?;

        let subject: String = claims.sub.into();
        tracing::trace!(subject = %subject, alg = ?token_data.header.alg, "Token verified");

        Ok(Claims {
            subject,
            email: claims.email,
            role: claims.role,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TokenBuilder;
    use chrono::Duration;

    const SECRET: &str = "s3cr3t";

    fn validator() -> HmacValidator {
        HmacValidator::new(&AuthConfig::new(SECRET))
    }

    #[tokio::test]
    async fn valid_token_yields_claims() {
        let token = TokenBuilder::new("42")
            .email("ada@example.com")
            .role("admin")
            .sign(SECRET);

        let claims = validator().validate(&token).await.unwrap();
        assert_eq!(claims.subject, "42");
        assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
        assert_eq!(claims.role.as_deref(), Some("admin"));
        assert!(claims.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn optional_claims_may_be_absent() {
        let token = TokenBuilder::new("user-1").sign(SECRET);

        let claims = validator().validate(&token).await.unwrap();
        assert_eq!(claims.subject, "user-1");
        assert_eq!(claims.email, None);
        assert_eq!(claims.role, None);
    }

    #[tokio::test]
    async fn numeric_subject_is_normalized() {
        let token = TokenBuilder::numeric_subject(7).sign(SECRET);

        let claims = validator().validate(&token).await.unwrap();
        assert_eq!(claims.subject, "7");
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid() {
        let token = TokenBuilder::new("42").sign("not-the-secret");

        let err = validator().validate(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn expired_token_is_distinguished() {
        let token = TokenBuilder::new("42")
            .expires_in(Duration::minutes(-5))
            .sign(SECRET);

        let err = validator().validate(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::ExpiredToken));
        assert_eq!(err.reason(), "expired_token");
    }

    #[tokio::test]
    async fn leeway_accepts_recently_expired() {
        let token = TokenBuilder::new("42")
            .expires_in(Duration::seconds(-10))
            .sign(SECRET);
        let validator = HmacValidator::new(&AuthConfig::new(SECRET).with_leeway(60));

        assert!(validator.validate(&token).await.is_ok());
    }

    #[tokio::test]
    async fn garbage_is_invalid() {
        let err = validator().validate("not.a.jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn missing_exp_is_invalid() {
        let token = TokenBuilder::new("42").without_expiry().sign(SECRET);

        let err = validator().validate(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }
}
