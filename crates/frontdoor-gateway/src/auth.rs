//! The authentication gate.
//!
//! First stage of the pipeline. Requests under an excluded prefix pass
//! through untouched; every other request must carry a valid bearer token,
//! whose claims are attached to the context for later stages.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use frontdoor_auth::{bearer_token, AuthError, Claims, JwtValidator};

use crate::context::{has_dot_segment, RequestContext};
use crate::error::ApiError;
use crate::pipeline::{Flow, Stage};

/// Pipeline stage that verifies bearer tokens.
pub struct AuthGate<V> {
    jwt_validator: Arc<V>,
    excluded_prefixes: Vec<String>,
}

impl<V: JwtValidator> AuthGate<V> {
    /// Create a gate that admits `excluded_prefixes` without a token.
    ///
    /// Prefixes are normalized to a leading `/` and no trailing `/`.
    #[must_use]
    pub fn new(jwt_validator: Arc<V>, excluded_prefixes: &[String]) -> Self {
        let excluded_prefixes = excluded_prefixes
            .iter()
            .map(|p| format!("/{}", p.trim().trim_matches('/')))
            .collect();

        Self {
            jwt_validator,
            excluded_prefixes,
        }
    }

    /// Whether `path` falls under an excluded prefix.
    ///
    /// Matching is per path segment: `/api/auth` covers `/api/auth` and
    /// `/api/auth/login`, not `/api/authors`. A path with a `.` or `..`
    /// segment is never excluded, since it may resolve outside the prefix.
    #[must_use]
    pub fn is_excluded(&self, path: &str) -> bool {
        if has_dot_segment(path) {
            return false;
        }
        self.excluded_prefixes.iter().any(|prefix| {
            let prefix = prefix.trim_end_matches('/');
            match path.strip_prefix(prefix) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            }
        })
    }

    async fn authenticate(&self, headers: &HeaderMap) -> Result<Claims, AuthError> {
        let header = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let token = bearer_token(header)?;
        self.jwt_validator.validate(token).await
    }
}

#[async_trait]
impl<V: JwtValidator + 'static> Stage for AuthGate<V> {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn run(&self, mut ctx: RequestContext) -> Result<Flow, ApiError> {
        if self.is_excluded(ctx.path()) {
            tracing::debug!(path = %ctx.path(), "Excluded path, skipping token check");
            return Ok(Flow::Continue(ctx));
        }

        match self.authenticate(&ctx.headers).await {
            Ok(claims) => {
                tracing::debug!(subject = %claims.subject, path = %ctx.path(), "Authenticated request");
                ctx.claims = Some(claims);
                Ok(Flow::Continue(ctx))
            }
            Err(err) => {
                tracing::debug!(
                    reason = err.reason(),
                    error = %err,
                    method = %ctx.method,
                    path = %ctx.path(),
                    "Rejected request"
                );
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{HeaderValue, Method, StatusCode};
    use axum::response::IntoResponse;
    use chrono::Duration;
    use frontdoor_auth::testing::TokenBuilder;
    use frontdoor_auth::{AuthConfig, HmacValidator};

    use super::*;

    const SECRET: &str = "s3cr3t";

    fn gate() -> AuthGate<HmacValidator> {
        AuthGate::new(
            Arc::new(HmacValidator::new(&AuthConfig::new(SECRET))),
            &["/api/auth/".to_string(), "public".to_string()],
        )
    }

    fn ctx(path: &str, authorization: Option<&str>) -> RequestContext {
        let mut headers = HeaderMap::new();
        if let Some(value) = authorization {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        }
        RequestContext::new(Method::GET, path.parse().unwrap(), headers, Body::empty())
    }

    fn rejected(result: Result<Flow, ApiError>) -> StatusCode {
        match result {
            Err(err) => err.into_response().status(),
            Ok(flow) => panic!("expected rejection, got {flow:?}"),
        }
    }

    #[test]
    fn exclusion_is_segment_aware() {
        let gate = gate();
        assert!(gate.is_excluded("/api/auth"));
        assert!(gate.is_excluded("/api/auth/login"));
        assert!(gate.is_excluded("/public/logo.png"));
        assert!(!gate.is_excluded("/api/authors"));
        assert!(!gate.is_excluded("/api/orders/42"));
        assert!(!gate.is_excluded("/"));
    }

    #[test]
    fn dot_segments_are_never_excluded() {
        let gate = gate();
        assert!(!gate.is_excluded("/api/auth/../orders/42"));
        assert!(!gate.is_excluded("/api/auth/../../orders-svc/42"));
        assert!(!gate.is_excluded("/api/auth/%2e%2e/orders/42"));
        assert!(!gate.is_excluded("/public/./x"));
    }

    #[tokio::test]
    async fn traversal_out_of_excluded_prefix_needs_a_token() {
        let result = gate().run(ctx("/api/auth/../../orders-svc/42", None)).await;
        assert_eq!(rejected(result), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn excluded_path_is_admitted_without_claims() {
        let result = gate().run(ctx("/api/auth/login", None)).await;
        match result {
            Ok(Flow::Continue(ctx)) => assert!(ctx.claims.is_none()),
            other => panic!("expected continue, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        assert_eq!(
            rejected(gate().run(ctx("/api/orders/42", None)).await),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn non_bearer_header_is_rejected() {
        let result = gate()
            .run(ctx("/api/orders/42", Some("Basic dXNlcjpwYXNz")))
            .await;
        assert_eq!(rejected(result), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrongly_signed_token_is_rejected() {
        let token = TokenBuilder::new("1").sign("other-secret");
        let result = gate()
            .run(ctx("/api/orders/42", Some(&format!("Bearer {token}"))))
            .await;
        assert_eq!(rejected(result), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let token = TokenBuilder::new("1")
            .expires_in(Duration::hours(-1))
            .sign(SECRET);
        let result = gate()
            .run(ctx("/api/orders/42", Some(&format!("Bearer {token}"))))
            .await;
        assert_eq!(rejected(result), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejection_reasons_stay_distinct() {
        let gate = gate();
        let expired = TokenBuilder::new("1")
            .expires_in(Duration::hours(-1))
            .sign(SECRET);
        let forged = TokenBuilder::new("1").sign("other-secret");

        let err = gate
            .authenticate(&ctx("/api/x", Some(&format!("Bearer {expired}"))).headers)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ExpiredToken));

        let err = gate
            .authenticate(&ctx("/api/x", Some(&format!("Bearer {forged}"))).headers)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));

        let err = gate.authenticate(&ctx("/api/x", None).headers).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
    }

    #[tokio::test]
    async fn valid_token_attaches_claims() {
        let token = TokenBuilder::new("42").email("ada@example.com").sign(SECRET);
        let result = gate()
            .run(ctx("/api/orders/42", Some(&format!("Bearer {token}"))))
            .await;

        match result {
            Ok(Flow::Continue(ctx)) => {
                let claims = ctx.claims.expect("claims attached");
                assert_eq!(claims.subject, "42");
                assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
            }
            other => panic!("expected continue, got {other:?}"),
        }
    }
}
