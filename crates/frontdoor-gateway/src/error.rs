//! API error types and responses.
//!
//! Every failure the gateway itself produces ends up as an [`ApiError`] and
//! is rendered with the same JSON shape. Responses relayed from a backend
//! never pass through here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use frontdoor_auth::AuthError;

use crate::proxy::{RoutingError, UpstreamError};

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, invalid or expired bearer token.
    #[error("unauthorized")]
    Unauthorized,

    /// No backend is registered for the requested service.
    #[error("unknown service: {0}")]
    UnknownService(String),

    /// The backend could not be reached.
    #[error("bad gateway: {0}")]
    BadGateway(String),

    /// The backend did not answer in time.
    #[error("gateway timeout")]
    GatewayTimeout,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::UnknownService(_) => StatusCode::NOT_FOUND,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::UnknownService(_) => "not_found",
            Self::BadGateway(_) => "bad_gateway",
            Self::GatewayTimeout => "gateway_timeout",
            Self::Internal(_) => "internal_error",
        }
    }

    /// The message sent to the client. Upstream and internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::UnknownService(name) => format!("unknown service: {name}"),
            Self::BadGateway(_) => "bad gateway".to_string(),
            Self::Internal(_) => "internal error".to_string(),
            Self::Unauthorized | Self::GatewayTimeout => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let Self::Internal(detail) = &self {
            tracing::error!(error = %detail, "Internal error");
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.public_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(_: AuthError) -> Self {
        Self::Unauthorized
    }
}

impl From<RoutingError> for ApiError {
    fn from(err: RoutingError) -> Self {
        match err {
            RoutingError::UnknownService(name) => Self::UnknownService(name),
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::ConnectionRefused(detail) => Self::BadGateway(detail),
            UpstreamError::Timeout => Self::GatewayTimeout,
        }
    }
}
