//! Router configuration.
//!
//! This module sets up the Axum router and assembles the request pipeline.

use std::any::Any as PanicPayload;
use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use frontdoor_auth::JwtValidator;

use crate::auth::AuthGate;
use crate::error::ApiError;
use crate::handlers::{gateway, health};
use crate::pipeline::{Pipeline, Stage};
use crate::proxy::ProxyRouter;
use crate::state::GatewayState;

/// Build the request pipeline: the auth gate, then the proxy router.
pub fn build_pipeline<V>(state: &GatewayState<V>) -> Pipeline
where
    V: JwtValidator + 'static,
{
    let gate: Arc<dyn Stage> = Arc::new(AuthGate::new(
        Arc::clone(&state.jwt_validator),
        &state.config.excluded_prefixes,
    ));
    let router: Arc<dyn Stage> = Arc::new(ProxyRouter::new(
        Arc::clone(&state.registry),
        state.client.clone(),
        &state.config.global_prefix,
        state.config.upstream_timeout(),
    ));

    Pipeline::new(vec![gate, router])
}

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// - `GET /health` - Health check (public)
/// - everything else, other methods on `/health` included - the request pipeline
pub fn create_router<V>(state: GatewayState<V>) -> Router
where
    V: JwtValidator + 'static,
{
    let pipeline = build_pipeline(&state);
    router_with_pipeline(pipeline, &state.config.cors_origins)
}

/// Create the router around an already assembled pipeline.
///
/// CORS is only enabled when `cors_origins` is non-empty.
pub fn router_with_pipeline(pipeline: Pipeline, cors_origins: &[String]) -> Router {
    tracing::debug!(stages = ?pipeline.stage_names(), "Pipeline assembled");

    let router = Router::new()
        .route("/health", get(health::health).fallback(gateway::proxy))
        .fallback(gateway::proxy)
        .with_state(Arc::new(pipeline))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic));

    if cors_origins.is_empty() {
        router
    } else {
        router.layer(build_cors_layer(cors_origins))
    }
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Render a panic in a handler or stage as a 500.
#[allow(clippy::needless_pass_by_value)]
fn handle_panic(payload: Box<dyn PanicPayload + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    ApiError::Internal(format!("panic: {detail}")).into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    #[test]
    fn cors_any_origin() {
        let origins = vec!["*".to_string()];
        let _layer = build_cors_layer(&origins);
    }

    #[test]
    fn cors_specific_origins() {
        let origins = vec![
            "http://localhost:3000".to_string(),
            "https://app.example.com".to_string(),
        ];
        let _layer = build_cors_layer(&origins);
    }

    #[test]
    fn panic_becomes_internal_error() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = handle_panic(Box::new(String::from("boom")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
