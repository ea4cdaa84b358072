//! Authenticating reverse-proxy gateway.
//!
//! A single public entry point in front of a set of internal backend
//! services. Every request runs through a fixed pipeline:
//!
//! - the **auth gate** verifies the bearer token, unless the path is under
//!   an excluded prefix, and attaches the verified claims
//! - the **proxy router** picks the backend from the first path segment
//!   after the global prefix, strips the prefix and service name, and
//!   streams the request to the backend and its response back
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Clients                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │  GET /api/orders/42
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     frontdoor-gateway                       │
//! │  ┌─────────────┐      ┌─────────────┐     ┌─────────────┐   │
//! │  │  /health    │      │  Auth gate  │ ──▶ │ Proxy router│   │
//! │  └─────────────┘      └─────────────┘     └─────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                                                  │  GET /42
//!               ┌──────────────┬───────────────────┤
//!               ▼              ▼                   ▼
//!        ┌──────────┐   ┌──────────┐        ┌──────────┐
//!        │  orders  │   │  users   │  ...   │  ads     │
//!        └──────────┘   └──────────┘        └──────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use frontdoor_gateway::{create_router, GatewayConfig, GatewayState};
//! use frontdoor_auth::HmacValidator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = GatewayConfig::new("s3cr3t");
//! config.service_map = "orders=http://localhost:4001".to_string();
//!
//! let registry = config.registry()?;
//! let jwt_validator = Arc::new(HmacValidator::new(&config.auth_config()));
//! let state = GatewayState::new(registry, jwt_validator, config)?;
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod proxy;
pub mod routes;
pub mod state;

pub use auth::AuthGate;
pub use config::{ConfigError, GatewayConfig};
pub use context::RequestContext;
pub use error::ApiError;
pub use pipeline::{Flow, Pipeline, Stage};
pub use proxy::{ProxyRouter, RoutingError, UpstreamError};
pub use routes::{build_pipeline, create_router, router_with_pipeline};
pub use state::GatewayState;
