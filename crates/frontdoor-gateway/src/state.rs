//! Gateway application state.
//!
//! Built once at startup and shared read-only by every request.

use std::sync::Arc;

use frontdoor_auth::JwtValidator;
use frontdoor_core::ServiceRegistry;

use crate::config::{ConfigError, GatewayConfig};
use crate::proxy::build_client;

/// Shared application state for the gateway.
pub struct GatewayState<V>
where
    V: JwtValidator,
{
    /// The service name to backend map.
    pub registry: Arc<ServiceRegistry>,
    /// The JWT validator for authentication.
    pub jwt_validator: Arc<V>,
    /// The pooled outbound HTTP client.
    pub client: reqwest::Client,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<V> GatewayState<V>
where
    V: JwtValidator,
{
    /// Create a new gateway state.
    ///
    /// # Errors
    ///
    /// Returns an error if the outbound HTTP client cannot be built.
    pub fn new(
        registry: ServiceRegistry,
        jwt_validator: Arc<V>,
        config: GatewayConfig,
    ) -> Result<Self, ConfigError> {
        let client = build_client(config.upstream_connect_timeout())?;
        Ok(Self {
            registry: Arc::new(registry),
            jwt_validator,
            client,
            config,
        })
    }
}

impl<V> Clone for GatewayState<V>
where
    V: JwtValidator,
{
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            jwt_validator: Arc::clone(&self.jwt_validator),
            client: self.client.clone(),
            config: self.config.clone(),
        }
    }
}
