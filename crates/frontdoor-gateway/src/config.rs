//! Gateway configuration.
//!
//! Configuration is read once at startup from environment variables. Reading
//! goes through a lookup function so tests never touch the process
//! environment.

use std::time::Duration;

use thiserror::Error;

use frontdoor_auth::AuthConfig;
use frontdoor_core::{RegistryError, ServiceRegistry};

/// Fatal configuration errors. The process exits before binding a socket.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `JWT_SECRET` is absent or empty.
    #[error("JWT_SECRET must be set")]
    MissingSecret,

    /// `PORT` is not a valid TCP port.
    #[error("invalid PORT {0:?}")]
    InvalidPort(String),

    /// A numeric variable could not be parsed.
    #[error("invalid value for {var}: {value:?}")]
    InvalidNumber {
        /// The variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A boolean variable could not be parsed.
    #[error("invalid boolean for {var}: {value:?}")]
    InvalidBool {
        /// The variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The service map is malformed and strict mode is enabled.
    #[error("invalid SERVICE_MAP: {0}")]
    Registry(#[from] RegistryError),

    /// The upstream HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Configuration for the gateway service.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Address to bind (`LISTEN_HOST`).
    pub listen_host: String,

    /// TCP port to bind (`PORT`).
    pub port: u16,

    /// Path prefix stripped before the service name, without slashes
    /// (`GLOBAL_PREFIX`). May be empty.
    pub global_prefix: String,

    /// Raw service map (`SERVICE_MAP`, falling back to `SERVICE_ROUTES`).
    pub service_map: String,

    /// Fail startup on malformed service map entries (`SERVICE_MAP_STRICT`).
    pub service_map_strict: bool,

    /// Token verification secret (`JWT_SECRET`).
    pub jwt_secret: String,

    /// Expiry leeway in seconds (`JWT_LEEWAY_SECONDS`).
    pub jwt_leeway_seconds: u64,

    /// Path prefixes admitted without a token (`AUTH_EXCLUDED_PREFIXES`).
    pub excluded_prefixes: Vec<String>,

    /// Time allowed until upstream response headers arrive (`UPSTREAM_TIMEOUT_MS`).
    pub upstream_timeout_ms: u64,

    /// Upstream connect timeout (`UPSTREAM_CONNECT_TIMEOUT_MS`).
    pub upstream_connect_timeout_ms: u64,

    /// Allowed CORS origins (`CORS_ORIGINS`). Empty disables CORS handling.
    pub cors_origins: Vec<String>,
}

impl GatewayConfig {
    fn default_listen_host() -> String {
        "0.0.0.0".to_string()
    }

    const fn default_port() -> u16 {
        3000
    }

    fn default_global_prefix() -> String {
        "api".to_string()
    }

    const fn default_upstream_timeout_ms() -> u64 {
        30_000
    }

    const fn default_upstream_connect_timeout_ms() -> u64 {
        5_000
    }

    /// Create a configuration with defaults and the given secret.
    #[must_use]
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        let global_prefix = Self::default_global_prefix();
        Self {
            listen_host: Self::default_listen_host(),
            port: Self::default_port(),
            excluded_prefixes: vec![format!("/{global_prefix}/auth")],
            global_prefix,
            service_map: String::new(),
            service_map_strict: false,
            jwt_secret: jwt_secret.into(),
            jwt_leeway_seconds: 0,
            upstream_timeout_ms: Self::default_upstream_timeout_ms(),
            upstream_connect_timeout_ms: Self::default_upstream_connect_timeout_ms(),
            cors_origins: Vec::new(),
        }
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is missing or a variable is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is missing or a variable is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::MissingSecret)?;
        let mut config = Self::new(jwt_secret);

        if let Some(host) = get("LISTEN_HOST") {
            config.listen_host = host;
        }
        if let Some(port) = get("PORT") {
            config.port = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
        }
        if let Some(prefix) = lookup("GLOBAL_PREFIX") {
            config.global_prefix = prefix.trim().trim_matches('/').to_string();
        }
        config.excluded_prefixes = match get("AUTH_EXCLUDED_PREFIXES") {
            Some(raw) => split_list(&raw),
            None if config.global_prefix.is_empty() => vec!["/auth".to_string()],
            None => vec![format!("/{}/auth", config.global_prefix)],
        };
        if let Some(map) = get("SERVICE_MAP").or_else(|| get("SERVICE_ROUTES")) {
            config.service_map = map;
        }
        if let Some(raw) = get("SERVICE_MAP_STRICT") {
            config.service_map_strict = parse_bool("SERVICE_MAP_STRICT", &raw)?;
        }
        if let Some(raw) = get("JWT_LEEWAY_SECONDS") {
            config.jwt_leeway_seconds = parse_number("JWT_LEEWAY_SECONDS", raw)?;
        }
        if let Some(raw) = get("UPSTREAM_TIMEOUT_MS") {
            config.upstream_timeout_ms = parse_number("UPSTREAM_TIMEOUT_MS", raw)?;
        }
        if let Some(raw) = get("UPSTREAM_CONNECT_TIMEOUT_MS") {
            config.upstream_connect_timeout_ms = parse_number("UPSTREAM_CONNECT_TIMEOUT_MS", raw)?;
        }
        if let Some(raw) = get("CORS_ORIGINS") {
            config.cors_origins = split_list(&raw);
        }

        Ok(config)
    }

    /// The `host:port` address to bind.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.port)
    }

    /// Get the upstream response timeout as a `Duration`.
    #[must_use]
    pub const fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    /// Get the upstream connect timeout as a `Duration`.
    #[must_use]
    pub const fn upstream_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_connect_timeout_ms)
    }

    /// Token verification settings.
    #[must_use]
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(self.jwt_secret.clone()).with_leeway(self.jwt_leeway_seconds)
    }

    /// Build the service registry from the configured map.
    ///
    /// # Errors
    ///
    /// Returns an error only in strict mode, when an entry is malformed.
    pub fn registry(&self) -> Result<ServiceRegistry, ConfigError> {
        if self.service_map_strict {
            Ok(ServiceRegistry::parse_strict(&self.service_map)?)
        } else {
            Ok(ServiceRegistry::parse(&self.service_map))
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("listen_host", &self.listen_host)
            .field("port", &self.port)
            .field("global_prefix", &self.global_prefix)
            .field("service_map", &self.service_map)
            .field("service_map_strict", &self.service_map_strict)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_leeway_seconds", &self.jwt_leeway_seconds)
            .field("excluded_prefixes", &self.excluded_prefixes)
            .field("upstream_timeout_ms", &self.upstream_timeout_ms)
            .field("upstream_connect_timeout_ms", &self.upstream_connect_timeout_ms)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: value.to_string(),
        }),
    }
}

fn parse_number(var: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { var, value })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        GatewayConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[("JWT_SECRET", "s3cr3t")]).unwrap();
        assert_eq!(config.listen_addr(), "0.0.0.0:3000");
        assert_eq!(config.global_prefix, "api");
        assert_eq!(config.excluded_prefixes, vec!["/api/auth"]);
        assert!(config.service_map.is_empty());
        assert!(!config.service_map_strict);
        assert_eq!(config.jwt_leeway_seconds, 0);
        assert_eq!(config.upstream_timeout(), Duration::from_secs(30));
        assert_eq!(config.upstream_connect_timeout(), Duration::from_secs(5));
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn missing_secret_is_fatal() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingSecret)));
        assert!(matches!(
            load(&[("JWT_SECRET", "  ")]),
            Err(ConfigError::MissingSecret)
        ));
    }

    #[test]
    fn invalid_port_is_fatal() {
        let err = load(&[("JWT_SECRET", "s"), ("PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(ref p) if p == "http"));

        let err = load(&[("JWT_SECRET", "s"), ("PORT", "70000")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(_)));
    }

    #[test]
    fn reads_all_variables() {
        let config = load(&[
            ("JWT_SECRET", "s3cr3t"),
            ("PORT", "8080"),
            ("LISTEN_HOST", "127.0.0.1"),
            ("GLOBAL_PREFIX", "/gateway/"),
            ("SERVICE_MAP", "orders=http://localhost:4001"),
            ("SERVICE_MAP_STRICT", "yes"),
            ("JWT_LEEWAY_SECONDS", "15"),
            ("AUTH_EXCLUDED_PREFIXES", "/gateway/auth, /gateway/public"),
            ("UPSTREAM_TIMEOUT_MS", "1500"),
            ("UPSTREAM_CONNECT_TIMEOUT_MS", "250"),
            ("CORS_ORIGINS", "http://localhost:4200"),
        ])
        .unwrap();

        assert_eq!(config.listen_addr(), "127.0.0.1:8080");
        assert_eq!(config.global_prefix, "gateway");
        assert_eq!(config.service_map, "orders=http://localhost:4001");
        assert!(config.service_map_strict);
        assert_eq!(config.auth_config().leeway_seconds, 15);
        assert_eq!(
            config.excluded_prefixes,
            vec!["/gateway/auth", "/gateway/public"]
        );
        assert_eq!(config.upstream_timeout(), Duration::from_millis(1500));
        assert_eq!(config.upstream_connect_timeout(), Duration::from_millis(250));
        assert_eq!(config.cors_origins, vec!["http://localhost:4200"]);
    }

    #[test]
    fn excluded_prefix_follows_global_prefix() {
        let config = load(&[("JWT_SECRET", "s"), ("GLOBAL_PREFIX", "v1")]).unwrap();
        assert_eq!(config.excluded_prefixes, vec!["/v1/auth"]);

        let config = load(&[("JWT_SECRET", "s"), ("GLOBAL_PREFIX", "")]).unwrap();
        assert_eq!(config.global_prefix, "");
        assert_eq!(config.excluded_prefixes, vec!["/auth"]);
    }

    #[test]
    fn service_routes_fallback() {
        let config = load(&[
            ("JWT_SECRET", "s"),
            ("SERVICE_ROUTES", "ads=http://localhost:3003"),
        ])
        .unwrap();
        assert_eq!(
            config.registry().unwrap().resolve("ads"),
            Some("http://localhost:3003")
        );
    }

    #[test]
    fn invalid_numbers_and_bools() {
        let err = load(&[("JWT_SECRET", "s"), ("UPSTREAM_TIMEOUT_MS", "soon")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidNumber { var: "UPSTREAM_TIMEOUT_MS", .. }
        ));

        let err = load(&[("JWT_SECRET", "s"), ("SERVICE_MAP_STRICT", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBool { .. }));
    }

    #[test]
    fn strict_registry_surfaces_errors() {
        let mut config = GatewayConfig::new("s");
        config.service_map = "orders=http://x,broken".to_string();
        assert_eq!(config.registry().unwrap().len(), 1);

        config.service_map_strict = true;
        assert!(matches!(config.registry(), Err(ConfigError::Registry(_))));
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", GatewayConfig::new("s3cr3t"));
        assert!(!rendered.contains("s3cr3t"));
    }
}
