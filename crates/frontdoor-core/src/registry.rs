//! The service registry.
//!
//! Maps a service name to the base URL of the backend that serves it. The
//! registry is built once from configuration and never changes afterwards,
//! so lookups need no synchronization.

use std::collections::HashMap;

use crate::error::{RegistryError, Result};
use crate::ids::ServiceName;

/// A configured service and the base URL requests are forwarded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// The service name.
    pub name: ServiceName,
    /// Absolute base URL without a trailing slash, e.g. `http://localhost:4001`.
    pub base_url: String,
}

/// How malformed entries are treated while building a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Log and skip.
    Lenient,
    /// Fail on the first malformed entry.
    Strict,
}

/// Immutable map from service name to backend base URL.
///
/// # Configuration format
///
/// Either `name1=url1,name2=url2,...` or a JSON object
/// `{"name1":"url1","name2":"url2"}`. In the pair form each entry is split on
/// the first `=`, so URLs may contain `=` in their query.
///
/// When the same name appears more than once, the last occurrence wins and
/// the override is logged.
///
/// Presence in the registry says nothing about whether the backend is up.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<ServiceName, String>,
}

impl ServiceRegistry {
    /// Build a registry, skipping malformed entries.
    ///
    /// Skipped entries are logged at `warn` level. An unparseable JSON map
    /// yields an empty registry.
    #[must_use]
    pub fn parse(config: &str) -> Self {
        match Self::build(config, Mode::Lenient) {
            Ok(registry) => registry,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring service map");
                Self::default()
            }
        }
    }

    /// Build a registry, failing on the first malformed entry.
    ///
    /// # Errors
    ///
    /// Returns an error if any entry is malformed, a name is invalid, a base
    /// URL is not an absolute `http`/`https` URL, or the JSON form is invalid.
    pub fn parse_strict(config: &str) -> Result<Self> {
        Self::build(config, Mode::Strict)
    }

    /// Look up the base URL configured for `name`.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.services.get(name).map(String::as_str)
    }

    /// Number of configured services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether no services are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// All entries, sorted by name.
    #[must_use]
    pub fn entries(&self) -> Vec<RegistryEntry> {
        let mut entries: Vec<_> = self
            .services
            .iter()
            .map(|(name, base_url)| RegistryEntry {
                name: name.clone(),
                base_url: base_url.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    fn build(config: &str, mode: Mode) -> Result<Self> {
        let config = config.trim();
        let mut registry = Self::default();

        if config.starts_with('{') {
            let map: HashMap<String, String> = serde_json::from_str(config)?;
            let mut pairs: Vec<_> = map.into_iter().collect();
            pairs.sort();
            for (name, url) in pairs {
                registry.add(name.trim(), url.trim(), mode)?;
            }
            return Ok(registry);
        }

        for raw in config.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match raw.split_once('=') {
                Some((name, url)) if !name.trim().is_empty() && !url.trim().is_empty() => {
                    registry.add(name.trim(), url.trim(), mode)?;
                }
                _ => reject(mode, RegistryError::MalformedEntry(raw.to_string()))?,
            }
        }

        Ok(registry)
    }

    fn add(&mut self, name: &str, url: &str, mode: Mode) -> Result<()> {
        let service = match ServiceName::parse(name) {
            Ok(service) => service,
            Err(source) => {
                return reject(
                    mode,
                    RegistryError::InvalidName {
                        name: name.to_string(),
                        source,
                    },
                );
            }
        };

        if !is_absolute_http_url(url) {
            return reject(
                mode,
                RegistryError::InvalidBaseUrl {
                    name: name.to_string(),
                    url: url.to_string(),
                },
            );
        }

        let base_url = url.trim_end_matches('/').to_string();
        if let Some(previous) = self.services.insert(service, base_url.clone()) {
            tracing::warn!(
                service = %name,
                previous = %previous,
                base_url = %base_url,
                "Duplicate service name, last entry wins"
            );
        }
        Ok(())
    }
}

fn reject(mode: Mode, err: RegistryError) -> Result<()> {
    match mode {
        Mode::Strict => Err(err),
        Mode::Lenient => {
            tracing::warn!(error = %err, "Skipping service entry");
            Ok(())
        }
    }
}

fn is_absolute_http_url(raw: &str) -> bool {
    url::Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}
