//! Engine configuration.
//!
//! Defaults are embedded from `config/default.toml`. An override file may
//! be given explicitly or through the `LISTING_MAP_CONFIG` environment
//! variable; keys it omits keep their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use listing_map_geography_models::Coordinate;
use listing_map_map_models::{Span, Viewport, ViewportSource};
use listing_map_resolver::ResolverConfig;
use serde::Deserialize;

/// Environment variable naming an override config file.
pub const CONFIG_ENV_VAR: &str = "LISTING_MAP_CONFIG";

/// The embedded default configuration.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`MapConfig`].
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Resolver and cache tunables.
    pub resolver: ResolverConfig,
    /// Highlight loading behavior.
    pub highlight: HighlightConfig,
    /// Viewport spans and the default region.
    pub viewport: ViewportConfig,
}

/// Highlight loading behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// How long the loading indicator may stay on, in milliseconds.
    pub loading_timeout_ms: u64,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            loading_timeout_ms: 3000,
        }
    }
}

impl HighlightConfig {
    #[must_use]
    pub const fn loading_timeout(&self) -> Duration {
        Duration::from_millis(self.loading_timeout_ms)
    }
}

/// Viewport spans (degrees) and the default region.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Span around a highlighted listing.
    pub close_up_delta: f64,
    /// Span around the device location.
    pub neighborhood_delta: f64,
    /// Span around the first listing.
    pub wide_delta: f64,
    pub default_latitude: f64,
    pub default_longitude: f64,
    pub default_latitude_delta: f64,
    pub default_longitude_delta: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            close_up_delta: 0.01,
            neighborhood_delta: 0.1,
            wide_delta: 0.5,
            default_latitude: 39.8283,
            default_longitude: -98.5795,
            default_latitude_delta: 30.0,
            default_longitude_delta: 60.0,
        }
    }
}

impl ViewportConfig {
    /// The region shown when nothing else is known.
    #[must_use]
    pub const fn default_region(&self) -> Viewport {
        Viewport {
            center: Coordinate::new(self.default_latitude, self.default_longitude),
            span: Span::new(self.default_latitude_delta, self.default_longitude_delta),
            source: ViewportSource::Default,
        }
    }
}

impl MapConfig {
    /// Parses a config, filling omitted keys from the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if `content` is not valid.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not valid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads `path` if given, else the file named by
    /// [`CONFIG_ENV_VAR`], else the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            log::info!("Loading config from {}", path.display());
            return Self::from_file(path);
        }

        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(env_path) if !env_path.is_empty() => {
                let path = PathBuf::from(env_path);
                log::info!("Loading config from {} ({CONFIG_ENV_VAR})", path.display());
                Self::from_file(&path)
            }
            _ => Self::from_toml_str(DEFAULT_CONFIG_TOML),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_match_default_impl() {
        let parsed = MapConfig::from_toml_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(parsed, MapConfig::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = MapConfig::from_toml_str(
            "[highlight]\nloading_timeout_ms = 500\n\n[resolver]\nmax_concurrent_lookups = 2\n",
        )
        .unwrap();

        assert_eq!(config.highlight.loading_timeout(), Duration::from_millis(500));
        assert_eq!(config.resolver.max_concurrent_lookups, 2);
        assert_eq!(config.resolver.cache_capacity, 2048);
        assert_eq!(config.viewport, ViewportConfig::default());
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let err = MapConfig::from_toml_str("[highlight]\nloading_timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = MapConfig::from_file(Path::new("/nonexistent/listing_map.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn default_region_is_tagged_default() {
        let region = ViewportConfig::default().default_region();
        assert_eq!(region.source, ViewportSource::Default);
        assert!(region.center.is_valid());
    }
}
