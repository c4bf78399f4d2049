//! Geocoding service definitions.
//!
//! Each provider is described by a TOML file under `services/`, embedded
//! at compile time. A [`ServiceRegistry`] parses them and hands out the
//! enabled ones in priority order.

use serde::Deserialize;

use crate::GeocodeError;

/// One geocoding service definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"census"`).
    pub id: String,
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Lower values run first.
    pub priority: u32,
    pub provider: ProviderConfig,
}

/// Provider settings, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// US Census Bureau one-line address geocoder.
    Census {
        base_url: String,
        /// Address benchmark (e.g., `"Public_AR_Current"`).
        benchmark: String,
    },
    /// Self-hosted Pelias.
    Pelias {
        base_url: String,
        /// Country the search is bounded to.
        country_code: String,
    },
    /// Nominatim / `OpenStreetMap`.
    Nominatim {
        base_url: String,
        /// Minimum spacing between requests, in milliseconds.
        rate_limit_ms: u64,
    },
}

const fn enabled_by_default() -> bool {
    true
}

impl ProviderConfig {
    #[must_use]
    pub fn base_url(&self) -> &str {
        match self {
            Self::Census { base_url, .. }
            | Self::Pelias { base_url, .. }
            | Self::Nominatim { base_url, .. } => base_url,
        }
    }
}

impl GeocodingService {
    /// Parses one service definition.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Parse`] if the TOML does not describe a
    /// service.
    pub fn from_toml_str(content: &str) -> Result<Self, GeocodeError> {
        toml::from_str(content).map_err(|e| GeocodeError::Parse {
            message: format!("Invalid geocoding service definition: {e}"),
        })
    }
}

const EMBEDDED: &[(&str, &str)] = &[
    ("census", include_str!("../services/census.toml")),
    ("pelias", include_str!("../services/pelias.toml")),
    ("nominatim", include_str!("../services/nominatim.toml")),
];

/// Parsed service definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceRegistry {
    services: Vec<GeocodingService>,
}

impl ServiceRegistry {
    /// Parses `(file name, TOML)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Parse`] naming the first file that fails, or
    /// if two files share an id.
    pub fn from_sources(sources: &[(&str, &str)]) -> Result<Self, GeocodeError> {
        let mut services: Vec<GeocodingService> = Vec::with_capacity(sources.len());

        for (file, content) in sources {
            let service = GeocodingService::from_toml_str(content).map_err(|e| {
                GeocodeError::Parse {
                    message: format!("{file}.toml: {e}"),
                }
            })?;
            if services.iter().any(|s| s.id == service.id) {
                return Err(GeocodeError::Parse {
                    message: format!("{file}.toml: duplicate service id '{}'", service.id),
                });
            }
            services.push(service);
        }

        Ok(Self { services })
    }

    /// The definitions shipped with this crate.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Parse`] if an embedded file is malformed.
    pub fn embedded() -> Result<Self, GeocodeError> {
        Self::from_sources(EMBEDDED)
    }

    /// All services in file order, enabled or not.
    #[must_use]
    pub fn services(&self) -> &[GeocodingService] {
        &self.services
    }

    /// Enabled services, lowest priority value first.
    #[must_use]
    pub fn enabled(&self) -> Vec<&GeocodingService> {
        let mut enabled: Vec<&GeocodingService> =
            self.services.iter().filter(|s| s.enabled).collect();
        enabled.sort_by_key(|s| s.priority);
        enabled
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&GeocodingService> {
        self.services.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL_NOMINATIM: &str = r#"
        id = "local"
        name = "Local Nominatim"
        priority = 5

        [provider]
        type = "nominatim"
        base_url = "http://localhost:8080/search"
        rate_limit_ms = 0
    "#;

    #[test]
    fn embedded_services_parse() {
        let registry = ServiceRegistry::embedded().unwrap();
        assert_eq!(registry.services().len(), EMBEDDED.len());
        for svc in registry.services() {
            assert!(!svc.name.is_empty(), "{} has no name", svc.id);
            assert!(!svc.provider.base_url().is_empty(), "{} has no base_url", svc.id);
        }
    }

    #[test]
    fn enabled_runs_census_then_nominatim() {
        let registry = ServiceRegistry::embedded().unwrap();
        let ids: Vec<&str> = registry.enabled().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["census", "nominatim"]);
        assert!(!registry.get("pelias").unwrap().enabled);
    }

    #[test]
    fn nominatim_is_rate_limited() {
        let registry = ServiceRegistry::embedded().unwrap();
        assert!(matches!(
            registry.get("nominatim").map(|s| &s.provider),
            Some(ProviderConfig::Nominatim { rate_limit_ms, .. }) if *rate_limit_ms >= 1000
        ));
    }

    #[test]
    fn enabled_defaults_to_true() {
        let svc = GeocodingService::from_toml_str(LOCAL_NOMINATIM).unwrap();
        assert!(svc.enabled);
        assert_eq!(svc.provider.base_url(), "http://localhost:8080/search");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = ServiceRegistry::from_sources(&[
            ("a", LOCAL_NOMINATIM),
            ("b", LOCAL_NOMINATIM),
        ])
        .unwrap_err();
        assert!(matches!(err, GeocodeError::Parse { message } if message.contains("duplicate")));
    }

    #[test]
    fn unknown_provider_type_names_the_file() {
        let err = ServiceRegistry::from_sources(&[(
            "pigeon",
            "id = \"x\"\nname = \"X\"\npriority = 1\n\n[provider]\ntype = \"carrier_pigeon\"\n",
        )])
        .unwrap_err();
        assert!(matches!(err, GeocodeError::Parse { message } if message.starts_with("pigeon.toml")));
    }
}
