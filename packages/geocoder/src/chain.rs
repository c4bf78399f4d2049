//! Priority-ordered provider chain.
//!
//! Runs the enabled providers one after another until one returns an
//! exact match. "No match" and errors both pass to the next provider. An
//! approximate match also passes on, and is returned only if no later
//! provider matches exactly. The chain fails only when every provider has
//! failed.

use std::sync::Arc;

use crate::census::CensusGeocoder;
use crate::nominatim::NominatimGeocoder;
use crate::pelias::PeliasGeocoder;
use crate::service_registry::{ProviderConfig, ServiceRegistry};
use crate::{GeocodeError, GeocodedAddress, Geocoder, MatchQuality};

/// A named provider in the chain.
struct ChainLink {
    id: String,
    geocoder: Arc<dyn Geocoder>,
}

/// Runs geocoding providers in priority order.
#[derive(Default)]
pub struct ProviderChain {
    links: Vec<ChainLink>,
}

impl ProviderChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a provider; providers run in insertion order.
    #[must_use]
    pub fn with_provider(mut self, id: impl Into<String>, geocoder: Arc<dyn Geocoder>) -> Self {
        self.links.push(ChainLink {
            id: id.into(),
            geocoder,
        });
        self
    }

    /// Builds a chain from the enabled services of `registry`, in
    /// priority order.
    #[must_use]
    pub fn from_registry(client: &reqwest::Client, registry: &ServiceRegistry) -> Self {
        registry
            .enabled()
            .into_iter()
            .fold(Self::new(), |chain, svc| {
                log::debug!("Geocoding provider '{}' (priority {})", svc.id, svc.priority);
                chain.with_provider(svc.id.clone(), provider_for(client, &svc.provider))
            })
    }

    /// Number of providers in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns `true` if the chain has no providers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Provider IDs in execution order.
    #[must_use]
    pub fn provider_ids(&self) -> Vec<&str> {
        self.links.iter().map(|l| l.id.as_str()).collect()
    }
}

fn provider_for(client: &reqwest::Client, config: &ProviderConfig) -> Arc<dyn Geocoder> {
    match config {
        ProviderConfig::Census {
            base_url,
            benchmark,
        } => Arc::new(CensusGeocoder::new(client.clone(), base_url, benchmark)),
        ProviderConfig::Pelias {
            base_url,
            country_code,
        } => Arc::new(PeliasGeocoder::new(client.clone(), base_url, country_code)),
        ProviderConfig::Nominatim {
            base_url,
            rate_limit_ms,
        } => Arc::new(NominatimGeocoder::new(
            client.clone(),
            base_url,
            *rate_limit_ms,
        )),
    }
}

#[async_trait::async_trait]
impl Geocoder for ProviderChain {
    async fn forward_geocode(
        &self,
        address: &str,
    ) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let mut answered = false;
        let mut last_error = None;
        let mut approximate: Option<GeocodedAddress> = None;

        for link in &self.links {
            match link.geocoder.forward_geocode(address).await {
                Ok(Some(hit)) if hit.match_quality == MatchQuality::Exact => return Ok(Some(hit)),
                Ok(Some(hit)) => {
                    log::debug!("{}: approximate match for '{address}'", link.id);
                    answered = true;
                    approximate.get_or_insert(hit);
                }
                Ok(None) => {
                    log::debug!("{}: no match for '{address}'", link.id);
                    answered = true;
                }
                Err(e) => {
                    log::warn!("{} error for '{address}': {e}", link.id);
                    last_error = Some(e);
                }
            }
        }

        if answered {
            return Ok(approximate);
        }
        Err(last_error.unwrap_or(GeocodeError::NoProvider))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::GeocodingProvider;

    enum Script {
        Hit(f64, f64),
        Rough(f64, f64),
        Miss,
        Fail,
    }

    struct Scripted {
        script: Script,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl Geocoder for Scripted {
        async fn forward_geocode(
            &self,
            _address: &str,
        ) -> Result<Option<GeocodedAddress>, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script {
                Script::Hit(latitude, longitude) => Ok(Some(GeocodedAddress {
                    latitude,
                    longitude,
                    matched_address: None,
                    provider: GeocodingProvider::Census,
                    match_quality: MatchQuality::Exact,
                })),
                Script::Rough(latitude, longitude) => Ok(Some(GeocodedAddress {
                    latitude,
                    longitude,
                    matched_address: None,
                    provider: GeocodingProvider::Nominatim,
                    match_quality: MatchQuality::Approximate,
                })),
                Script::Miss => Ok(None),
                Script::Fail => Err(GeocodeError::RateLimited),
            }
        }
    }

    #[tokio::test]
    async fn first_hit_wins() {
        let first = Scripted::new(Script::Hit(1.0, 2.0));
        let second = Scripted::new(Script::Hit(3.0, 4.0));
        let chain = ProviderChain::new()
            .with_provider("a", first.clone())
            .with_provider("b", second.clone());

        let hit = chain.forward_geocode("x").await.unwrap().unwrap();
        assert!((hit.latitude - 1.0).abs() < f64::EPSILON);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_through_misses_and_errors() {
        let chain = ProviderChain::new()
            .with_provider("a", Scripted::new(Script::Fail))
            .with_provider("b", Scripted::new(Script::Miss))
            .with_provider("c", Scripted::new(Script::Hit(5.0, 6.0)));

        let hit = chain.forward_geocode("x").await.unwrap().unwrap();
        assert!((hit.longitude - 6.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn exact_match_from_later_provider_beats_approximate() {
        let chain = ProviderChain::new()
            .with_provider("a", Scripted::new(Script::Rough(1.0, 2.0)))
            .with_provider("b", Scripted::new(Script::Hit(3.0, 4.0)));

        let hit = chain.forward_geocode("x").await.unwrap().unwrap();
        assert_eq!(hit.match_quality, MatchQuality::Exact);
        assert!((hit.latitude - 3.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn first_approximate_match_is_the_last_resort() {
        let chain = ProviderChain::new()
            .with_provider("a", Scripted::new(Script::Rough(1.0, 2.0)))
            .with_provider("b", Scripted::new(Script::Rough(7.0, 8.0)))
            .with_provider("c", Scripted::new(Script::Miss))
            .with_provider("d", Scripted::new(Script::Fail));

        let hit = chain.forward_geocode("x").await.unwrap().unwrap();
        assert_eq!(hit.match_quality, MatchQuality::Approximate);
        assert!((hit.latitude - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn miss_beats_error_when_nothing_matches() {
        let chain = ProviderChain::new()
            .with_provider("a", Scripted::new(Script::Fail))
            .with_provider("b", Scripted::new(Script::Miss));

        assert!(chain.forward_geocode("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn all_errors_propagate_last_error() {
        let chain = ProviderChain::new().with_provider("a", Scripted::new(Script::Fail));
        assert!(matches!(
            chain.forward_geocode("x").await,
            Err(GeocodeError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn empty_chain_has_no_provider() {
        let chain = ProviderChain::new();
        assert!(chain.is_empty());
        assert!(matches!(
            chain.forward_geocode("x").await,
            Err(GeocodeError::NoProvider)
        ));
    }

    #[test]
    fn registry_chain_follows_priority() {
        let registry = ServiceRegistry::embedded().unwrap();
        let chain = ProviderChain::from_registry(&reqwest::Client::new(), &registry);
        assert_eq!(chain.provider_ids(), vec!["census", "nominatim"]);
        assert_eq!(chain.len(), 2);
    }
}
