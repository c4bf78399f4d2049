#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Forward geocoding of listing addresses.
//!
//! Converts one-line street addresses to latitude/longitude coordinates
//! using a multi-provider strategy configured via TOML files in
//! `services/`:
//!
//! 1. **US Census Bureau one-line geocoder** (priority 1): free, no API
//!    key.
//! 2. **Pelias** (priority 2): self-hosted, disabled unless an instance
//!    is available.
//! 3. **Nominatim / OpenStreetMap** (priority 3): free, 1 req/sec rate
//!    limit.
//!
//! Every provider implements [`Geocoder`]; [`chain::ProviderChain`] runs
//! the enabled ones in priority order and is itself a [`Geocoder`], so
//! callers see a single "precise lookup".

pub mod census;
pub mod chain;
pub mod nominatim;
pub mod pelias;
pub mod service_registry;

use listing_map_geography_models::Coordinate;
use thiserror::Error;

/// A geocoding result with coordinates and metadata.
#[derive(Debug, Clone)]
pub struct GeocodedAddress {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// The matched/canonical address returned by the geocoder.
    pub matched_address: Option<String>,
    /// Which provider resolved this address.
    pub provider: GeocodingProvider,
    /// Whether this was an exact or approximate match.
    pub match_quality: MatchQuality,
}

impl GeocodedAddress {
    /// The result as a [`Coordinate`].
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Which geocoding provider resolved an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocodingProvider {
    /// US Census Bureau Geocoder.
    Census,
    /// Self-hosted Pelias geocoder.
    Pelias,
    /// Nominatim / OpenStreetMap.
    Nominatim,
}

/// Quality of the geocoding match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchQuality {
    /// Exact address match.
    Exact,
    /// Approximate / non-exact match.
    Approximate,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// The provider returned several candidates and none can be preferred.
    #[error("Ambiguous address: {candidates} candidates")]
    Ambiguous {
        /// Number of candidates returned.
        candidates: usize,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// No provider is enabled or reachable.
    #[error("No geocoding provider available")]
    NoProvider,
}

/// Forward geocoding of a one-line address.
///
/// `Ok(None)` means the provider answered but found no match. Callers
/// treat both `Ok(None)` and `Err(_)` as "no precise coordinate".
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolves `address` to a coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the provider fails or the answer is
    /// unusable.
    async fn forward_geocode(&self, address: &str)
    -> Result<Option<GeocodedAddress>, GeocodeError>;
}
