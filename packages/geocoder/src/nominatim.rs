//! Nominatim / OpenStreetMap geocoder client.
//!
//! Used as the last provider when Census and Pelias fail to match.
//! Nominatim has strict rate limits: **1 request per second** maximum.
//! [`NominatimGeocoder`] enforces the configured interval itself, so
//! concurrent callers queue behind one another.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{GeocodeError, GeocodedAddress, Geocoder, GeocodingProvider, MatchQuality};

/// Rate-limited Nominatim client.
#[derive(Debug)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    /// Creates a client that waits at least `rate_limit_ms` between requests.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str, rate_limit_ms: u64) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            min_interval: Duration::from_millis(rate_limit_ms),
            last_request: Mutex::new(None),
        }
    }

    /// Waits until the next request slot is free and claims it.
    async fn wait_for_slot(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let next = prev + self.min_interval;
            if next > Instant::now() {
                tokio::time::sleep_until(next).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait::async_trait]
impl Geocoder for NominatimGeocoder {
    async fn forward_geocode(
        &self,
        address: &str,
    ) -> Result<Option<GeocodedAddress>, GeocodeError> {
        self.wait_for_slot().await;
        geocode_freeform(&self.client, &self.base_url, address).await
    }
}

/// Geocodes a free-form query using Nominatim.
///
/// The caller is responsible for rate limiting (see `rate_limit_ms` in the
/// service TOML configuration).
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request or response parsing fails.
pub async fn geocode_freeform(
    client: &reqwest::Client,
    base_url: &str,
    query: &str,
) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let resp = client
        .get(base_url)
        .query(&[
            ("q", query),
            ("countrycodes", "us"),
            ("format", "jsonv2"),
            ("limit", "1"),
        ])
        .send()
        .await?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }

    let body: serde_json::Value = resp.json().await?;
    parse_response(&body)
}

/// Parses Nominatim JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let lon = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    let display_name = first["display_name"].as_str().map(String::from);

    // Nominatim places building-level hits in the "building"/"place" classes;
    // anything coarser is only an approximation of the street address.
    let quality = match first["addresstype"].as_str() {
        Some("building" | "house" | "place") => MatchQuality::Exact,
        _ => MatchQuality::Approximate,
    };

    Ok(Some(GeocodedAddress {
        latitude: lat,
        longitude: lon,
        matched_address: display_name,
        provider: GeocodingProvider::Nominatim,
        match_quality: quality,
    }))
}
