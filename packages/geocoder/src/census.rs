//! US Census Bureau Geocoder client.
//!
//! Uses the Census Bureau's free one-line address endpoint. No API key
//! required.
//!
//! - `GET /geocoder/locations/onelineaddress`
//!
//! See <https://geocoding.geo.census.gov/geocoder/Geocoding_Services_API.html>

use crate::{GeocodeError, GeocodedAddress, Geocoder, GeocodingProvider, MatchQuality};

/// Census one-line geocoder bound to a base URL and benchmark.
#[derive(Debug, Clone)]
pub struct CensusGeocoder {
    client: reqwest::Client,
    base_url: String,
    benchmark: String,
}

impl CensusGeocoder {
    /// Creates a client for the given API base URL and benchmark.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str, benchmark: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            benchmark: benchmark.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Geocoder for CensusGeocoder {
    async fn forward_geocode(
        &self,
        address: &str,
    ) -> Result<Option<GeocodedAddress>, GeocodeError> {
        geocode_one_line(&self.client, &self.base_url, &self.benchmark, address).await
    }
}

/// Geocodes a one-line address using the Census Bureau endpoint.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request or response parsing fails,
/// or if the address matches more than one location.
pub async fn geocode_one_line(
    client: &reqwest::Client,
    base_url: &str,
    benchmark: &str,
    address: &str,
) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let url = format!("{base_url}/locations/onelineaddress");
    let resp = client
        .get(&url)
        .query(&[
            ("address", address),
            ("benchmark", benchmark),
            ("format", "json"),
        ])
        .send()
        .await?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }

    let body: serde_json::Value = resp.json().await?;
    parse_response(&body)
}

/// Parses the JSON response from the one-line endpoint.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let matches =
        body["result"]["addressMatches"]
            .as_array()
            .ok_or_else(|| GeocodeError::Parse {
                message: "Missing addressMatches array".to_string(),
            })?;

    let first = match matches.as_slice() {
        [] => return Ok(None),
        [only] => only,
        many => {
            return Err(GeocodeError::Ambiguous {
                candidates: many.len(),
            });
        }
    };

    let x = first["coordinates"]["x"]
        .as_f64()
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing x coordinate".to_string(),
        })?;
    let y = first["coordinates"]["y"]
        .as_f64()
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing y coordinate".to_string(),
        })?;

    let matched_address = first["matchedAddress"].as_str().map(String::from);

    Ok(Some(GeocodedAddress {
        latitude: y,
        longitude: x,
        matched_address,
        provider: GeocodingProvider::Census,
        match_quality: MatchQuality::Exact,
    }))
}
