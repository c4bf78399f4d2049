//! Client for a self-hosted Pelias instance.
//!
//! Queries `/v1/search` restricted to address and venue layers and reads
//! the top feature of the returned `GeoJSON` collection. An instance
//! behind Cloudflare Zero Trust Access needs `CF_ACCESS_CLIENT_ID` and
//! `CF_ACCESS_CLIENT_SECRET` in the environment.
//!
//! See <https://github.com/pelias/documentation/blob/master/search.md>

use std::time::Duration;

use serde::Deserialize;

use crate::{GeocodeError, GeocodedAddress, Geocoder, GeocodingProvider, MatchQuality};

/// Pelias confidence at or above which a match counts as exact.
const EXACT_CONFIDENCE: f64 = 0.9;

/// Cloudflare Access service token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfAccessCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl CfAccessCredentials {
    /// Reads the token from `CF_ACCESS_CLIENT_ID` and
    /// `CF_ACCESS_CLIENT_SECRET`. Both must be set and non-empty.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("CF_ACCESS_CLIENT_ID").ok()?;
        let client_secret = std::env::var("CF_ACCESS_CLIENT_SECRET").ok()?;
        (!client_id.is_empty() && !client_secret.is_empty()).then_some(Self {
            client_id,
            client_secret,
        })
    }
}

/// Client for a self-hosted Pelias instance.
#[derive(Debug, Clone)]
pub struct PeliasGeocoder {
    client: reqwest::Client,
    base_url: String,
    country_code: String,
    cf_access: Option<CfAccessCredentials>,
}

impl PeliasGeocoder {
    /// Creates a client, picking up Cloudflare Access credentials from the
    /// environment when present.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str, country_code: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            country_code: country_code.to_string(),
            cf_access: CfAccessCredentials::from_env(),
        }
    }

    /// Replaces the Cloudflare Access credentials.
    #[must_use]
    pub fn with_cf_access(mut self, cf_access: Option<CfAccessCredentials>) -> Self {
        self.cf_access = cf_access;
        self
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let req = self.client.get(format!("{}{path}", self.base_url));
        match &self.cf_access {
            Some(creds) => req
                .header("CF-Access-Client-Id", &creds.client_id)
                .header("CF-Access-Client-Secret", &creds.client_secret),
            None => req,
        }
    }

    /// Returns `true` if the instance answers `GET /v1` within 3 seconds.
    pub async fn is_available(&self) -> bool {
        self.get("/v1")
            .timeout(Duration::from_secs(3))
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }

    /// Geocodes one free-form address.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request fails, the instance answers
    /// with an error status, or the body is not a feature collection.
    pub async fn search(&self, text: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let resp = self
            .get("/v1/search")
            .query(&[
                ("text", text),
                ("boundary.country", self.country_code.as_str()),
                ("layers", "address,venue"),
                ("size", "1"),
            ])
            .send()
            .await?;

        match resp.status() {
            reqwest::StatusCode::TOO_MANY_REQUESTS => Err(GeocodeError::RateLimited),
            status if !status.is_success() => Err(GeocodeError::Parse {
                message: format!("Pelias returned status {status}"),
            }),
            _ => parse_response(resp.json().await?),
        }
    }
}

#[async_trait::async_trait]
impl Geocoder for PeliasGeocoder {
    async fn forward_geocode(
        &self,
        address: &str,
    ) -> Result<Option<GeocodedAddress>, GeocodeError> {
        self.search(address).await
    }
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: Properties,
}

#[derive(Deserialize)]
struct Geometry {
    /// `[longitude, latitude]`
    coordinates: (f64, f64),
}

#[derive(Default, Deserialize)]
struct Properties {
    label: Option<String>,
    confidence: Option<f64>,
}

fn parse_response(body: serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let collection: FeatureCollection =
        serde_json::from_value(body).map_err(|e| GeocodeError::Parse {
            message: format!("Unexpected Pelias response: {e}"),
        })?;

    Ok(collection.features.into_iter().next().map(|feature| {
        let (longitude, latitude) = feature.geometry.coordinates;
        let exact = feature
            .properties
            .confidence
            .is_some_and(|c| c >= EXACT_CONFIDENCE);

        GeocodedAddress {
            latitude,
            longitude,
            matched_address: feature.properties.label,
            provider: GeocodingProvider::Pelias,
            match_quality: if exact {
                MatchQuality::Exact
            } else {
                MatchQuality::Approximate
            },
        }
    }))
}
