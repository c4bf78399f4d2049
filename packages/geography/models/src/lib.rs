#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic primitives and the static location table.
//!
//! The location table maps normalized `"city,ST"` keys and bare state
//! abbreviations to approximate coordinates. It is the fallback used when
//! precise geocoding of a listing address is unavailable or fails, and the
//! source of the immediate position for a highlighted listing.

pub mod cities;
pub mod states;

use geo::{Distance, Haversine};
use serde::{Deserialize, Serialize};

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a new coordinate.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns `true` if both components are finite and within range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance to `other` in meters.
    #[must_use]
    pub fn distance_meters(&self, other: &Self) -> f64 {
        Haversine.distance(self.to_point(), other.to_point())
    }

    /// Converts to a [`geo::Point`] (x = longitude, y = latitude).
    #[must_use]
    pub fn to_point(self) -> geo::Point<f64> {
        geo::Point::new(self.longitude, self.latitude)
    }
}

/// How specific a location table match is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationPrecision {
    /// Geographic center of a state.
    State,
    /// Approximate center of a city.
    City,
}

/// A hit in the static location table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationMatch {
    /// Approximate coordinate for the matched key.
    pub coordinate: Coordinate,
    /// Whether the city or only the state matched.
    pub precision: LocationPrecision,
}

/// Looks up the best static coordinate for a city/state pair.
///
/// Tries the normalized `"city,ST"` key first, then the bare state. The
/// state may be given as an abbreviation or a full name in any case.
/// Returns `None` when neither key is known.
#[must_use]
pub fn lookup(city: Option<&str>, state: Option<&str>) -> Option<LocationMatch> {
    let abbr = state.and_then(states::normalize_state)?;

    if let Some(coordinate) = city.and_then(|c| cities::city_center(c, abbr)) {
        return Some(LocationMatch {
            coordinate,
            precision: LocationPrecision::City,
        });
    }

    states::state_center(abbr).map(|coordinate| LocationMatch {
        coordinate,
        precision: LocationPrecision::State,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_prefers_city() {
        let hit = lookup(Some("Miami"), Some("FL")).unwrap();
        assert_eq!(hit.precision, LocationPrecision::City);
        assert!((hit.coordinate.latitude - 25.7617).abs() < 1e-3);
        assert!((hit.coordinate.longitude - -80.1918).abs() < 1e-3);
    }

    #[test]
    fn lookup_falls_back_to_state() {
        let hit = lookup(Some("Nowhereville"), Some("Florida")).unwrap();
        assert_eq!(hit.precision, LocationPrecision::State);
        assert_eq!(Some(hit.coordinate), states::state_center("FL"));
    }

    #[test]
    fn lookup_state_only() {
        let hit = lookup(None, Some("tx")).unwrap();
        assert_eq!(hit.precision, LocationPrecision::State);
    }

    #[test]
    fn lookup_misses_without_state() {
        assert!(lookup(Some("Miami"), None).is_none());
        assert!(lookup(Some("Miami"), Some("ZZ")).is_none());
        assert!(lookup(None, None).is_none());
    }

    #[test]
    fn distance_between_miami_and_fort_lauderdale() {
        let miami = Coordinate::new(25.7617, -80.1918);
        let fll = Coordinate::new(26.1224, -80.1373);
        let d = miami.distance_meters(&fll);
        assert!(d > 38_000.0 && d < 42_000.0, "unexpected distance {d}");
    }

    #[test]
    fn distance_to_self_is_zero() {
        let c = Coordinate::new(41.8781, -87.6298);
        assert!(c.distance_meters(&c) < 1e-6);
    }

    #[test]
    fn validates_ranges() {
        assert!(Coordinate::new(0.0, 0.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -181.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn coordinate_serializes_camel_case() {
        let json = serde_json::to_value(Coordinate::new(1.5, -2.5)).unwrap();
        assert_eq!(json, serde_json::json!({"latitude": 1.5, "longitude": -2.5}));
    }
}
