#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Listing record types and coordinate resolution results.
//!
//! Listings are owned by the data access layer and are read-only here.
//! A [`ResolvedCoordinate`] records where a listing was placed and how
//! precisely ([`ResolutionTier`]).

pub mod address;

use std::borrow::Borrow;
use std::fmt;

use listing_map_geography_models::{Coordinate, LocationPrecision};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::address::AddressParts;

/// Opaque listing identifier assigned by the data store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(String);

impl ListingId {
    /// Wraps a raw identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ListingId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ListingId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ListingId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ListingId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Whether a listing is for sale or for rent.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ListingCategory {
    /// Property offered for sale.
    Sale,
    /// Property offered for rent.
    Rental,
}

/// Market status of a listing, as reported by the data store.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ListingStatus {
    /// Available.
    #[default]
    Active,
    /// Under contract.
    Pending,
    /// Sold.
    Sold,
    /// Rented.
    Rented,
    /// Withdrawn from the market.
    OffMarket,
}

/// A property listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Store-assigned identifier.
    pub id: ListingId,
    /// Street line (e.g., "100 Biscayne Blvd").
    #[serde(default)]
    pub street: Option<String>,
    /// Unit / apartment.
    #[serde(default)]
    pub unit: Option<String>,
    /// City name.
    #[serde(default)]
    pub city: Option<String>,
    /// State abbreviation or name.
    #[serde(default)]
    pub state: Option<String>,
    /// Postal code.
    #[serde(default)]
    pub postal_code: Option<String>,
    /// Asking price in whole dollars (monthly rent for rentals).
    #[serde(default)]
    pub price: u64,
    /// Sale or rental.
    pub category: ListingCategory,
    /// Paid placement flag.
    #[serde(default)]
    pub is_featured: bool,
    /// Paid promotion flag.
    #[serde(default)]
    pub is_promoted: bool,
    /// Market status.
    #[serde(default)]
    pub status: ListingStatus,
}

impl Listing {
    /// Creates a listing with no address data.
    #[must_use]
    pub fn new(id: impl Into<ListingId>, category: ListingCategory) -> Self {
        Self {
            id: id.into(),
            street: None,
            unit: None,
            city: None,
            state: None,
            postal_code: None,
            price: 0,
            category,
            is_featured: false,
            is_promoted: false,
            status: ListingStatus::Active,
        }
    }

    /// Sets the street line.
    #[must_use]
    pub fn with_street(mut self, street: impl Into<String>) -> Self {
        self.street = Some(street.into());
        self
    }

    /// Sets the unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Sets city and state.
    #[must_use]
    pub fn with_city_state(mut self, city: impl Into<String>, state: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self.state = Some(state.into());
        self
    }

    /// Sets the postal code.
    #[must_use]
    pub fn with_postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.postal_code = Some(postal_code.into());
        self
    }

    /// Sets the price.
    #[must_use]
    pub const fn with_price(mut self, price: u64) -> Self {
        self.price = price;
        self
    }

    /// Normalized address components.
    #[must_use]
    pub fn address_parts(&self) -> AddressParts {
        AddressParts::new(
            self.street.as_deref(),
            self.unit.as_deref(),
            self.city.as_deref(),
            self.state.as_deref(),
            self.postal_code.as_deref(),
        )
    }

    /// One-line address for precise geocoding, or an empty string.
    #[must_use]
    pub fn full_address(&self) -> String {
        self.address_parts().one_line()
    }

    /// Returns `true` if at least one address component is usable.
    #[must_use]
    pub fn has_address(&self) -> bool {
        !self.address_parts().is_empty()
    }
}

/// How a coordinate was produced, ordered from least to most precise.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ResolutionTier {
    /// No tier could place the listing.
    None,
    /// Center of the listing's state.
    StateCenter,
    /// Approximate center of the listing's city.
    CityState,
    /// Address-level geocoding result.
    Precise,
}

impl ResolutionTier {
    /// Returns `true` for every tier that carries a coordinate.
    #[must_use]
    pub const fn is_resolved(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl From<LocationPrecision> for ResolutionTier {
    fn from(value: LocationPrecision) -> Self {
        match value {
            LocationPrecision::City => Self::CityState,
            LocationPrecision::State => Self::StateCenter,
        }
    }
}

/// A listing's placement on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCoordinate {
    /// The listing this coordinate belongs to.
    pub listing_id: ListingId,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// How the coordinate was produced.
    pub tier: ResolutionTier,
}

impl ResolvedCoordinate {
    /// Creates a resolved coordinate.
    #[must_use]
    pub const fn new(listing_id: ListingId, coordinate: Coordinate, tier: ResolutionTier) -> Self {
        Self {
            listing_id,
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            tier,
        }
    }

    /// The coordinate as a [`Coordinate`].
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}
