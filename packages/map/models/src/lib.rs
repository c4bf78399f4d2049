#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Types exchanged between the map engine and the map surface.
//!
//! These are serialized to JSON for display and debugging. They are
//! derived on every render pass and never persisted.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use listing_map_geography_models::Coordinate;
use listing_map_listing_models::{Listing, ListingId};
use serde::{Deserialize, Serialize};

/// Identifies a rendered marker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum AnnotationId {
    /// The device location dot.
    UserLocation,
    /// A listing pin.
    Listing(ListingId),
}

impl AnnotationId {
    /// The listing behind this marker, if any.
    #[must_use]
    pub const fn listing_id(&self) -> Option<&ListingId> {
        match self {
            Self::UserLocation => None,
            Self::Listing(id) => Some(id),
        }
    }
}

/// Visual style of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationCategory {
    /// The device location dot.
    UserLocation,
    /// The listing currently highlighted.
    Highlighted,
    /// A listing the user bookmarked.
    Bookmarked,
    /// A rental listing.
    RentalPin,
    /// A for-sale listing.
    SalePin,
}

/// A renderable map marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Marker identity.
    pub id: AnnotationId,
    /// Marker position.
    pub coordinate: Coordinate,
    /// Marker style.
    pub category: AnnotationCategory,
}

/// Extent of a map region in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    /// North-south extent.
    pub latitude_delta: f64,
    /// East-west extent.
    pub longitude_delta: f64,
}

impl Span {
    /// Creates a span.
    #[must_use]
    pub const fn new(latitude_delta: f64, longitude_delta: f64) -> Self {
        Self {
            latitude_delta,
            longitude_delta,
        }
    }
}

/// Which input a [`Viewport`] was computed from, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewportSource {
    /// The highlighted listing's cached coordinate.
    Highlight,
    /// The device location.
    UserLocation,
    /// The first listing with a cached coordinate.
    FirstListing,
    /// The configured default region.
    Default,
}

/// Map center and zoom extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    /// Region center.
    pub center: Coordinate,
    /// Region extent.
    pub span: Span,
    /// Rule that produced this region.
    pub source: ViewportSource,
}

/// Coarse highlight lifecycle, derived from [`HighlightState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HighlightPhase {
    /// No target, or a target whose loading window ran out unresolved.
    Idle,
    /// Waiting for the first placement of the target.
    Loading,
    /// The target has a cached coordinate.
    Resolved,
}

/// The single listing currently prioritized for centering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightState {
    /// Listing to center on.
    pub target_id: Option<ListingId>,
    /// Whether the loading indicator is shown.
    pub is_loading: bool,
    /// When the current target was requested.
    pub requested_at: Option<DateTime<Utc>>,
}

impl HighlightState {
    /// A fresh loading state for `target_id`.
    #[must_use]
    pub fn loading(target_id: ListingId, requested_at: DateTime<Utc>) -> Self {
        Self {
            target_id: Some(target_id),
            is_loading: true,
            requested_at: Some(requested_at),
        }
    }

    /// Returns `true` if `id` is the current target.
    #[must_use]
    pub fn is_target(&self, id: &ListingId) -> bool {
        self.target_id.as_ref() == Some(id)
    }

    /// Lifecycle phase, given whether the target has a cached coordinate.
    #[must_use]
    pub const fn phase(&self, target_placed: bool) -> HighlightPhase {
        match (&self.target_id, self.is_loading, target_placed) {
            (None, _, _) => HighlightPhase::Idle,
            (Some(_), true, _) => HighlightPhase::Loading,
            (Some(_), false, true) => HighlightPhase::Resolved,
            (Some(_), false, false) => HighlightPhase::Idle,
        }
    }
}

/// Inbound messages for the map engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum MapCommand {
    /// Center the map on a listing.
    ShowListingOnMap(ListingId),
    /// Drop the current highlight.
    ClearMapHighlight,
    /// The active listing set was loaded, refreshed or refiltered.
    ListingsLoaded(Vec<Listing>),
    /// The bookmarked id set changed.
    BookmarksChanged(BTreeSet<ListingId>),
    /// The device location became known, changed, or was lost.
    DeviceLocationChanged(Option<Coordinate>),
    /// The user tapped a marker.
    AnnotationTapped(AnnotationId),
}

/// Everything the map surface needs for one render pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapFrame {
    /// Increases by one with every published frame.
    pub revision: u64,
    /// Region to show.
    pub viewport: Viewport,
    /// `true` if the camera should animate to `viewport` for this frame.
    pub recenter: bool,
    /// Markers to draw.
    pub annotations: Vec<Annotation>,
    /// Current highlight.
    pub highlight: HighlightState,
    /// Derived highlight lifecycle.
    pub highlight_phase: HighlightPhase,
    /// Size of the working listing set, including any retained highlight.
    pub listing_count: usize,
}

impl MapFrame {
    /// A frame with no listings, no highlight and the given viewport.
    #[must_use]
    pub fn empty(viewport: Viewport) -> Self {
        Self {
            revision: 0,
            viewport,
            recenter: false,
            annotations: Vec::new(),
            highlight: HighlightState::default(),
            highlight_phase: HighlightPhase::Idle,
            listing_count: 0,
        }
    }

    /// Finds the marker for a listing.
    #[must_use]
    pub fn annotation_for(&self, id: &ListingId) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|a| a.id.listing_id() == Some(id))
    }
}
