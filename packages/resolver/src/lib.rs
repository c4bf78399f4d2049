#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate resolution for listing pins.
//!
//! Places each listing at the best available coordinate using a layered
//! strategy:
//!
//! 1. **Precise**: forward geocoding of the full one-line address.
//! 2. **City/state**: the static location table's city center.
//! 3. **State center**: the static location table's state center.
//!
//! Results land in a shared [`CoordinateCache`] and are announced as
//! [`ResolutionEvent`]s. A highlighted listing is resolved with
//! [`Priority::Highlight`], which places it from the static table before
//! the network lookup returns.

pub mod cache;
pub mod progress;
pub mod resolver;

use listing_map_listing_models::{ListingId, ResolutionTier, ResolvedCoordinate};
use serde::Deserialize;

pub use cache::{CoordinateCache, PutOutcome};
pub use resolver::CoordinateResolver;

/// Tunables for the resolver and its cache.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum number of non-highlight geocoding lookups in flight at once.
    pub max_concurrent_lookups: usize,
    /// A precise result this far (in meters) from the cached coordinate
    /// asks the map to recenter.
    pub recenter_threshold_meters: f64,
    /// Maximum number of cached coordinates.
    pub cache_capacity: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_concurrent_lookups: 8,
            recenter_threshold_meters: 100.0,
            cache_capacity: 2048,
        }
    }
}

/// How urgently a listing should be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Background placement; waits for a lookup slot.
    Normal,
    /// The highlighted listing: placed from the static table immediately,
    /// and its lookup skips the queue.
    Highlight,
}

/// What [`CoordinateResolver::resolve`] did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// No usable address data; the listing is left off the map.
    Unresolvable,
    /// A precise lookup was started.
    Lookup,
    /// A lookup for this listing was already running; the request was dropped.
    AlreadyInFlight,
}

/// Whether an event is a provisional placement or the end of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPhase {
    /// Static-table placement made before the precise lookup returned.
    Immediate,
    /// The resolution finished.
    Final,
}

/// Announces a change (or a final non-change) to a listing's placement.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionEvent {
    /// The listing concerned.
    pub listing_id: ListingId,
    /// The cached entry after this step, if any.
    pub resolved: Option<ResolvedCoordinate>,
    /// `true` if the cached position moved beyond the recenter threshold
    /// (or appeared for the first time).
    pub recenter: bool,
    /// Provisional or final.
    pub phase: ResolutionPhase,
}

impl ResolutionEvent {
    /// Tier of the cached entry, or [`ResolutionTier::None`].
    #[must_use]
    pub fn tier(&self) -> ResolutionTier {
        self.resolved
            .as_ref()
            .map_or(ResolutionTier::None, |r| r.tier)
    }

    /// Returns `true` if this event ends the resolution.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.phase == ResolutionPhase::Final
    }
}
