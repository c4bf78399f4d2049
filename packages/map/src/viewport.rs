//! Viewport computation.
//!
//! The region is chosen by the first matching rule:
//!
//! 1. The highlighted listing's cached coordinate, close up.
//! 2. The device location, at neighborhood scale.
//! 3. The first listing with address data, at its cached coordinate, wide.
//!    Listings without address data never get a marker, so they are skipped.
//! 4. The configured default region.

use listing_map_geography_models::Coordinate;
use listing_map_listing_models::Listing;
use listing_map_map_models::{HighlightState, Span, Viewport, ViewportSource};
use listing_map_resolver::CoordinateCache;

use crate::config::ViewportConfig;

/// Computes the map region from the current inputs.
#[must_use]
pub fn compute_region(
    highlight: &HighlightState,
    user_location: Option<Coordinate>,
    listings: &[Listing],
    cache: &CoordinateCache,
    config: &ViewportConfig,
) -> Viewport {
    if let Some(center) = highlight
        .target_id
        .as_ref()
        .and_then(|id| cache.get(id))
        .map(|r| r.coordinate())
    {
        return centered(center, config.close_up_delta, ViewportSource::Highlight);
    }

    if let Some(center) = user_location.filter(Coordinate::is_valid) {
        return centered(center, config.neighborhood_delta, ViewportSource::UserLocation);
    }

    if let Some(center) = listings
        .iter()
        .find(|l| l.has_address())
        .and_then(|l| cache.get(&l.id))
        .map(|r| r.coordinate())
    {
        return centered(center, config.wide_delta, ViewportSource::FirstListing);
    }

    config.default_region()
}

const fn centered(center: Coordinate, delta: f64, source: ViewportSource) -> Viewport {
    Viewport {
        center,
        span: Span::new(delta, delta),
        source,
    }
}
