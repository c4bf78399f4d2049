//! Projects the working set into map markers.

use std::collections::BTreeSet;

use listing_map_geography_models::Coordinate;
use listing_map_listing_models::{Listing, ListingCategory, ListingId};
use listing_map_map_models::{Annotation, AnnotationCategory, AnnotationId, HighlightState};
use listing_map_resolver::CoordinateCache;

/// Builds the markers for one render pass.
///
/// The device location, when known, comes first. Listings without address
/// data or without a cached coordinate are left out, as are repeated ids.
#[must_use]
pub fn build_annotations(
    listings: &[Listing],
    cache: &CoordinateCache,
    highlight: &HighlightState,
    bookmarks: &BTreeSet<ListingId>,
    user_location: Option<Coordinate>,
) -> Vec<Annotation> {
    let mut annotations = Vec::with_capacity(listings.len() + 1);

    if let Some(coordinate) = user_location.filter(Coordinate::is_valid) {
        annotations.push(Annotation {
            id: AnnotationId::UserLocation,
            coordinate,
            category: AnnotationCategory::UserLocation,
        });
    }

    let mut seen = BTreeSet::new();
    for listing in listings {
        if !listing.has_address() || !seen.insert(&listing.id) {
            continue;
        }
        let Some(resolved) = cache.get(&listing.id) else {
            continue;
        };

        annotations.push(Annotation {
            id: AnnotationId::Listing(listing.id.clone()),
            coordinate: resolved.coordinate(),
            category: category_for(listing, highlight, bookmarks),
        });
    }

    annotations
}

fn category_for(
    listing: &Listing,
    highlight: &HighlightState,
    bookmarks: &BTreeSet<ListingId>,
) -> AnnotationCategory {
    if highlight.is_target(&listing.id) {
        AnnotationCategory::Highlighted
    } else if bookmarks.contains(&listing.id) {
        AnnotationCategory::Bookmarked
    } else {
        match listing.category {
            ListingCategory::Rental => AnnotationCategory::RentalPin,
            ListingCategory::Sale => AnnotationCategory::SalePin,
        }
    }
}
