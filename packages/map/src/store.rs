//! Data access for listings outside the working set.
//!
//! The engine receives the active listing set through
//! [`MapCommand::ListingsLoaded`](listing_map_map_models::MapCommand). It
//! asks the [`ListingStore`] only when a highlight names a listing it does
//! not hold, or when a refresh drops the highlighted listing.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use listing_map_listing_models::{Listing, ListingId};

/// Errors from the listing data store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("Listing store unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to listing records.
#[async_trait::async_trait]
pub trait ListingStore: Send + Sync {
    /// Fetches one listing. `Ok(None)` means it no longer exists.
    async fn get_listing(&self, id: &ListingId) -> Result<Option<Listing>, StoreError>;
}

/// A [`ListingStore`] backed by a map in memory.
#[derive(Debug, Default)]
pub struct InMemoryListingStore {
    listings: RwLock<BTreeMap<ListingId, Listing>>,
}

impl InMemoryListingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `listings`.
    #[must_use]
    pub fn from_listings(listings: impl IntoIterator<Item = Listing>) -> Self {
        Self {
            listings: RwLock::new(listings.into_iter().map(|l| (l.id.clone(), l)).collect()),
        }
    }

    /// Adds or replaces a listing.
    pub fn insert(&self, listing: Listing) {
        self.listings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(listing.id.clone(), listing);
    }

    /// Deletes a listing, returning it if present.
    pub fn remove(&self, id: &ListingId) -> Option<Listing> {
        self.listings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    /// All listings, ordered by id.
    #[must_use]
    pub fn all(&self) -> Vec<Listing> {
        self.listings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl ListingStore for InMemoryListingStore {
    async fn get_listing(&self, id: &ListingId) -> Result<Option<Listing>, StoreError> {
        Ok(self
            .listings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned())
    }
}
