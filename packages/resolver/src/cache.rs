//! Session-lifetime coordinate cache.
//!
//! Maps listing IDs to their [`ResolvedCoordinate`]. Writes are
//! tier-aware: a result never replaces an entry of a higher tier, so a
//! late city-level fallback cannot clobber a precise geocode. Callers that
//! need a lower tier to win (a highlight re-resolution) invalidate first.
//!
//! The cache is bounded; once full, the least recently used entry that is
//! not pinned is evicted.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use listing_map_listing_models::{ListingId, ResolvedCoordinate};

/// Result of a [`CoordinateCache::put`].
#[derive(Debug, Clone, PartialEq)]
pub enum PutOutcome {
    /// The value was written.
    Stored {
        /// The entry it replaced, if any.
        previous: Option<ResolvedCoordinate>,
    },
    /// The value was discarded.
    Rejected {
        /// The entry that was kept.
        current: Option<ResolvedCoordinate>,
    },
}

impl PutOutcome {
    /// Returns `true` if the value was written.
    #[must_use]
    pub const fn is_stored(&self) -> bool {
        matches!(self, Self::Stored { .. })
    }
}

struct CacheEntry {
    resolved: ResolvedCoordinate,
    last_used: u64,
}

#[derive(Default)]
struct CacheInner {
    entries: BTreeMap<ListingId, CacheEntry>,
    pinned: BTreeSet<ListingId>,
    clock: u64,
}

impl CacheInner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_over(&mut self, capacity: usize, keep: &ListingId) {
        while self.entries.len() > capacity {
            let victim = self
                .entries
                .iter()
                .filter(|(id, _)| *id != keep && !self.pinned.contains(*id))
                .min_by_key(|(_, e)| e.last_used)
                .map(|(id, _)| id.clone());

            let Some(victim) = victim else {
                break;
            };
            log::debug!("Evicting cached coordinate for listing {victim}");
            self.entries.remove(&victim);
        }
    }
}

/// Thread-safe listing → coordinate map with tier-aware writes.
pub struct CoordinateCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

impl CoordinateCache {
    /// Creates a cache holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Creates a cache with no practical size bound.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached coordinate and marks it recently used.
    #[must_use]
    pub fn get(&self, id: &ListingId) -> Option<ResolvedCoordinate> {
        let mut inner = self.lock();
        let now = inner.tick();
        inner.entries.get_mut(id).map(|entry| {
            entry.last_used = now;
            entry.resolved.clone()
        })
    }

    /// Returns `true` if an entry exists for `id`.
    #[must_use]
    pub fn contains(&self, id: &ListingId) -> bool {
        self.lock().entries.contains_key(id)
    }

    /// Writes `resolved` unless an entry of a higher tier already exists.
    ///
    /// Equal tiers overwrite (the later result wins). Values with
    /// [`ResolutionTier::None`](listing_map_listing_models::ResolutionTier::None)
    /// carry no position and are always rejected.
    pub fn put(&self, resolved: ResolvedCoordinate) -> PutOutcome {
        let mut inner = self.lock();
        let now = inner.tick();
        let id = resolved.listing_id.clone();

        let current = inner.entries.get(&id).map(|e| e.resolved.clone());

        if !resolved.tier.is_resolved() {
            return PutOutcome::Rejected { current };
        }

        if current.as_ref().is_some_and(|e| e.tier > resolved.tier) {
            return PutOutcome::Rejected { current };
        }

        inner.entries.insert(
            id.clone(),
            CacheEntry {
                resolved,
                last_used: now,
            },
        );
        inner.evict_over(self.capacity, &id);

        PutOutcome::Stored { previous: current }
    }

    /// Removes the entry for `id`, returning it.
    pub fn invalidate(&self, id: &ListingId) -> Option<ResolvedCoordinate> {
        self.lock().entries.remove(id).map(|e| e.resolved)
    }

    /// Exempts `id` from eviction.
    pub fn pin(&self, id: &ListingId) {
        self.lock().pinned.insert(id.clone());
    }

    /// Makes `id` evictable again.
    pub fn unpin(&self, id: &ListingId) {
        self.lock().pinned.remove(id);
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Copies every entry out under a single lock.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<ListingId, ResolvedCoordinate> {
        self.lock()
            .entries
            .iter()
            .map(|(id, e)| (id.clone(), e.resolved.clone()))
            .collect()
    }
}

impl Default for CoordinateCache {
    fn default() -> Self {
        Self::unbounded()
    }
}
