//! The tiered coordinate resolver.
//!
//! Each listing gets at most one lookup in flight. Background lookups
//! share a bounded pool of slots so a bulk refresh cannot flood the
//! geocoding service; the highlighted listing's lookup does not wait for
//! a slot. Highlighting a listing whose background lookup is still queued
//! promotes that lookup out of the queue.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use listing_map_geocoder::{Geocoder, MatchQuality};
use listing_map_listing_models::{Listing, ListingId, ResolutionTier, ResolvedCoordinate};
use tokio::sync::{Notify, Semaphore, mpsc};

use crate::cache::{CoordinateCache, PutOutcome};
use crate::progress::{ProgressCallback, null_progress};
use crate::{Dispatch, Priority, ResolutionEvent, ResolutionPhase, ResolverConfig};

struct Inner {
    geocoder: Arc<dyn Geocoder>,
    cache: Arc<CoordinateCache>,
    /// Running or queued lookups, each with the signal that lets a queued
    /// lookup skip its wait for a slot.
    in_flight: Mutex<BTreeMap<ListingId, Arc<Notify>>>,
    lookup_slots: Arc<Semaphore>,
    events: mpsc::UnboundedSender<ResolutionEvent>,
    recenter_threshold_meters: f64,
    progress: Arc<dyn ProgressCallback>,
}

impl Inner {
    fn in_flight(&self) -> MutexGuard<'_, BTreeMap<ListingId, Arc<Notify>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes `candidate` (if any) and announces the resulting placement.
    fn settle(
        &self,
        listing_id: &ListingId,
        candidate: Option<ResolvedCoordinate>,
        phase: ResolutionPhase,
    ) {
        let (resolved, recenter) = match candidate {
            None => (self.cache.get(listing_id), false),
            Some(candidate) => match self.cache.put(candidate.clone()) {
                PutOutcome::Stored { previous } => {
                    let recenter = previous.is_none_or(|prev| {
                        prev.coordinate().distance_meters(&candidate.coordinate())
                            > self.recenter_threshold_meters
                    });
                    log::debug!(
                        "Listing {listing_id} placed at {:.5},{:.5} ({}){}",
                        candidate.latitude,
                        candidate.longitude,
                        candidate.tier,
                        if recenter { ", recenter" } else { "" }
                    );
                    (Some(candidate), recenter)
                }
                PutOutcome::Rejected { current } => {
                    log::debug!(
                        "Listing {listing_id}: kept {} over {}",
                        current
                            .as_ref()
                            .map_or(ResolutionTier::None, |c| c.tier),
                        candidate.tier
                    );
                    (current, false)
                }
            },
        };

        let _ = self.events.send(ResolutionEvent {
            listing_id: listing_id.clone(),
            resolved,
            recenter,
            phase,
        });
    }
}

/// Removes a listing from the in-flight set when its lookup ends.
struct InFlightGuard {
    inner: Arc<Inner>,
    listing_id: ListingId,
    promoted: Arc<Notify>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight().remove(&self.listing_id);
    }
}

/// Places listings on the map, writing results into a shared cache.
///
/// Cheap to clone; clones share the cache, the in-flight set and the
/// lookup slots.
#[derive(Clone)]
pub struct CoordinateResolver {
    inner: Arc<Inner>,
}

impl CoordinateResolver {
    /// Creates a resolver and the receiver for its [`ResolutionEvent`]s.
    #[must_use]
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        cache: Arc<CoordinateCache>,
        config: &ResolverConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ResolutionEvent>) {
        Self::with_progress(geocoder, cache, config, null_progress())
    }

    /// Like [`Self::new`], reporting completed background lookups to
    /// `progress`.
    #[must_use]
    pub fn with_progress(
        geocoder: Arc<dyn Geocoder>,
        cache: Arc<CoordinateCache>,
        config: &ResolverConfig,
        progress: Arc<dyn ProgressCallback>,
    ) -> (Self, mpsc::UnboundedReceiver<ResolutionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let resolver = Self {
            inner: Arc::new(Inner {
                geocoder,
                cache,
                in_flight: Mutex::new(BTreeMap::new()),
                lookup_slots: Arc::new(Semaphore::new(config.max_concurrent_lookups.max(1))),
                events,
                recenter_threshold_meters: config.recenter_threshold_meters,
                progress,
            }),
        };
        (resolver, rx)
    }

    /// The cache this resolver writes to.
    #[must_use]
    pub fn cache(&self) -> &Arc<CoordinateCache> {
        &self.inner.cache
    }

    /// Returns `true` if a lookup for `listing_id` is running.
    #[must_use]
    pub fn is_in_flight(&self, listing_id: &ListingId) -> bool {
        self.inner.in_flight().contains_key(listing_id)
    }

    /// Number of lookups currently running or queued.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight().len()
    }

    /// Resolves one listing.
    ///
    /// With [`Priority::Highlight`], any cached entry is discarded and the
    /// static-table fallback is written before this returns, then the
    /// precise lookup runs without waiting for a slot. With
    /// [`Priority::Normal`], the precise lookup waits for a slot and the
    /// static table is consulted only if it fails.
    ///
    /// A highlight request for a listing that is already resolving returns
    /// [`Dispatch::AlreadyInFlight`]; if that lookup is still waiting for a
    /// slot it starts right away.
    ///
    /// Must be called from within a tokio runtime.
    pub fn resolve(&self, listing: &Listing, priority: Priority) -> Dispatch {
        let parts = listing.address_parts();
        let address = parts.one_line();

        if priority == Priority::Highlight {
            self.inner.cache.invalidate(&listing.id);
            if let Some(fallback) = static_fallback(listing) {
                self.inner
                    .settle(&listing.id, Some(fallback), ResolutionPhase::Immediate);
            }
        }

        if address.is_empty() {
            log::debug!("Listing {} has no address data, leaving it off the map", listing.id);
            self.inner
                .settle(&listing.id, None, ResolutionPhase::Final);
            return Dispatch::Unresolvable;
        }

        let promoted = {
            let mut in_flight = self.inner.in_flight();
            if let Some(promoted) = in_flight.get(&listing.id) {
                log::trace!("Listing {} already resolving", listing.id);
                if priority == Priority::Highlight {
                    promoted.notify_one();
                }
                return Dispatch::AlreadyInFlight;
            }
            let promoted = Arc::new(Notify::new());
            in_flight.insert(listing.id.clone(), promoted.clone());
            promoted
        };

        let guard = InFlightGuard {
            inner: self.inner.clone(),
            listing_id: listing.id.clone(),
            promoted,
        };
        tokio::spawn(run_lookup(guard, listing.clone(), address, priority));

        Dispatch::Lookup
    }

    /// Starts background resolution for every listing with address data
    /// that is neither cached nor already resolving.
    ///
    /// Returns the number of lookups started.
    pub fn resolve_all(&self, listings: &[Listing]) -> usize {
        let pending: Vec<&Listing> = listings
            .iter()
            .filter(|l| l.has_address())
            .filter(|l| !self.inner.cache.contains(&l.id) && !self.is_in_flight(&l.id))
            .collect();

        self.inner.progress.set_total(pending.len() as u64);

        pending
            .into_iter()
            .filter(|l| self.resolve(l, Priority::Normal) == Dispatch::Lookup)
            .count()
    }
}

/// Static-table placement from the listing's city and state.
fn static_fallback(listing: &Listing) -> Option<ResolvedCoordinate> {
    let parts = listing.address_parts();
    listing_map_geography_models::lookup(parts.city.as_deref(), parts.state.as_deref()).map(
        |hit| ResolvedCoordinate::new(listing.id.clone(), hit.coordinate, hit.precision.into()),
    )
}

async fn run_lookup(guard: InFlightGuard, listing: Listing, address: String, priority: Priority) {
    let inner = guard.inner.clone();

    let slot = match priority {
        Priority::Normal => {
            let promoted = guard.promoted.clone();
            tokio::select! {
                permit = inner.lookup_slots.clone().acquire_owned() => match permit {
                    Ok(permit) => Some(permit),
                    Err(_) => return,
                },
                () = promoted.notified() => {
                    log::debug!("Listing {} highlighted while queued, skipping the queue", listing.id);
                    None
                }
            }
        }
        Priority::Highlight => None,
    };

    let result = inner.geocoder.forward_geocode(&address).await;
    drop(slot);

    let candidate = match result {
        Ok(Some(hit)) if hit.match_quality == MatchQuality::Approximate => {
            log::debug!(
                "Only an approximate match for '{address}' ({:?}), using location table",
                hit.provider
            );
            static_fallback(&listing)
        }
        Ok(Some(hit)) if hit.coordinate().is_valid() => Some(ResolvedCoordinate::new(
            listing.id.clone(),
            hit.coordinate(),
            ResolutionTier::Precise,
        )),
        Ok(Some(hit)) => {
            log::warn!(
                "Geocoder returned out-of-range coordinate {},{} for '{address}'",
                hit.latitude,
                hit.longitude
            );
            static_fallback(&listing)
        }
        Ok(None) => {
            log::debug!("No precise match for '{address}', using location table");
            static_fallback(&listing)
        }
        Err(e) => {
            log::warn!("Geocoding '{address}' failed: {e}, using location table");
            static_fallback(&listing)
        }
    };

    if candidate.is_none() {
        log::debug!("Listing {} could not be placed at any tier", listing.id);
    }

    drop(guard);
    inner.settle(&listing.id, candidate, ResolutionPhase::Final);

    if priority == Priority::Normal {
        inner.progress.inc(1);
    }
}
