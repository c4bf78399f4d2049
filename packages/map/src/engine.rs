//! The map engine event loop.
//!
//! A single task owns the working listing set, the highlight and the
//! viewport. It consumes [`MapCommand`]s from any number of
//! [`MapHandle`]s, resolution events from the [`CoordinateResolver`], and
//! the highlight loading deadline, and publishes a [`MapFrame`] after
//! each step.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use listing_map_geocoder::Geocoder;
use listing_map_geography_models::Coordinate;
use listing_map_listing_models::{Listing, ListingId};
use listing_map_map_models::{AnnotationId, MapCommand, MapFrame, Viewport, ViewportSource};
use listing_map_resolver::progress::{ProgressCallback, null_progress};
use listing_map_resolver::{
    CoordinateCache, CoordinateResolver, Dispatch, Priority, ResolutionEvent,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::annotations::build_annotations;
use crate::config::MapConfig;
use crate::highlight::{HighlightCoordinator, Reconciled};
use crate::store::ListingStore;
use crate::viewport::compute_region;

/// Called with the listing behind a tapped marker.
pub type SelectionCallback = Arc<dyn Fn(&ListingId) + Send + Sync>;

/// Errors from talking to a running engine.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// The engine task has exited.
    #[error("Map engine has stopped")]
    EngineStopped,
}

/// Cloneable sender of [`MapCommand`]s and observer of [`MapFrame`]s.
#[derive(Clone)]
pub struct MapHandle {
    commands: mpsc::UnboundedSender<MapCommand>,
    frames: watch::Receiver<MapFrame>,
}

impl MapHandle {
    /// Sends a command to the engine.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::EngineStopped`] if the engine has exited.
    pub fn send(&self, command: MapCommand) -> Result<(), MapError> {
        self.commands
            .send(command)
            .map_err(|_| MapError::EngineStopped)
    }

    /// Asks the map to center on a listing.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::EngineStopped`] if the engine has exited.
    pub fn show_listing(&self, id: impl Into<ListingId>) -> Result<(), MapError> {
        self.send(MapCommand::ShowListingOnMap(id.into()))
    }

    /// # Errors
    ///
    /// Returns [`MapError::EngineStopped`] if the engine has exited.
    pub fn clear_highlight(&self) -> Result<(), MapError> {
        self.send(MapCommand::ClearMapHighlight)
    }

    /// Replaces the working listing set.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::EngineStopped`] if the engine has exited.
    pub fn load_listings(&self, listings: Vec<Listing>) -> Result<(), MapError> {
        self.send(MapCommand::ListingsLoaded(listings))
    }

    /// # Errors
    ///
    /// Returns [`MapError::EngineStopped`] if the engine has exited.
    pub fn set_bookmarks(&self, bookmarks: BTreeSet<ListingId>) -> Result<(), MapError> {
        self.send(MapCommand::BookmarksChanged(bookmarks))
    }

    /// # Errors
    ///
    /// Returns [`MapError::EngineStopped`] if the engine has exited.
    pub fn set_device_location(&self, location: Option<Coordinate>) -> Result<(), MapError> {
        self.send(MapCommand::DeviceLocationChanged(location))
    }

    /// Forwards a marker tap.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::EngineStopped`] if the engine has exited.
    pub fn tap(&self, id: AnnotationId) -> Result<(), MapError> {
        self.send(MapCommand::AnnotationTapped(id))
    }

    /// The most recently published frame.
    #[must_use]
    pub fn frame(&self) -> MapFrame {
        self.frames.borrow().clone()
    }

    /// A receiver notified on every published frame.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MapFrame> {
        self.frames.clone()
    }

    /// Waits for the first frame (including the current one) matching
    /// `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::EngineStopped`] if the engine exits first.
    pub async fn wait_for_frame(
        &self,
        predicate: impl FnMut(&MapFrame) -> bool,
    ) -> Result<MapFrame, MapError> {
        let mut frames = self.frames.clone();
        frames
            .wait_for(predicate)
            .await
            .map(|frame| (*frame).clone())
            .map_err(|_| MapError::EngineStopped)
    }
}

/// Owns map state and reacts to commands and resolutions.
pub struct MapEngine {
    config: MapConfig,
    resolver: CoordinateResolver,
    resolutions: mpsc::UnboundedReceiver<ResolutionEvent>,
    store: Arc<dyn ListingStore>,
    highlight: HighlightCoordinator,
    listings: Vec<Listing>,
    bookmarks: BTreeSet<ListingId>,
    user_location: Option<Coordinate>,
    viewport: Viewport,
    recenter: bool,
    revision: u64,
    on_select: Option<SelectionCallback>,
    frames: watch::Sender<MapFrame>,
}

impl MapEngine {
    /// Creates an engine resolving through `geocoder`.
    #[must_use]
    pub fn new(config: MapConfig, geocoder: Arc<dyn Geocoder>, store: Arc<dyn ListingStore>) -> Self {
        Self::with_progress(config, geocoder, store, null_progress())
    }

    /// Like [`Self::new`], reporting background resolution to `progress`.
    #[must_use]
    pub fn with_progress(
        config: MapConfig,
        geocoder: Arc<dyn Geocoder>,
        store: Arc<dyn ListingStore>,
        progress: Arc<dyn ProgressCallback>,
    ) -> Self {
        let cache = Arc::new(CoordinateCache::new(config.resolver.cache_capacity));
        let (resolver, resolutions) =
            CoordinateResolver::with_progress(geocoder, cache, &config.resolver, progress);
        let highlight = HighlightCoordinator::new(config.highlight.loading_timeout());
        let viewport = config.viewport.default_region();

        Self {
            config,
            resolver,
            resolutions,
            store,
            highlight,
            listings: Vec::new(),
            bookmarks: BTreeSet::new(),
            user_location: None,
            viewport,
            recenter: false,
            revision: 0,
            on_select: None,
            frames: watch::Sender::new(MapFrame::empty(viewport)),
        }
    }

    /// Sets the callback invoked when a listing marker is tapped.
    #[must_use]
    pub fn on_select(mut self, callback: impl Fn(&ListingId) + Send + Sync + 'static) -> Self {
        self.on_select = Some(Arc::new(callback));
        self
    }

    /// The resolver feeding this engine.
    #[must_use]
    pub const fn resolver(&self) -> &CoordinateResolver {
        &self.resolver
    }

    /// A receiver notified on every published frame.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MapFrame> {
        self.frames.subscribe()
    }

    /// Builds a frame from the current state without publishing it.
    #[must_use]
    pub fn frame(&self) -> MapFrame {
        let state = self.highlight.state();
        let target_placed = self
            .highlight
            .target_id()
            .is_some_and(|id| self.resolver.cache().contains(id));

        MapFrame {
            revision: self.revision,
            viewport: self.viewport,
            recenter: self.recenter,
            annotations: build_annotations(
                &self.listings,
                self.resolver.cache(),
                state,
                &self.bookmarks,
                self.user_location,
            ),
            highlight: state.clone(),
            highlight_phase: state.phase(target_placed),
            listing_count: self.listings.len(),
        }
    }

    /// Starts the engine on a new task.
    ///
    /// The engine stops once every [`MapHandle`] is dropped.
    #[must_use]
    pub fn spawn(self) -> (MapHandle, JoinHandle<()>) {
        let (commands, rx) = mpsc::unbounded_channel();
        let handle = MapHandle {
            commands,
            frames: self.frames.subscribe(),
        };
        (handle, tokio::spawn(self.run(rx)))
    }

    /// Runs the event loop until `commands` closes.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<MapCommand>) {
        log::debug!("Map engine started");

        loop {
            let deadline = self.highlight.loading_deadline();

            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    self.handle_command(command).await;
                }
                Some(event) = self.resolutions.recv() => self.handle_resolution(&event),
                () = sleep_until(deadline) => self.handle_loading_timeout(),
            }

            self.publish();
        }

        log::debug!("Map engine stopped");
    }

    /// Applies one command. Does not publish.
    pub async fn handle_command(&mut self, command: MapCommand) {
        match command {
            MapCommand::ShowListingOnMap(id) => self.show_listing(id).await,
            MapCommand::ClearMapHighlight => self.clear_highlight(),
            MapCommand::ListingsLoaded(listings) => self.load_listings(listings).await,
            MapCommand::BookmarksChanged(bookmarks) => self.bookmarks = bookmarks,
            MapCommand::DeviceLocationChanged(location) => self.set_device_location(location),
            MapCommand::AnnotationTapped(id) => self.annotation_tapped(&id),
        }
    }

    /// Applies one resolution event. Does not publish.
    pub fn handle_resolution(&mut self, event: &ResolutionEvent) {
        if self.highlight.state().is_target(&event.listing_id) {
            if event.is_final() && self.highlight.finish_loading(&event.listing_id) {
                log::debug!(
                    "Highlighted listing {} resolved ({})",
                    event.listing_id,
                    event.tier()
                );
            }
            if event.recenter {
                self.recompute_viewport();
            }
        } else if self.highlight.target_id().is_none()
            && self.viewport.source == ViewportSource::Default
            && event.resolved.is_some()
        {
            self.recompute_viewport();
        }
    }

    /// Publishes the current frame to subscribers.
    pub fn publish(&mut self) {
        self.revision += 1;
        let frame = self.frame();
        self.recenter = false;
        self.frames.send_replace(frame);
    }

    fn handle_loading_timeout(&mut self) {
        if self.highlight.expire_loading(Instant::now()) {
            if let Some(id) = self.highlight.target_id() {
                log::warn!(
                    "Highlighted listing {id} still loading after {}ms, hiding indicator",
                    self.config.highlight.loading_timeout_ms
                );
            }
        }
    }

    async fn show_listing(&mut self, id: ListingId) {
        let Some(listing) = self.find_listing(&id).await else {
            log::info!("Listing {id} requested for highlight no longer exists");
            self.clear_highlight();
            return;
        };

        if let Some(previous) = self
            .highlight
            .request(listing.clone(), Utc::now(), &mut self.listings)
        {
            self.resolver.cache().unpin(&previous);
        }
        self.resolver.cache().pin(&id);
        self.highlight.reconcile(&mut self.listings);

        if self.resolver.resolve(&listing, Priority::Highlight) == Dispatch::Unresolvable {
            log::debug!("Highlighted listing {id} has no address data");
        }

        self.recompute_viewport();
    }

    fn clear_highlight(&mut self) {
        if let Some(previous) = self.highlight.clear(&mut self.listings) {
            log::debug!("Cleared highlight on listing {previous}");
            self.resolver.cache().unpin(&previous);
        }
        self.recompute_viewport();
    }

    async fn load_listings(&mut self, listings: Vec<Listing>) {
        let previous_len = self.listings.len();
        self.listings = listings;

        if self.highlight.reconcile(&mut self.listings) == Reconciled::Retained {
            self.verify_retained_target().await;
        }

        let started = self.resolver.resolve_all(&self.listings);
        log::debug!(
            "Loaded {} listings, resolving {started}",
            self.listings.len()
        );

        let size_changed = self.listings.len() != previous_len;
        if (size_changed && self.highlight.state().is_loading)
            || self.viewport.source == ViewportSource::Default
        {
            self.recompute_viewport();
        }
    }

    /// Checks that a highlighted listing dropped from the working set
    /// still exists upstream.
    async fn verify_retained_target(&mut self) {
        let Some(id) = self.highlight.target_id().cloned() else {
            return;
        };

        match self.store.get_listing(&id).await {
            Ok(Some(fresh)) => self.highlight.refresh_target(fresh, &mut self.listings),
            Ok(None) => {
                log::info!("Highlighted listing {id} was removed upstream, clearing highlight");
                self.clear_highlight();
            }
            Err(e) => log::warn!("Could not check highlighted listing {id}: {e}"),
        }
    }

    async fn find_listing(&self, id: &ListingId) -> Option<Listing> {
        if let Some(listing) = self.listings.iter().find(|l| l.id == *id) {
            return Some(listing.clone());
        }
        if let Some(listing) = self.highlight.target().filter(|l| l.id == *id) {
            return Some(listing.clone());
        }

        match self.store.get_listing(id).await {
            Ok(listing) => listing,
            Err(e) => {
                log::warn!("Failed to fetch listing {id}: {e}");
                None
            }
        }
    }

    fn set_device_location(&mut self, location: Option<Coordinate>) {
        if location == self.user_location {
            return;
        }
        self.user_location = location;
        self.recompute_viewport();
    }

    fn annotation_tapped(&self, id: &AnnotationId) {
        let Some(listing_id) = id.listing_id() else {
            return;
        };

        if !self.listings.iter().any(|l| l.id == *listing_id) {
            log::debug!("Ignoring tap on listing {listing_id} outside the working set");
            return;
        }
        if let Some(callback) = &self.on_select {
            callback(listing_id);
        }
    }

    fn recompute_viewport(&mut self) {
        let next = compute_region(
            self.highlight.state(),
            self.user_location,
            &self.listings,
            self.resolver.cache(),
            &self.config.viewport,
        );
        if next != self.viewport {
            log::trace!(
                "Viewport moved to {:.5},{:.5} ({:?})",
                next.center.latitude,
                next.center.longitude,
                next.source
            );
            self.viewport = next;
            self.recenter = true;
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use listing_map_geocoder::{GeocodeError, GeocodedAddress, GeocodingProvider, MatchQuality};
    use listing_map_listing_models::ListingCategory;
    use listing_map_map_models::{AnnotationCategory, HighlightPhase};
    use tokio::sync::Semaphore;

    use super::*;
    use crate::store::{InMemoryListingStore, StoreError};

    const MIAMI: Coordinate = Coordinate::new(25.7617, -80.1918);
    const BAYSIDE: Coordinate = Coordinate::new(25.7785, -80.1867);
    const TAMPA: Coordinate = Coordinate::new(27.9506, -82.4572);
    const DEVICE: Coordinate = Coordinate::new(26.1224, -80.1373);

    /// Answers scripted addresses; lookups block until released unless
    /// the stub is open.
    struct StubGeocoder {
        answers: BTreeMap<String, Coordinate>,
        gate: Option<Semaphore>,
        calls: AtomicUsize,
    }

    impl StubGeocoder {
        fn open(answers: &[(&str, Coordinate)]) -> Arc<Self> {
            Self::build(answers, None)
        }

        fn gated(answers: &[(&str, Coordinate)]) -> Arc<Self> {
            Self::build(answers, Some(Semaphore::new(0)))
        }

        fn build(answers: &[(&str, Coordinate)], gate: Option<Semaphore>) -> Arc<Self> {
            Arc::new(Self {
                answers: answers
                    .iter()
                    .map(|(a, c)| ((*a).to_string(), *c))
                    .collect(),
                gate,
                calls: AtomicUsize::new(0),
            })
        }

        fn release(&self, n: usize) {
            if let Some(gate) = &self.gate {
                gate.add_permits(n);
            }
        }
    }

    #[async_trait::async_trait]
    impl Geocoder for StubGeocoder {
        async fn forward_geocode(
            &self,
            address: &str,
        ) -> Result<Option<GeocodedAddress>, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }

            Ok(self.answers.get(address).map(|c| GeocodedAddress {
                latitude: c.latitude,
                longitude: c.longitude,
                matched_address: Some(address.to_string()),
                provider: GeocodingProvider::Census,
                match_quality: MatchQuality::Exact,
            }))
        }
    }

    fn miami(id: &str) -> Listing {
        Listing::new(id, ListingCategory::Sale)
            .with_street("")
            .with_city_state("Miami", "FL")
    }

    fn bayside(id: &str) -> Listing {
        Listing::new(id, ListingCategory::Sale)
            .with_street("401 Biscayne Blvd")
            .with_city_state("Miami", "FL")
    }

    fn tampa(id: &str) -> Listing {
        Listing::new(id, ListingCategory::Rental).with_city_state("Tampa", "FL")
    }

    fn engine_with(geocoder: Arc<StubGeocoder>, store: InMemoryListingStore) -> MapEngine {
        MapEngine::new(MapConfig::default(), geocoder, Arc::new(store))
    }

    fn drain_resolutions(engine: &mut MapEngine) {
        while let Ok(event) = engine.resolutions.try_recv() {
            engine.handle_resolution(&event);
        }
    }

    async fn wait(handle: &MapHandle, predicate: impl FnMut(&MapFrame) -> bool) -> MapFrame {
        tokio::time::timeout(Duration::from_secs(10), handle.wait_for_frame(predicate))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn highlight_is_placed_in_the_same_step() {
        let geocoder = StubGeocoder::gated(&[]);
        let mut engine = engine_with(geocoder, InMemoryListingStore::new());

        engine
            .handle_command(MapCommand::ListingsLoaded(vec![miami("A")]))
            .await;
        engine
            .handle_command(MapCommand::ShowListingOnMap("A".into()))
            .await;

        let frame = engine.frame();
        let pin = frame.annotation_for(&"A".into()).unwrap();
        assert_eq!(pin.category, AnnotationCategory::Highlighted);
        assert_eq!(pin.coordinate, MIAMI);
        assert_eq!(frame.viewport.source, ViewportSource::Highlight);
        assert_eq!(frame.viewport.center, MIAMI);
        assert!(frame.recenter);
        assert_eq!(frame.highlight_phase, HighlightPhase::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn loading_clears_after_timeout_when_lookup_hangs() {
        let geocoder = StubGeocoder::gated(&[]);
        let (handle, _task) = engine_with(geocoder, InMemoryListingStore::new()).spawn();

        handle.load_listings(vec![bayside("A")]).unwrap();
        let requested = Instant::now();
        handle.show_listing("A").unwrap();

        wait(&handle, |f| f.highlight.is_loading).await;
        let frame = wait(&handle, |f| {
            f.highlight.target_id.is_some() && !f.highlight.is_loading
        })
        .await;

        let elapsed = requested.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_millis(3100));
        assert_eq!(frame.highlight.target_id, Some("A".into()));
        assert!(frame.annotation_for(&"A".into()).is_some());
    }

    #[tokio::test]
    async fn highlight_survives_refresh_without_it() {
        let geocoder = StubGeocoder::gated(&[]);
        let store = InMemoryListingStore::from_listings([miami("A"), tampa("X")]);
        let mut engine = engine_with(geocoder, store);

        engine
            .handle_command(MapCommand::ListingsLoaded(vec![miami("A"), tampa("X")]))
            .await;
        engine
            .handle_command(MapCommand::ShowListingOnMap("A".into()))
            .await;
        engine
            .handle_command(MapCommand::ListingsLoaded(vec![tampa("X")]))
            .await;

        let frame = engine.frame();
        assert_eq!(frame.listing_count, 2);
        let pin = frame.annotation_for(&"A".into()).unwrap();
        assert_eq!(pin.category, AnnotationCategory::Highlighted);
        assert_eq!(frame.highlight.target_id, Some("A".into()));
    }

    #[tokio::test]
    async fn highlight_removed_upstream_is_cleared() {
        let geocoder = StubGeocoder::gated(&[]);
        let mut engine = engine_with(geocoder, InMemoryListingStore::new());

        engine
            .handle_command(MapCommand::ListingsLoaded(vec![miami("A"), tampa("X")]))
            .await;
        engine
            .handle_command(MapCommand::ShowListingOnMap("A".into()))
            .await;
        engine
            .handle_command(MapCommand::ListingsLoaded(vec![tampa("X")]))
            .await;

        let frame = engine.frame();
        assert_eq!(frame.highlight.target_id, None);
        assert_eq!(frame.listing_count, 1);
        assert!(frame.annotation_for(&"A".into()).is_none());
    }

    struct UnreachableStore;

    #[async_trait::async_trait]
    impl ListingStore for UnreachableStore {
        async fn get_listing(&self, _id: &ListingId) -> Result<Option<Listing>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn highlight_kept_when_store_cannot_confirm_removal() {
        let geocoder = StubGeocoder::gated(&[]);
        let mut engine = MapEngine::new(MapConfig::default(), geocoder, Arc::new(UnreachableStore));

        engine
            .handle_command(MapCommand::ListingsLoaded(vec![miami("A"), tampa("X")]))
            .await;
        engine
            .handle_command(MapCommand::ShowListingOnMap("A".into()))
            .await;
        engine
            .handle_command(MapCommand::ListingsLoaded(vec![tampa("X")]))
            .await;

        let frame = engine.frame();
        assert_eq!(frame.highlight.target_id, Some("A".into()));
        assert_eq!(
            frame.annotation_for(&"A".into()).map(|a| a.category),
            Some(AnnotationCategory::Highlighted)
        );
    }

    #[tokio::test]
    async fn unknown_target_clears_current_highlight() {
        let geocoder = StubGeocoder::gated(&[]);
        let mut engine = engine_with(geocoder, InMemoryListingStore::new());

        engine
            .handle_command(MapCommand::ListingsLoaded(vec![miami("A")]))
            .await;
        engine
            .handle_command(MapCommand::ShowListingOnMap("A".into()))
            .await;
        engine
            .handle_command(MapCommand::ShowListingOnMap("ghost".into()))
            .await;

        let frame = engine.frame();
        assert_eq!(frame.highlight.target_id, None);
        assert_eq!(frame.highlight_phase, HighlightPhase::Idle);
        assert_eq!(
            frame.annotation_for(&"A".into()).map(|a| a.category),
            Some(AnnotationCategory::SalePin)
        );
    }

    #[tokio::test]
    async fn clearing_removes_placeholder() {
        let geocoder = StubGeocoder::gated(&[]);
        let store = InMemoryListingStore::from_listings([miami("A")]);
        let mut engine = engine_with(geocoder, store);

        engine
            .handle_command(MapCommand::ShowListingOnMap("A".into()))
            .await;
        assert_eq!(engine.frame().listing_count, 1);
        assert!(engine.frame().annotation_for(&"A".into()).is_some());

        engine.handle_command(MapCommand::ClearMapHighlight).await;

        let frame = engine.frame();
        assert_eq!(frame.listing_count, 0);
        assert!(frame.annotations.is_empty());
        assert_eq!(frame.viewport.source, ViewportSource::Default);
    }

    #[tokio::test]
    async fn highlight_wins_over_device_location() {
        let geocoder = StubGeocoder::gated(&[]);
        let mut engine = engine_with(geocoder, InMemoryListingStore::new());

        engine
            .handle_command(MapCommand::ListingsLoaded(vec![miami("A")]))
            .await;
        engine
            .handle_command(MapCommand::DeviceLocationChanged(Some(DEVICE)))
            .await;
        assert_eq!(engine.frame().viewport.source, ViewportSource::UserLocation);
        assert_eq!(engine.frame().viewport.center, DEVICE);

        engine
            .handle_command(MapCommand::ShowListingOnMap("A".into()))
            .await;
        let frame = engine.frame();
        assert_eq!(frame.viewport.source, ViewportSource::Highlight);
        assert_eq!(frame.viewport.center, MIAMI);
        assert_eq!(frame.annotations[0].category, AnnotationCategory::UserLocation);
    }

    #[tokio::test]
    async fn precise_result_far_from_fallback_recenters() {
        let geocoder = StubGeocoder::gated(&[("401 Biscayne Blvd, Miami, FL", BAYSIDE)]);
        let store = InMemoryListingStore::from_listings([bayside("A")]);
        let (handle, _task) = engine_with(geocoder.clone(), store).spawn();

        handle.show_listing("A").unwrap();
        let first = wait(&handle, |f| f.viewport.source == ViewportSource::Highlight).await;
        assert_eq!(first.viewport.center, MIAMI);

        geocoder.release(1);
        let second = wait(&handle, |f| f.viewport.center == BAYSIDE).await;
        assert!(second.recenter);
        assert_eq!(second.viewport.source, ViewportSource::Highlight);
        assert_eq!(second.highlight_phase, HighlightPhase::Resolved);
        assert!(!second.highlight.is_loading);
    }

    #[tokio::test]
    async fn addressless_listing_never_renders() {
        let geocoder = StubGeocoder::gated(&[]);
        let mut engine = engine_with(geocoder.clone(), InMemoryListingStore::new());
        let empty = Listing::new("E", ListingCategory::Sale)
            .with_street(" ")
            .with_city_state("", "");

        engine
            .handle_command(MapCommand::ListingsLoaded(vec![empty, miami("A")]))
            .await;
        engine
            .handle_command(MapCommand::ShowListingOnMap("E".into()))
            .await;
        drain_resolutions(&mut engine);

        let frame = engine.frame();
        assert!(frame.annotation_for(&"E".into()).is_none());
        assert_eq!(frame.highlight.target_id, Some("E".into()));
        assert!(!frame.highlight.is_loading);
        assert_eq!(frame.highlight_phase, HighlightPhase::Idle);
    }

    #[tokio::test]
    async fn late_result_for_replaced_target_does_not_move_camera() {
        let geocoder = StubGeocoder::gated(&[("401 Biscayne Blvd, Miami, FL", BAYSIDE)]);
        let (handle, _task) =
            engine_with(geocoder.clone(), InMemoryListingStore::new()).spawn();

        handle.load_listings(vec![bayside("A"), tampa("B")]).unwrap();
        handle.show_listing("A").unwrap();
        handle.show_listing("B").unwrap();

        let frame = wait(&handle, |f| f.highlight.target_id == Some("B".into())).await;
        assert_eq!(frame.viewport.center, TAMPA);

        geocoder.release(10);
        let frame = wait(&handle, |f| {
            f.annotation_for(&"A".into())
                .is_some_and(|a| a.coordinate == BAYSIDE)
        })
        .await;

        assert_eq!(frame.highlight.target_id, Some("B".into()));
        assert_eq!(frame.viewport.center, TAMPA);
        assert_eq!(frame.viewport.source, ViewportSource::Highlight);
    }

    #[tokio::test]
    async fn default_region_gives_way_to_first_resolved_listing() {
        let geocoder = StubGeocoder::open(&[("401 Biscayne Blvd, Miami, FL", BAYSIDE)]);
        let (handle, _task) = engine_with(geocoder, InMemoryListingStore::new()).spawn();

        assert_eq!(handle.frame().viewport.source, ViewportSource::Default);
        handle.load_listings(vec![bayside("A")]).unwrap();

        let frame = wait(&handle, |f| f.viewport.source == ViewportSource::FirstListing).await;
        assert_eq!(frame.viewport.center, BAYSIDE);
        assert_eq!(
            frame.annotation_for(&"A".into()).map(|a| a.category),
            Some(AnnotationCategory::SalePin)
        );
    }

    #[tokio::test]
    async fn bookmarks_change_pin_category() {
        let geocoder = StubGeocoder::gated(&[]);
        let mut engine = engine_with(geocoder, InMemoryListingStore::new());

        engine
            .handle_command(MapCommand::ListingsLoaded(vec![tampa("B")]))
            .await;
        engine
            .handle_command(MapCommand::ShowListingOnMap("B".into()))
            .await;
        engine.handle_command(MapCommand::ClearMapHighlight).await;
        assert_eq!(
            engine.frame().annotation_for(&"B".into()).map(|a| a.category),
            Some(AnnotationCategory::RentalPin)
        );

        engine
            .handle_command(MapCommand::BookmarksChanged(
                std::iter::once(ListingId::from("B")).collect(),
            ))
            .await;
        assert_eq!(
            engine.frame().annotation_for(&"B".into()).map(|a| a.category),
            Some(AnnotationCategory::Bookmarked)
        );
    }

    #[tokio::test]
    async fn taps_reach_selection_callback() {
        let selected = Arc::new(Mutex::new(Vec::new()));
        let sink = selected.clone();
        let geocoder = StubGeocoder::gated(&[]);
        let mut engine = engine_with(geocoder, InMemoryListingStore::new())
            .on_select(move |id| sink.lock().unwrap().push(id.clone()));

        engine
            .handle_command(MapCommand::ListingsLoaded(vec![miami("A")]))
            .await;
        engine
            .handle_command(MapCommand::AnnotationTapped(AnnotationId::Listing("A".into())))
            .await;
        engine
            .handle_command(MapCommand::AnnotationTapped(AnnotationId::Listing("Z".into())))
            .await;
        engine
            .handle_command(MapCommand::AnnotationTapped(AnnotationId::UserLocation))
            .await;

        assert_eq!(*selected.lock().unwrap(), vec![ListingId::from("A")]);
    }

    #[tokio::test]
    async fn engine_stops_when_handles_drop() {
        let geocoder = StubGeocoder::open(&[]);
        let (handle, task) = engine_with(geocoder, InMemoryListingStore::new()).spawn();
        let observer = handle.clone();

        drop(handle);
        assert!(observer.show_listing("A").is_ok());
        drop(observer);

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}
