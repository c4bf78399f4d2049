//! Highlight coordination.
//!
//! Tracks the single highlighted listing, its loading window, and a
//! retained copy of the listing so its pin survives a refresh of the
//! working set that no longer contains it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use listing_map_listing_models::{Listing, ListingId};
use listing_map_map_models::HighlightState;
use tokio::time::Instant;

/// Result of fitting the highlight target into a new working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Nothing is highlighted.
    NoTarget,
    /// The working set already contains the target.
    Present,
    /// The target was missing and its retained copy was inserted at the
    /// front.
    Retained,
}

/// Owns the [`HighlightState`] and the loading deadline.
#[derive(Debug)]
pub struct HighlightCoordinator {
    state: HighlightState,
    target: Option<Listing>,
    generation: u64,
    loading_timeout: Duration,
    loading_deadline: Option<Instant>,
    placeholder: bool,
}

impl HighlightCoordinator {
    #[must_use]
    pub fn new(loading_timeout: Duration) -> Self {
        Self {
            state: HighlightState::default(),
            target: None,
            generation: 0,
            loading_timeout,
            loading_deadline: None,
            placeholder: false,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &HighlightState {
        &self.state
    }

    /// The highlighted listing's id.
    #[must_use]
    pub const fn target_id(&self) -> Option<&ListingId> {
        self.state.target_id.as_ref()
    }

    /// The retained copy of the highlighted listing.
    #[must_use]
    pub const fn target(&self) -> Option<&Listing> {
        self.target.as_ref()
    }

    /// Incremented on every request and clear.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// When the loading indicator must be forced off, if it is on.
    #[must_use]
    pub const fn loading_deadline(&self) -> Option<Instant> {
        self.loading_deadline
    }

    /// Makes `listing` the highlight target, replacing any previous one,
    /// and starts the loading window. A placeholder left in `listings` by
    /// the previous target is removed.
    ///
    /// Returns the id of the replaced target, if it was a different
    /// listing.
    pub fn request(
        &mut self,
        listing: Listing,
        now: DateTime<Utc>,
        listings: &mut Vec<Listing>,
    ) -> Option<ListingId> {
        self.remove_placeholder(listings);
        let previous = self
            .state
            .target_id
            .take()
            .filter(|prev| *prev != listing.id);

        self.generation += 1;
        self.state = HighlightState::loading(listing.id.clone(), now);
        self.loading_deadline = Some(Instant::now() + self.loading_timeout);
        self.target = Some(listing);
        self.placeholder = false;

        previous
    }

    /// Drops the highlight, removing its placeholder from `listings`.
    ///
    /// Returns the id that was highlighted.
    pub fn clear(&mut self, listings: &mut Vec<Listing>) -> Option<ListingId> {
        self.remove_placeholder(listings);
        let previous = self.state.target_id.take();

        self.generation += 1;
        self.state = HighlightState::default();
        self.target = None;
        self.loading_deadline = None;
        self.placeholder = false;

        previous
    }

    fn remove_placeholder(&mut self, listings: &mut Vec<Listing>) {
        if !self.placeholder {
            return;
        }
        self.placeholder = false;
        if let Some(id) = &self.state.target_id {
            if listings.first().is_some_and(|l| l.id == *id) {
                listings.remove(0);
            }
        }
    }

    /// Fits the target into a freshly loaded working set.
    ///
    /// If `listings` lacks the target, the retained copy is inserted at
    /// the front so its pin stays on the map.
    pub fn reconcile(&mut self, listings: &mut Vec<Listing>) -> Reconciled {
        let Some(target_id) = self.state.target_id.as_ref() else {
            return Reconciled::NoTarget;
        };

        if let Some(fresh) = listings.iter().find(|l| l.id == *target_id) {
            self.target = Some(fresh.clone());
            self.placeholder = false;
            return Reconciled::Present;
        }

        match &self.target {
            Some(retained) => {
                listings.insert(0, retained.clone());
                self.placeholder = true;
                Reconciled::Retained
            }
            None => Reconciled::NoTarget,
        }
    }

    /// Replaces the retained copy (and its placeholder) with a fresher
    /// record of the same listing.
    pub fn refresh_target(&mut self, listing: Listing, listings: &mut [Listing]) {
        if !self.state.is_target(&listing.id) {
            return;
        }
        if self.placeholder {
            if let Some(slot) = listings.first_mut().filter(|l| l.id == listing.id) {
                *slot = listing.clone();
            }
        }
        self.target = Some(listing);
    }

    /// Returns `true` if the working set holds a retained placeholder.
    #[must_use]
    pub const fn has_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Ends the loading window because the target's resolution finished.
    ///
    /// Returns `false` if `id` is not the target or it was not loading.
    pub fn finish_loading(&mut self, id: &ListingId) -> bool {
        if !self.state.is_target(id) || !self.state.is_loading {
            return false;
        }
        self.state.is_loading = false;
        self.loading_deadline = None;
        true
    }

    /// Forces the loading indicator off once its deadline passed.
    ///
    /// The target is kept so a late result still moves the camera.
    pub fn expire_loading(&mut self, now: Instant) -> bool {
        match self.loading_deadline {
            Some(deadline) if now >= deadline => {
                self.state.is_loading = false;
                self.loading_deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use listing_map_listing_models::ListingCategory;

    use super::*;

    fn listing(id: &str) -> Listing {
        Listing::new(id, ListingCategory::Sale).with_city_state("Miami", "FL")
    }

    #[tokio::test(start_paused = true)]
    async fn request_replaces_previous_target() {
        let mut coordinator = HighlightCoordinator::new(Duration::from_secs(3));

        assert_eq!(coordinator.request(listing("A"), Utc::now(), &mut Vec::new()), None);
        let first_generation = coordinator.generation();
        assert_eq!(
            coordinator.request(listing("B"), Utc::now(), &mut Vec::new()),
            Some("A".into())
        );

        assert!(coordinator.generation() > first_generation);
        assert_eq!(coordinator.target_id(), Some(&"B".into()));
        assert!(coordinator.state().is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn re_requesting_same_target_reports_no_replacement() {
        let mut coordinator = HighlightCoordinator::new(Duration::from_secs(3));
        coordinator.request(listing("A"), Utc::now(), &mut Vec::new());
        assert_eq!(coordinator.request(listing("A"), Utc::now(), &mut Vec::new()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn loading_expires_at_deadline_and_keeps_target() {
        let mut coordinator = HighlightCoordinator::new(Duration::from_secs(3));
        coordinator.request(listing("A"), Utc::now(), &mut Vec::new());

        assert!(!coordinator.expire_loading(Instant::now() + Duration::from_secs(2)));
        assert!(coordinator.state().is_loading);

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(coordinator.expire_loading(Instant::now()));
        assert!(!coordinator.state().is_loading);
        assert_eq!(coordinator.target_id(), Some(&"A".into()));
        assert!(coordinator.loading_deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn finish_loading_ignores_other_listings() {
        let mut coordinator = HighlightCoordinator::new(Duration::from_secs(3));
        coordinator.request(listing("B"), Utc::now(), &mut Vec::new());

        assert!(!coordinator.finish_loading(&"A".into()));
        assert!(coordinator.state().is_loading);
        assert!(coordinator.finish_loading(&"B".into()));
        assert!(!coordinator.state().is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_target_is_retained_at_front() {
        let mut coordinator = HighlightCoordinator::new(Duration::from_secs(3));
        coordinator.request(listing("A"), Utc::now(), &mut Vec::new());

        let mut working = vec![listing("X"), listing("Y")];
        assert_eq!(coordinator.reconcile(&mut working), Reconciled::Retained);
        assert_eq!(working[0].id, "A".into());
        assert_eq!(working.len(), 3);
        assert!(coordinator.has_placeholder());

        coordinator.clear(&mut working);
        let ids: Vec<String> = working.iter().map(|l| l.id.to_string()).collect();
        assert_eq!(ids, ["X", "Y"]);
        assert_eq!(coordinator.state(), &HighlightState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn new_target_removes_previous_placeholder() {
        let mut coordinator = HighlightCoordinator::new(Duration::from_secs(3));
        let mut working = vec![listing("X")];
        coordinator.request(listing("A"), Utc::now(), &mut working);
        coordinator.reconcile(&mut working);
        assert_eq!(working.len(), 2);

        coordinator.request(listing("X"), Utc::now(), &mut working);
        assert_eq!(coordinator.reconcile(&mut working), Reconciled::Present);
        let ids: Vec<String> = working.iter().map(|l| l.id.to_string()).collect();
        assert_eq!(ids, ["X"]);
    }

    #[tokio::test(start_paused = true)]
    async fn present_target_is_not_duplicated() {
        let mut coordinator = HighlightCoordinator::new(Duration::from_secs(3));
        coordinator.request(listing("A"), Utc::now(), &mut Vec::new());

        let mut working = vec![listing("X"), listing("A").with_street("9 Ocean Dr")];
        assert_eq!(coordinator.reconcile(&mut working), Reconciled::Present);
        assert_eq!(working.len(), 2);
        assert_eq!(
            coordinator.target().and_then(|l| l.street.as_deref()),
            Some("9 Ocean Dr")
        );

        coordinator.clear(&mut working);
        assert_eq!(working.len(), 2);
    }

    #[test]
    fn reconcile_without_target_is_a_no_op() {
        let mut coordinator = HighlightCoordinator::new(Duration::from_secs(3));
        let mut working = vec![listing("X")];
        assert_eq!(coordinator.reconcile(&mut working), Reconciled::NoTarget);
        assert_eq!(working.len(), 1);
    }
}
