//! Non-interactive commands: bulk resolution and one-shot frames.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use listing_map_cli_utils::{IndicatifProgress, MultiProgress};
use listing_map_geocoder::Geocoder;
use listing_map_geography_models::Coordinate;
use listing_map_listing_models::{ListingId, ResolutionTier};
use listing_map_map::{InMemoryListingStore, MapConfig, MapEngine, MapHandle};
use listing_map_map_models::MapFrame;
use listing_map_resolver::{CoordinateCache, CoordinateResolver};
use tokio::time::Instant;

use crate::listings::ListingsFile;

/// No frame for this long, with nothing in flight, counts as settled.
const QUIET_PERIOD: Duration = Duration::from_millis(250);

/// Inputs for [`browse`] besides the listings file.
pub struct BrowseOptions {
    pub highlight: Option<String>,
    pub device_location: Option<Coordinate>,
    pub bookmarks: Vec<String>,
    pub settle: Duration,
}

/// Resolves every listing and prints one line per listing.
///
/// # Errors
///
/// Returns an error if the listings file cannot be loaded.
pub async fn resolve(
    config: &MapConfig,
    geocoder: Arc<dyn Geocoder>,
    path: &Path,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = ListingsFile::load(path)?;
    let progress = IndicatifProgress::lookups_bar(multi, "Resolving listings");
    let cache = Arc::new(CoordinateCache::new(
        config.resolver.cache_capacity.max(file.listings.len()),
    ));
    let (resolver, mut events) = CoordinateResolver::with_progress(
        geocoder,
        cache.clone(),
        &config.resolver,
        progress.clone(),
    );

    let started = resolver.resolve_all(&file.listings);
    let mut remaining = started;
    while remaining > 0 {
        match events.recv().await {
            Some(event) if event.is_final() => remaining -= 1,
            Some(_) => {}
            None => break,
        }
    }
    progress.finish(format!("Resolved {started} listings"));

    let mut counts: BTreeMap<ResolutionTier, usize> = BTreeMap::new();
    for listing in &file.listings {
        let resolved = cache.get(&listing.id);
        let tier = resolved.as_ref().map_or(ResolutionTier::None, |r| r.tier);
        *counts.entry(tier).or_default() += 1;

        match resolved {
            Some(r) => println!(
                "{:<20} {:<12} {:>10.5} {:>11.5}  {}",
                listing.id,
                tier,
                r.latitude,
                r.longitude,
                listing.full_address()
            ),
            None => println!(
                "{:<20} {:<12} {:>10} {:>11}  {}",
                listing.id,
                tier,
                "-",
                "-",
                listing.full_address()
            ),
        }
    }

    let count = |tier: ResolutionTier| counts.get(&tier).copied().unwrap_or_default();
    println!(
        "\n{} precise, {} city, {} state, {} unplaced",
        count(ResolutionTier::Precise),
        count(ResolutionTier::CityState),
        count(ResolutionTier::StateCenter),
        count(ResolutionTier::None),
    );

    Ok(())
}

/// Feeds the listings (and options) to a map engine, waits for lookups to
/// settle, and prints the resulting frame as JSON.
///
/// # Errors
///
/// Returns an error if the listings file cannot be loaded or the engine
/// stops unexpectedly.
pub async fn browse(
    config: &MapConfig,
    geocoder: Arc<dyn Geocoder>,
    path: &Path,
    options: BrowseOptions,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = ListingsFile::load(path)?;
    let progress = IndicatifProgress::lookups_bar(multi, "Resolving listings");
    let store = Arc::new(InMemoryListingStore::from_listings(file.listings.clone()));

    let engine = MapEngine::with_progress(config.clone(), geocoder, store, progress.clone())
        .on_select(|id| log::info!("Selected listing {id}"));
    let resolver = engine.resolver().clone();
    let (handle, _task) = engine.spawn();

    let bookmarks = file
        .bookmarks
        .into_iter()
        .chain(options.bookmarks.into_iter().map(ListingId::from))
        .collect();
    handle.set_bookmarks(bookmarks)?;
    handle.load_listings(file.listings)?;
    if options.device_location.is_some() {
        handle.set_device_location(options.device_location)?;
    }
    if let Some(id) = options.highlight {
        handle.show_listing(id)?;
    }

    let frame = settle(&handle, &resolver, options.settle).await;
    progress.finish(format!("{} pins", frame.annotations.len()));

    println!("{}", serde_json::to_string_pretty(&frame)?);
    Ok(())
}

/// Waits until no lookups are in flight, the highlight is not loading and
/// no frame has been published for [`QUIET_PERIOD`], or `limit` elapses.
pub async fn settle(handle: &MapHandle, resolver: &CoordinateResolver, limit: Duration) -> MapFrame {
    let deadline = Instant::now() + limit;
    let mut frames = handle.subscribe();

    loop {
        match tokio::time::timeout(QUIET_PERIOD, frames.changed()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                log::warn!("Map engine stopped before lookups settled");
                break;
            }
            Err(_) => {
                if resolver.in_flight_count() == 0 && !frames.borrow().highlight.is_loading {
                    break;
                }
            }
        }

        if Instant::now() >= deadline {
            log::warn!(
                "Gave up waiting after {}s with {} lookups in flight",
                limit.as_secs(),
                resolver.in_flight_count()
            );
            break;
        }
    }

    handle.frame()
}
