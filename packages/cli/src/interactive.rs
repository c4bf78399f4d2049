//! Menu-driven highlighting.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dialoguer::Select;
use listing_map_cli_utils::{IndicatifProgress, MultiProgress};
use listing_map_geocoder::Geocoder;
use listing_map_map::{InMemoryListingStore, MapConfig, MapEngine};
use listing_map_map_models::MapFrame;

use crate::browse::settle;
use crate::listings::ListingsFile;

const SETTLE_LIMIT: Duration = Duration::from_secs(30);

/// Loads the listings into a map engine and lets the user highlight them
/// one at a time, printing the map state after each choice.
///
/// # Errors
///
/// Returns an error if the listings file cannot be loaded, a prompt fails,
/// or the engine stops.
pub async fn run(
    config: &MapConfig,
    geocoder: Arc<dyn Geocoder>,
    path: &Path,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = ListingsFile::load(path)?;
    let listings = file.listings.clone();
    let progress = IndicatifProgress::lookups_bar(multi, "Resolving listings");
    let store = Arc::new(InMemoryListingStore::from_listings(file.listings.clone()));

    let engine = MapEngine::with_progress(config.clone(), geocoder, store, progress.clone());
    let resolver = engine.resolver().clone();
    let (handle, _task) = engine.spawn();

    handle.set_bookmarks(file.bookmarks.into_iter().collect())?;
    handle.load_listings(file.listings)?;
    let mut frame = settle(&handle, &resolver, SETTLE_LIMIT).await;
    progress.finish(format!("{} pins", frame.annotations.len()));

    let mut labels: Vec<String> = listings
        .iter()
        .map(|l| {
            let address = l.full_address();
            if address.is_empty() {
                format!("{} (no address)", l.id)
            } else {
                format!("{}: {address}", l.id)
            }
        })
        .collect();
    labels.push("Clear highlight".to_string());
    labels.push("Quit".to_string());

    loop {
        print_frame(&frame);

        let idx = Select::new()
            .with_prompt("Highlight which listing?")
            .items(&labels)
            .default(0)
            .interact()?;

        match listings.get(idx) {
            Some(listing) => handle.show_listing(listing.id.clone())?,
            None if idx == listings.len() => handle.clear_highlight()?,
            None => break,
        }

        frame = settle(&handle, &resolver, SETTLE_LIMIT).await;
    }

    Ok(())
}

fn print_frame(frame: &MapFrame) {
    let viewport = &frame.viewport;
    println!();
    println!(
        "Viewport: {:.5},{:.5} span {:.3}x{:.3} ({:?})",
        viewport.center.latitude,
        viewport.center.longitude,
        viewport.span.latitude_delta,
        viewport.span.longitude_delta,
        viewport.source
    );
    match &frame.highlight.target_id {
        Some(id) => println!("Highlight: {id} ({:?})", frame.highlight_phase),
        None => println!("Highlight: none"),
    }
    println!(
        "Pins: {} of {} listings",
        frame.annotations.len(),
        frame.listing_count
    );
    println!();
}
