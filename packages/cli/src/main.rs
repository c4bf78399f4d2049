#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line front end for the listings map.
//!
//! ```text
//! listing_map resolve <listings.json>
//! listing_map browse <listings.json> [--highlight ID] [--lat LAT --lon LON] [--bookmarks A,B]
//! listing_map interactive <listings.json>
//! ```
//!
//! Running `listing_map` with no subcommand prompts for a listings file and
//! enters interactive mode.

mod browse;
mod interactive;
mod listings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dialoguer::Input;
use listing_map_geocoder::Geocoder;
use listing_map_geocoder::chain::ProviderChain;
use listing_map_geocoder::service_registry::ServiceRegistry;
use listing_map_map::MapConfig;

#[derive(Parser)]
#[command(
    name = "listing_map",
    about = "Place listings on the map and center on highlighted listings"
)]
struct Cli {
    /// Config file overriding the built-in defaults (also read from
    /// `LISTING_MAP_CONFIG`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every listing and print its coordinate and tier
    Resolve {
        /// JSON listings file
        listings: PathBuf,
    },
    /// Build one map frame and print it as JSON
    Browse {
        /// JSON listings file
        listings: PathBuf,
        /// Listing to highlight
        #[arg(long)]
        highlight: Option<String>,
        /// Device latitude
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Device longitude
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
        /// Bookmarked listing ids, comma separated
        #[arg(long, value_delimiter = ',')]
        bookmarks: Vec<String>,
        /// Give up waiting for lookups after this many seconds
        #[arg(long, default_value = "30")]
        settle_secs: u64,
    },
    /// Pick listings to highlight from a menu
    Interactive {
        /// JSON listings file
        listings: PathBuf,
    },
}

/// Builds the geocoding provider chain from the embedded service registry.
fn build_geocoder() -> Result<Arc<dyn Geocoder>, Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("listing_map/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(5))
        .build()?;

    let registry = ServiceRegistry::embedded()?;
    let chain = ProviderChain::from_registry(&client, &registry);
    log::info!("Geocoding providers: {}", chain.provider_ids().join(", "));

    Ok(Arc::new(chain))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = listing_map_cli_utils::init_logger();
    let cli = Cli::parse();
    let config = MapConfig::load(cli.config.as_deref())?;
    let geocoder = build_geocoder()?;

    let Some(command) = cli.command else {
        let path: String = Input::new()
            .with_prompt("Listings file")
            .default("listings.json".to_string())
            .interact_text()?;
        return interactive::run(&config, geocoder, &PathBuf::from(path), &multi).await;
    };

    match command {
        Commands::Resolve { listings } => {
            browse::resolve(&config, geocoder, &listings, &multi).await?;
        }
        Commands::Browse {
            listings,
            highlight,
            lat,
            lon,
            bookmarks,
            settle_secs,
        } => {
            let options = browse::BrowseOptions {
                highlight,
                device_location: lat
                    .zip(lon)
                    .map(|(lat, lon)| listing_map_geography_models::Coordinate::new(lat, lon)),
                bookmarks,
                settle: Duration::from_secs(settle_secs),
            };
            browse::browse(&config, geocoder, &listings, options, &multi).await?;
        }
        Commands::Interactive { listings } => {
            interactive::run(&config, geocoder, &listings, &multi).await?;
        }
    }

    Ok(())
}
