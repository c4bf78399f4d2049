#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map engine for the listings browser.
//!
//! Turns the working listing set, the coordinate cache, the highlight and
//! the device location into a [`MapFrame`](listing_map_map_models::MapFrame)
//! for the map surface. Requests to center on a listing arrive as
//! [`MapCommand`](listing_map_map_models::MapCommand)s through a
//! [`MapHandle`] shared with the rest of the application.

pub mod annotations;
pub mod config;
pub mod engine;
pub mod highlight;
pub mod store;
pub mod viewport;

pub use config::{ConfigError, MapConfig};
pub use engine::{MapEngine, MapError, MapHandle, SelectionCallback};
pub use store::{InMemoryListingStore, ListingStore, StoreError};
