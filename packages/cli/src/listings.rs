//! Listing input files.
//!
//! Accepts either a bare JSON array of listings or an object with a
//! `listings` array and an optional `bookmarks` id array.

use std::path::{Path, PathBuf};

use listing_map_listing_models::{Listing, ListingId};
use serde::Deserialize;

/// Errors from reading a listings file.
#[derive(Debug, thiserror::Error)]
pub enum ListingsFileError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not a valid listings document.
    #[error("Invalid listings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Parsed contents of a listings file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingsFile {
    pub listings: Vec<Listing>,
    pub bookmarks: Vec<ListingId>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    Bare(Vec<Listing>),
    Wrapped {
        listings: Vec<Listing>,
        #[serde(default)]
        bookmarks: Vec<ListingId>,
    },
}

impl ListingsFile {
    /// Parses a listings document.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if `content` matches neither layout.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        Ok(match serde_json::from_str(content)? {
            Document::Bare(listings) => Self {
                listings,
                bookmarks: Vec::new(),
            },
            Document::Wrapped {
                listings,
                bookmarks,
            } => Self {
                listings,
                bookmarks,
            },
        })
    }

    /// Reads and parses a listings file.
    ///
    /// # Errors
    ///
    /// Returns [`ListingsFileError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ListingsFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ListingsFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file = Self::from_json(&content).map_err(|source| ListingsFileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        log::info!(
            "Loaded {} listings ({} bookmarked) from {}",
            file.listings.len(),
            file.bookmarks.len(),
            path.display()
        );
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use listing_map_listing_models::ListingCategory;

    use super::*;

    #[test]
    fn bare_array() {
        let file = ListingsFile::from_json(
            r#"[
                {"id": "A", "category": "SALE", "city": "Miami", "state": "FL"},
                {"id": "B", "category": "RENTAL", "street": "1 Main St", "price": 2400}
            ]"#,
        )
        .unwrap();

        assert_eq!(file.listings.len(), 2);
        assert_eq!(file.listings[1].category, ListingCategory::Rental);
        assert_eq!(file.listings[1].price, 2400);
        assert!(file.bookmarks.is_empty());
    }

    #[test]
    fn wrapped_with_bookmarks() {
        let file = ListingsFile::from_json(
            r#"{"listings": [{"id": "A", "category": "SALE"}], "bookmarks": ["A"]}"#,
        )
        .unwrap();

        assert_eq!(file.listings[0].id, ListingId::from("A"));
        assert_eq!(file.bookmarks, vec![ListingId::from("A")]);
    }

    #[test]
    fn rejects_unknown_layout() {
        assert!(ListingsFile::from_json(r#"{"items": []}"#).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ListingsFile::load(Path::new("/nonexistent/listings.json")).unwrap_err();
        assert!(matches!(err, ListingsFileError::Io { .. }));
    }
}
