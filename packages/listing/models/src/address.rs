//! Address component normalization for listings.
//!
//! Listing records arrive with partially filled address fields:
//! - Missing or blank: `None`, `""`, `"   "`
//! - Placeholder values: `"N/A"`, `"TBD"`, `"UNKNOWN"`
//! - Irregular spacing: `"100   Main  St "`
//!
//! This module turns the available components into a single one-line
//! address suitable for precise geocoding.

use regex::Regex;
use std::sync::LazyLock;

/// Runs of whitespace inside a component.
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Unit designators that already carry their own prefix.
static UNIT_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(#|APT\b|APARTMENT\b|UNIT\b|STE\b|SUITE\b|FL\b|FLOOR\b|BLDG\b|PH\b)")
        .expect("valid regex")
});

/// Values that data entry uses in place of a real component.
static PLACEHOLDERS: &[&str] = &[
    "UNKNOWN",
    "N/A",
    "NA",
    "NONE",
    "NULL",
    "TBD",
    "-",
    "NOT AVAILABLE",
    "UNDISCLOSED",
    "ADDRESS NOT DISCLOSED",
];

/// Cleans a single address component.
///
/// Returns `None` for absent, blank or placeholder values.
#[must_use]
pub fn normalize_component(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }

    let collapsed = WHITESPACE_RE.replace_all(trimmed, " ").to_string();
    let upper = collapsed.to_uppercase();
    if PLACEHOLDERS.iter().any(|p| upper == *p) {
        return None;
    }

    Some(collapsed)
}

/// Formats a unit so it reads naturally after the street.
///
/// `"4B"` becomes `"#4B"`; values that already carry a designator
/// (`"Apt 4B"`, `"#4B"`, `"Suite 200"`) are kept as-is.
#[must_use]
pub fn format_unit(unit: &str) -> String {
    if UNIT_PREFIX_RE.is_match(unit) {
        unit.to_string()
    } else {
        format!("#{unit}")
    }
}

/// The address components of a listing after normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressParts {
    /// Street line.
    pub street: Option<String>,
    /// Unit / apartment.
    pub unit: Option<String>,
    /// City.
    pub city: Option<String>,
    /// State (abbreviation or name, as supplied).
    pub state: Option<String>,
    /// Postal code.
    pub postal_code: Option<String>,
}

impl AddressParts {
    /// Normalizes raw components.
    #[must_use]
    pub fn new(
        street: Option<&str>,
        unit: Option<&str>,
        city: Option<&str>,
        state: Option<&str>,
        postal_code: Option<&str>,
    ) -> Self {
        Self {
            street: normalize_component(street),
            unit: normalize_component(unit),
            city: normalize_component(city),
            state: normalize_component(state),
            postal_code: normalize_component(postal_code),
        }
    }

    /// Returns `true` if no component survived normalization.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.street.is_none()
            && self.unit.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.postal_code.is_none()
    }

    /// Builds the one-line address used for precise geocoding.
    ///
    /// Format: `"<street> <unit>, <city>, <state> <postal>"`, skipping
    /// absent components. A unit without a street is dropped since it
    /// cannot be placed on its own. Returns an empty string when nothing
    /// usable remains.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut segments: Vec<String> = Vec::with_capacity(3);

        if let Some(street) = &self.street {
            match &self.unit {
                Some(unit) => segments.push(format!("{street} {}", format_unit(unit))),
                None => segments.push(street.clone()),
            }
        }

        if let Some(city) = &self.city {
            segments.push(city.clone());
        }

        match (&self.state, &self.postal_code) {
            (Some(state), Some(zip)) => segments.push(format!("{state} {zip}")),
            (Some(state), None) => segments.push(state.clone()),
            (None, Some(zip)) => segments.push(zip.clone()),
            (None, None) => {}
        }

        segments.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_address() {
        let parts = AddressParts::new(
            Some("100 Biscayne Blvd"),
            Some("Apt 12"),
            Some("Miami"),
            Some("FL"),
            Some("33132"),
        );
        assert_eq!(parts.one_line(), "100 Biscayne Blvd Apt 12, Miami, FL 33132");
    }

    #[test]
    fn bare_unit_gets_hash_prefix() {
        let parts = AddressParts::new(Some("5 Elm St"), Some("4B"), None, Some("MA"), None);
        assert_eq!(parts.one_line(), "5 Elm St #4B, MA");
    }

    #[test]
    fn skips_absent_components() {
        let parts = AddressParts::new(Some(""), None, Some("Miami"), Some("FL"), None);
        assert_eq!(parts.one_line(), "Miami, FL");
    }

    #[test]
    fn unit_without_street_is_dropped() {
        let parts = AddressParts::new(None, Some("7"), Some("Tampa"), None, Some("33602"));
        assert_eq!(parts.one_line(), "Tampa, 33602");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(
            normalize_component(Some("  100   Main \t St ")),
            Some("100 Main St".to_string())
        );
    }

    #[test]
    fn placeholders_are_absent() {
        for raw in ["n/a", "UNKNOWN", " tbd ", "-", "Address not disclosed"] {
            assert_eq!(normalize_component(Some(raw)), None, "{raw}");
        }
    }

    #[test]
    fn empty_parts_produce_empty_address() {
        let parts = AddressParts::new(Some(" "), Some(""), None, Some("N/A"), None);
        assert!(parts.is_empty());
        assert_eq!(parts.one_line(), "");
    }

    #[test]
    fn keeps_existing_unit_designators() {
        assert_eq!(format_unit("#3"), "#3");
        assert_eq!(format_unit("Suite 200"), "Suite 200");
        assert_eq!(format_unit("ph 1"), "ph 1");
        assert_eq!(format_unit("12"), "#12");
    }
}
