//! US state table.
//!
//! Maps between two-letter abbreviations and full names, and provides an
//! approximate center coordinate for each of the 50 states + DC. The
//! centers are the bare-state tier of the static location table.

use crate::Coordinate;

/// A single row of the state table.
#[derive(Debug, Clone, Copy)]
pub struct StateInfo {
    /// Two-letter USPS abbreviation.
    pub abbr: &'static str,
    /// Full state name.
    pub name: &'static str,
    /// Approximate geographic center.
    pub center: Coordinate,
}

const fn state(abbr: &'static str, name: &'static str, lat: f64, lng: f64) -> StateInfo {
    StateInfo {
        abbr,
        name,
        center: Coordinate::new(lat, lng),
    }
}

/// The 50 US states + DC, ordered by abbreviation.
pub const STATES: &[StateInfo] = &[
    state("AK", "Alaska", 61.370_716, -152.404_419),
    state("AL", "Alabama", 32.806_671, -86.791_130),
    state("AR", "Arkansas", 34.969_704, -92.373_123),
    state("AZ", "Arizona", 33.729_759, -111.431_221),
    state("CA", "California", 36.116_203, -119.681_564),
    state("CO", "Colorado", 39.059_811, -105.311_104),
    state("CT", "Connecticut", 41.597_782, -72.755_371),
    state("DC", "District of Columbia", 38.897_438, -77.026_817),
    state("DE", "Delaware", 39.318_523, -75.507_141),
    state("FL", "Florida", 27.766_279, -81.686_783),
    state("GA", "Georgia", 33.040_619, -83.643_074),
    state("HI", "Hawaii", 21.094_318, -157.498_337),
    state("IA", "Iowa", 42.011_539, -93.210_526),
    state("ID", "Idaho", 44.240_459, -114.478_828),
    state("IL", "Illinois", 40.349_457, -88.986_137),
    state("IN", "Indiana", 39.849_426, -86.258_278),
    state("KS", "Kansas", 38.526_600, -96.726_486),
    state("KY", "Kentucky", 37.668_140, -84.670_067),
    state("LA", "Louisiana", 31.169_546, -91.867_805),
    state("MA", "Massachusetts", 42.230_171, -71.530_106),
    state("MD", "Maryland", 39.063_946, -76.802_101),
    state("ME", "Maine", 44.693_947, -69.381_927),
    state("MI", "Michigan", 43.326_618, -84.536_095),
    state("MN", "Minnesota", 45.694_454, -93.900_192),
    state("MO", "Missouri", 38.456_085, -92.288_368),
    state("MS", "Mississippi", 32.741_646, -89.678_696),
    state("MT", "Montana", 46.921_925, -110.454_353),
    state("NC", "North Carolina", 35.630_066, -79.806_419),
    state("ND", "North Dakota", 47.528_912, -99.784_012),
    state("NE", "Nebraska", 41.125_370, -98.268_082),
    state("NH", "New Hampshire", 43.452_492, -71.563_896),
    state("NJ", "New Jersey", 40.298_904, -74.521_011),
    state("NM", "New Mexico", 34.840_515, -106.248_482),
    state("NV", "Nevada", 38.313_515, -117.055_374),
    state("NY", "New York", 42.165_726, -74.948_051),
    state("OH", "Ohio", 40.388_783, -82.764_915),
    state("OK", "Oklahoma", 35.565_342, -96.928_917),
    state("OR", "Oregon", 44.572_021, -122.070_938),
    state("PA", "Pennsylvania", 40.590_752, -77.209_755),
    state("RI", "Rhode Island", 41.680_893, -71.511_780),
    state("SC", "South Carolina", 33.856_892, -80.945_007),
    state("SD", "South Dakota", 44.299_782, -99.438_828),
    state("TN", "Tennessee", 35.747_845, -86.692_345),
    state("TX", "Texas", 31.054_487, -97.563_461),
    state("UT", "Utah", 40.150_032, -111.862_434),
    state("VA", "Virginia", 37.769_337, -78.169_968),
    state("VT", "Vermont", 44.045_876, -72.710_686),
    state("WA", "Washington", 47.400_902, -121.490_494),
    state("WI", "Wisconsin", 44.268_543, -89.616_508),
    state("WV", "West Virginia", 38.491_226, -80.954_453),
    state("WY", "Wyoming", 42.755_966, -107.302_490),
];

/// Normalizes a state given as an abbreviation or full name.
///
/// Matching is case-insensitive and ignores surrounding whitespace and
/// periods (`"d.c."` matches `"DC"`). Returns `None` for unknown input.
#[must_use]
pub fn normalize_state(raw: &str) -> Option<&'static str> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '.')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if cleaned.is_empty() {
        return None;
    }

    STATES
        .iter()
        .find(|s| s.abbr.eq_ignore_ascii_case(&cleaned) || s.name.eq_ignore_ascii_case(&cleaned))
        .map(|s| s.abbr)
}

/// Returns the full name for a two-letter abbreviation.
#[must_use]
pub fn state_name(abbr: &str) -> Option<&'static str> {
    find(abbr).map(|s| s.name)
}

/// Returns the approximate center of a state.
#[must_use]
pub fn state_center(abbr: &str) -> Option<Coordinate> {
    find(abbr).map(|s| s.center)
}

fn find(abbr: &str) -> Option<&'static StateInfo> {
    STATES.iter().find(|s| s.abbr.eq_ignore_ascii_case(abbr))
}
