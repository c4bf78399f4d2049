//! City-level tier of the static location table.
//!
//! Approximate centers for major US cities, keyed by a normalized
//! `"city,ST"` string built with [`city_key`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::Coordinate;

/// `(city, state abbreviation, latitude, longitude)`.
const CITY_CENTERS: &[(&str, &str, f64, f64)] = &[
    ("Albuquerque", "NM", 35.0844, -106.6504),
    ("Anaheim", "CA", 33.8366, -117.9143),
    ("Anchorage", "AK", 61.2181, -149.9003),
    ("Arlington", "TX", 32.7357, -97.1081),
    ("Arlington", "VA", 38.8816, -77.0910),
    ("Atlanta", "GA", 33.7490, -84.3880),
    ("Aurora", "CO", 39.7294, -104.8319),
    ("Austin", "TX", 30.2672, -97.7431),
    ("Bakersfield", "CA", 35.3733, -119.0187),
    ("Baltimore", "MD", 39.2904, -76.6122),
    ("Baton Rouge", "LA", 30.4515, -91.1871),
    ("Birmingham", "AL", 33.5186, -86.8104),
    ("Boise", "ID", 43.6150, -116.2023),
    ("Boston", "MA", 42.3601, -71.0589),
    ("Boca Raton", "FL", 26.3683, -80.1289),
    ("Buffalo", "NY", 42.8864, -78.8784),
    ("Burlington", "VT", 44.4759, -73.2121),
    ("Cape Coral", "FL", 26.5629, -81.9495),
    ("Charleston", "SC", 32.7765, -79.9311),
    ("Charlotte", "NC", 35.2271, -80.8431),
    ("Cheyenne", "WY", 41.1400, -104.8202),
    ("Chicago", "IL", 41.8781, -87.6298),
    ("Cincinnati", "OH", 39.1031, -84.5120),
    ("Cleveland", "OH", 41.4993, -81.6944),
    ("Colorado Springs", "CO", 38.8339, -104.8214),
    ("Columbus", "OH", 39.9612, -82.9988),
    ("Coral Gables", "FL", 25.7215, -80.2684),
    ("Dallas", "TX", 32.7767, -96.7970),
    ("Denver", "CO", 39.7392, -104.9903),
    ("Des Moines", "IA", 41.5868, -93.6250),
    ("Detroit", "MI", 42.3314, -83.0458),
    ("Durham", "NC", 35.9940, -78.8986),
    ("El Paso", "TX", 31.7619, -106.4850),
    ("Fort Lauderdale", "FL", 26.1224, -80.1373),
    ("Fort Myers", "FL", 26.6406, -81.8723),
    ("Fort Worth", "TX", 32.7555, -97.3308),
    ("Fresno", "CA", 36.7378, -119.7871),
    ("Gainesville", "FL", 29.6516, -82.3248),
    ("Hartford", "CT", 41.7658, -72.6734),
    ("Hialeah", "FL", 25.8576, -80.2781),
    ("Hollywood", "FL", 26.0112, -80.1495),
    ("Honolulu", "HI", 21.3069, -157.8583),
    ("Houston", "TX", 29.7604, -95.3698),
    ("Indianapolis", "IN", 39.7684, -86.1581),
    ("Jacksonville", "FL", 30.3322, -81.6557),
    ("Jersey City", "NJ", 40.7178, -74.0431),
    ("Kansas City", "MO", 39.0997, -94.5786),
    ("Key West", "FL", 24.5551, -81.7800),
    ("Las Vegas", "NV", 36.1699, -115.1398),
    ("Lexington", "KY", 38.0406, -84.5037),
    ("Little Rock", "AR", 34.7465, -92.2896),
    ("Long Beach", "CA", 33.7701, -118.1937),
    ("Los Angeles", "CA", 34.0522, -118.2437),
    ("Louisville", "KY", 38.2527, -85.7585),
    ("Madison", "WI", 43.0731, -89.4012),
    ("Memphis", "TN", 35.1495, -90.0490),
    ("Mesa", "AZ", 33.4152, -111.8315),
    ("Miami", "FL", 25.7617, -80.1918),
    ("Miami Beach", "FL", 25.7907, -80.1300),
    ("Milwaukee", "WI", 43.0389, -87.9065),
    ("Minneapolis", "MN", 44.9778, -93.2650),
    ("Naples", "FL", 26.1420, -81.7948),
    ("Nashville", "TN", 36.1627, -86.7816),
    ("New Orleans", "LA", 29.9511, -90.0715),
    ("New York", "NY", 40.7128, -74.0060),
    ("Newark", "NJ", 40.7357, -74.1724),
    ("Oakland", "CA", 37.8044, -122.2712),
    ("Oklahoma City", "OK", 35.4676, -97.5164),
    ("Omaha", "NE", 41.2565, -95.9345),
    ("Orlando", "FL", 28.5383, -81.3792),
    ("Philadelphia", "PA", 39.9526, -75.1652),
    ("Phoenix", "AZ", 33.4484, -112.0740),
    ("Pittsburgh", "PA", 40.4406, -79.9959),
    ("Portland", "ME", 43.6591, -70.2568),
    ("Portland", "OR", 45.5152, -122.6784),
    ("Providence", "RI", 41.8240, -71.4128),
    ("Raleigh", "NC", 35.7796, -78.6382),
    ("Reno", "NV", 39.5296, -119.8138),
    ("Richmond", "VA", 37.5407, -77.4360),
    ("Sacramento", "CA", 38.5816, -121.4944),
    ("Saint Louis", "MO", 38.6270, -90.1994),
    ("Saint Paul", "MN", 44.9537, -93.0900),
    ("Saint Petersburg", "FL", 27.7676, -82.6403),
    ("Salt Lake City", "UT", 40.7608, -111.8910),
    ("San Antonio", "TX", 29.4241, -98.4936),
    ("San Diego", "CA", 32.7157, -117.1611),
    ("San Francisco", "CA", 37.7749, -122.4194),
    ("San Jose", "CA", 37.3382, -121.8863),
    ("Santa Fe", "NM", 35.6870, -105.9378),
    ("Sarasota", "FL", 27.3364, -82.5307),
    ("Savannah", "GA", 32.0809, -81.0912),
    ("Scottsdale", "AZ", 33.4942, -111.9261),
    ("Seattle", "WA", 47.6062, -122.3321),
    ("Sioux Falls", "SD", 43.5446, -96.7311),
    ("Spokane", "WA", 47.6588, -117.4260),
    ("Tallahassee", "FL", 30.4383, -84.2807),
    ("Tampa", "FL", 27.9506, -82.4572),
    ("Tucson", "AZ", 32.2226, -110.9747),
    ("Tulsa", "OK", 36.1540, -95.9928),
    ("Virginia Beach", "VA", 36.8529, -75.9780),
    ("Washington", "DC", 38.9072, -77.0369),
    ("West Palm Beach", "FL", 26.7153, -80.0534),
    ("Wichita", "KS", 37.6872, -97.3301),
    ("Wilmington", "DE", 39.7391, -75.5398),
];

static CITY_INDEX: LazyLock<BTreeMap<String, Coordinate>> = LazyLock::new(|| {
    CITY_CENTERS
        .iter()
        .map(|&(city, state, lat, lng)| (city_key(city, state), Coordinate::new(lat, lng)))
        .collect()
});

/// Normalizes a city name for table lookups.
///
/// Lowercases, drops punctuation, collapses whitespace and folds a
/// leading `"saint"` to `"st"`, so `"St. Louis"`, `"saint  louis"` and
/// `"ST LOUIS"` all produce `"st louis"`.
#[must_use]
pub fn normalize_city(raw: &str) -> String {
    let lowered: String = raw
        .chars()
        .filter(|c| !matches!(c, '.' | ',' | '\''))
        .collect::<String>()
        .to_lowercase();

    let mut words: Vec<&str> = lowered.split_whitespace().collect();
    if words.first() == Some(&"saint") {
        words[0] = "st";
    }
    words.join(" ")
}

/// Builds the `"city,ST"` lookup key.
#[must_use]
pub fn city_key(city: &str, state_abbr: &str) -> String {
    format!(
        "{},{}",
        normalize_city(city),
        state_abbr.trim().to_ascii_uppercase()
    )
}

/// Returns the approximate center of a city, if the table knows it.
#[must_use]
pub fn city_center(city: &str, state_abbr: &str) -> Option<Coordinate> {
    let key = city_key(city, state_abbr);
    if key.starts_with(',') {
        return None;
    }
    CITY_INDEX.get(&key).copied()
}

/// Number of distinct city keys in the table.
#[must_use]
pub fn city_count() -> usize {
    CITY_INDEX.len()
}
