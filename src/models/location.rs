//! Location models: raw coordinates and the place name resolved from them

use serde::{Deserialize, Serialize};

/// Device coordinates in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinates {
    /// Create a new coordinate pair
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Format as `"lat, lon"` with exactly two decimal digits each.
    ///
    /// Used as the place name when reverse geocoding fails.
    #[must_use]
    pub fn format_fixed2(&self) -> String {
        format!(
            "{}, {}",
            to_fixed2(self.latitude),
            to_fixed2(self.longitude)
        )
    }
}

/// Two-digit fixed formatting, rounding by the stored value. Only exact
/// binary ties (x.125, x.375, ...) need help: they round away from zero.
/// Every such tie is a multiple of 1/8, so values like 2.675, stored just
/// below the tie, fall through to `format!`.
fn to_fixed2(value: f64) -> String {
    let exact_tie = (value * 8.0).fract() == 0.0 && (value.abs() * 100.0).fract() == 0.5;
    if exact_tie {
        format!("{:.2}", value + value.signum() * 0.001)
    } else {
        format!("{value:.2}")
    }
}

/// City and country for a coordinate pair
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlaceName {
    pub city: String,
    pub country: String,
}

impl PlaceName {
    #[must_use]
    pub fn new<C: Into<String>, K: Into<String>>(city: C, country: K) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
        }
    }

    /// Display string `"{city}, {country}"`
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }
}

impl std::fmt::Display for PlaceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.city, self.country)
    }
}
