//! Defines the static reference data of the dashboard: countries and the cities
//! that belong to them.

use serde::{Deserialize, Serialize};

/// A country of the reference dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Country {
    /// The country name as used in the `country` column of the cities table (e.g., "Russia").
    pub name: String,
}

/// A city with a weather station, and the country it belongs to.
///
/// The city name is what links weather records to their city (`city_name` column).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    /// The city name (e.g., "Saint Petersburg").
    pub name: String,
    /// The name of the [`Country`] this city belongs to.
    pub country: String,
    /// Latitude in decimal degrees (positive for North, negative for South).
    pub latitude: f64,
    /// Longitude in decimal degrees (positive for East, negative for West).
    pub longitude: f64,
}

impl City {
    pub fn new(
        name: impl Into<String>,
        country: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
            latitude,
            longitude,
        }
    }
}
