use crate::types::season::Season;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of weather observations for one city.
///
/// (city_name, date) identifies a record in practice, but nothing enforces it.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub date: NaiveDate,                     // date
    pub city_name: String,                   // city_name
    pub season: Season,                      // season
    pub avg_temp_c: Option<f64>,             // avg_temp_c
    pub min_temp_c: Option<f64>,             // min_temp_c
    pub max_temp_c: Option<f64>,             // max_temp_c
    pub precipitation_mm: Option<f64>,       // precipitation_mm (daily sum)
    pub snow_depth_mm: Option<f64>,          // snow_depth_mm
    pub avg_wind_speed_kmh: Option<f64>,     // avg_wind_speed_kmh
    pub avg_wind_dir_deg: Option<f64>,       // avg_wind_dir_deg (0-360)
    pub peak_wind_gust_kmh: Option<f64>,     // peak_wind_gust_kmh
    pub avg_sea_level_pres_hpa: Option<f64>, // avg_sea_level_pres_hpa
    pub sunshine_total_min: Option<f64>,     // sunshine_total_min (often absent)
}

impl WeatherRecord {
    /// A record with only the identifying fields set and every measurement missing.
    pub fn new(date: NaiveDate, city_name: impl Into<String>, season: Season) -> Self {
        Self {
            date,
            city_name: city_name.into(),
            season,
            avg_temp_c: None,
            min_temp_c: None,
            max_temp_c: None,
            precipitation_mm: None,
            snow_depth_mm: None,
            avg_wind_speed_kmh: None,
            avg_wind_dir_deg: None,
            peak_wind_gust_kmh: None,
            avg_sea_level_pres_hpa: None,
            sunshine_total_min: None,
        }
    }
}
