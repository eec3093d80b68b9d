//! Defines the columns of the weather record schema: the numeric measurement
//! columns ([`MetricColumn`]) and every displayable column ([`RecordColumn`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub(crate) const COL_DATE: &str = "date";
pub(crate) const COL_CITY: &str = "city_name";
pub(crate) const COL_SEASON: &str = "season";

/// A numeric measurement column of the daily weather dataset.
///
/// Every value in these columns may be missing for any given record (sensor gaps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricColumn {
    /// Average daily temperature in °C.
    AvgTemp,
    /// Minimum daily temperature in °C.
    MinTemp,
    /// Maximum daily temperature in °C.
    MaxTemp,
    /// Daily precipitation sum in mm.
    Precipitation,
    /// Snow depth in mm.
    SnowDepth,
    /// Average wind speed in km/h.
    AvgWindSpeed,
    /// Average wind direction in degrees (0–360).
    AvgWindDirection,
    /// Peak wind gust in km/h.
    PeakWindGust,
    /// Average sea-level air pressure in hPa.
    AvgSeaLevelPressure,
    /// Total sunshine duration in minutes. Mostly absent in the dataset.
    SunshineTotal,
}

/// The metrics shown by default and used for seasonal statistics.
///
/// Sunshine duration is left out because the column is missing for most records.
pub const MAIN_METRICS: [MetricColumn; 7] = [
    MetricColumn::AvgTemp,
    MetricColumn::Precipitation,
    MetricColumn::AvgWindSpeed,
    MetricColumn::AvgWindDirection,
    MetricColumn::PeakWindGust,
    MetricColumn::SnowDepth,
    MetricColumn::AvgSeaLevelPressure,
];

impl MetricColumn {
    /// All metric columns in schema order.
    pub const ALL: [MetricColumn; 10] = [
        MetricColumn::AvgTemp,
        MetricColumn::MinTemp,
        MetricColumn::MaxTemp,
        MetricColumn::Precipitation,
        MetricColumn::SnowDepth,
        MetricColumn::AvgWindSpeed,
        MetricColumn::AvgWindDirection,
        MetricColumn::PeakWindGust,
        MetricColumn::AvgSeaLevelPressure,
        MetricColumn::SunshineTotal,
    ];

    /// The column name used in the parquet file, the SQLite table and exports.
    ///
    /// These names are the only identifiers ever interpolated into SQL text.
    pub fn column_name(&self) -> &'static str {
        match self {
            MetricColumn::AvgTemp => "avg_temp_c",
            MetricColumn::MinTemp => "min_temp_c",
            MetricColumn::MaxTemp => "max_temp_c",
            MetricColumn::Precipitation => "precipitation_mm",
            MetricColumn::SnowDepth => "snow_depth_mm",
            MetricColumn::AvgWindSpeed => "avg_wind_speed_kmh",
            MetricColumn::AvgWindDirection => "avg_wind_dir_deg",
            MetricColumn::PeakWindGust => "peak_wind_gust_kmh",
            MetricColumn::AvgSeaLevelPressure => "avg_sea_level_pres_hpa",
            MetricColumn::SunshineTotal => "sunshine_total_min",
        }
    }

    /// Human readable label with unit, for axis titles and table headers.
    pub fn label(&self) -> &'static str {
        match self {
            MetricColumn::AvgTemp => "Temperature (°C)",
            MetricColumn::MinTemp => "Minimum temperature (°C)",
            MetricColumn::MaxTemp => "Maximum temperature (°C)",
            MetricColumn::Precipitation => "Precipitation (mm)",
            MetricColumn::SnowDepth => "Snow depth (mm)",
            MetricColumn::AvgWindSpeed => "Wind speed (km/h)",
            MetricColumn::AvgWindDirection => "Wind direction (°)",
            MetricColumn::PeakWindGust => "Wind gusts (km/h)",
            MetricColumn::AvgSeaLevelPressure => "Sea-level pressure (hPa)",
            MetricColumn::SunshineTotal => "Sunshine duration (min)",
        }
    }

    pub fn from_column_name(name: &str) -> Option<Self> {
        MetricColumn::ALL
            .into_iter()
            .find(|metric| metric.column_name() == name)
    }
}

/// Formats a `MetricColumn` using its column name.
///
/// # Examples
///
/// ```
/// use weather_dashboard::MetricColumn;
///
/// assert_eq!(MetricColumn::AvgTemp.to_string(), "avg_temp_c");
/// ```
impl fmt::Display for MetricColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown column '{0}'")]
pub struct UnknownColumnError(pub String);

impl FromStr for MetricColumn {
    type Err = UnknownColumnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricColumn::from_column_name(s.trim()).ok_or_else(|| UnknownColumnError(s.to_string()))
    }
}

/// Any column of a weather record that can be displayed or exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordColumn {
    Date,
    CityName,
    Season,
    Metric(MetricColumn),
}

impl RecordColumn {
    /// Every column of the record schema, in schema order.
    pub fn all() -> Vec<RecordColumn> {
        let mut columns = vec![RecordColumn::Date, RecordColumn::CityName, RecordColumn::Season];
        columns.extend(MetricColumn::ALL.into_iter().map(RecordColumn::Metric));
        columns
    }

    /// The default table selection: date, city, season and the main metrics.
    pub fn default_selection() -> Vec<RecordColumn> {
        let mut columns = vec![RecordColumn::Date, RecordColumn::CityName, RecordColumn::Season];
        columns.extend(MAIN_METRICS.into_iter().map(RecordColumn::Metric));
        columns
    }

    pub fn column_name(&self) -> &'static str {
        match self {
            RecordColumn::Date => COL_DATE,
            RecordColumn::CityName => COL_CITY,
            RecordColumn::Season => COL_SEASON,
            RecordColumn::Metric(metric) => metric.column_name(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordColumn::Date => "Date",
            RecordColumn::CityName => "City",
            RecordColumn::Season => "Season",
            RecordColumn::Metric(metric) => metric.label(),
        }
    }
}

impl fmt::Display for RecordColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for RecordColumn {
    type Err = UnknownColumnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            COL_DATE => Ok(RecordColumn::Date),
            COL_CITY => Ok(RecordColumn::CityName),
            COL_SEASON => Ok(RecordColumn::Season),
            other => other.parse().map(RecordColumn::Metric),
        }
    }
}
