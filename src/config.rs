//! Constants and file locations shared by the dashboard, the stores and the
//! data-preparation step.

use crate::utils::get_data_dir;
use chrono::NaiveDate;
use std::io;
use std::path::{Path, PathBuf};

/// Maximum number of weather records returned by one query.
pub const ROW_CAP: usize = 30_000;

/// Number of weather rows loaded into the database per transaction.
pub const CHUNK_SIZE: usize = 100_000;

/// Rows per multi-row INSERT statement. 13 bound columns per row keeps a statement
/// well below SQLite's limit of 32 766 bound parameters.
pub const INSERT_BATCH_ROWS: usize = 2_000;

pub const COUNTRIES_FILE_NAME: &str = "countries.csv";
pub const CITIES_FILE_NAME: &str = "cities.csv";
pub const WEATHER_FILE_NAME: &str = "daily_weather.parquet";
pub const DATABASE_FILE_NAME: &str = "db.sqlite";

/// Sheet name of record exports.
pub const RECORDS_SHEET_NAME: &str = "WeatherData";
/// Sheet name of seasonal statistics exports.
pub const SEASONAL_SHEET_NAME: &str = "Seasonal Statistics";

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// The span of dates covered by the dataset, and the ranges offered by default.
///
/// Date pickers are bounded by `timeline_start..=max`, or `min..=max` when the full
/// range is requested. The default selection is
/// `default_start..=default_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetBounds {
    pub min: NaiveDate,
    pub max: NaiveDate,
    pub default_start: NaiveDate,
    pub default_end: NaiveDate,
    /// Start of the timeline slider unless the full range is requested.
    pub timeline_start: NaiveDate,
}

impl Default for DatasetBounds {
    fn default() -> Self {
        Self {
            min: ymd(1750, 2, 1),
            max: ymd(2023, 9, 5),
            default_start: ymd(2019, 1, 1),
            default_end: ymd(2022, 12, 31),
            timeline_start: ymd(2000, 1, 1),
        }
    }
}

impl DatasetBounds {
    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.min..=self.max).contains(&date)
    }

    /// First and last date a picker offers: the whole span with `full_range`, otherwise
    /// `timeline_start..=max`.
    pub fn selectable(&self, full_range: bool) -> (NaiveDate, NaiveDate) {
        if full_range {
            (self.min, self.max)
        } else {
            (self.timeline_start, self.max)
        }
    }

    /// Clamps a date into the selectable range.
    pub fn clamp(&self, date: NaiveDate, full_range: bool) -> NaiveDate {
        let (first, last) = self.selectable(full_range);
        date.clamp(first, last)
    }
}

/// Locations of the canonical input files and of the prepared database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    data_dir: PathBuf,
    database: PathBuf,
}

impl DataPaths {
    /// Expects every file in `data_dir`, including the database.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let database = data_dir.join(DATABASE_FILE_NAME);
        Self { data_dir, database }
    }

    /// Paths inside the per-user data directory, e.g. `~/.local/share/weather_dashboard`.
    pub fn default_location() -> io::Result<Self> {
        Ok(Self::new(get_data_dir()?))
    }

    /// Places the database somewhere other than the data directory.
    pub fn with_database(mut self, database: impl Into<PathBuf>) -> Self {
        self.database = database.into();
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn countries_csv(&self) -> PathBuf {
        self.data_dir.join(COUNTRIES_FILE_NAME)
    }

    pub fn cities_csv(&self) -> PathBuf {
        self.data_dir.join(CITIES_FILE_NAME)
    }

    pub fn weather_parquet(&self) -> PathBuf {
        self.data_dir.join(WEATHER_FILE_NAME)
    }

    pub fn database(&self) -> &Path {
        &self.database
    }

    /// The files the columnar store and the preparation step read.
    pub fn required_files(&self) -> [PathBuf; 3] {
        [self.countries_csv(), self.cities_csv(), self.weather_parquet()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds() {
        let bounds = DatasetBounds::default();
        assert!(bounds.contains(bounds.default_start));
        assert!(bounds.contains(bounds.default_end));
        assert!(!bounds.contains(ymd(2024, 1, 1)));
    }

    #[test]
    fn test_clamp_to_selectable_range() {
        let bounds = DatasetBounds::default();
        assert_eq!(bounds.selectable(false), (ymd(2000, 1, 1), bounds.max));
        assert_eq!(bounds.clamp(ymd(1990, 6, 1), false), ymd(2000, 1, 1));
        assert_eq!(bounds.clamp(ymd(1990, 6, 1), true), ymd(1990, 6, 1));
        assert_eq!(bounds.clamp(ymd(1700, 1, 1), true), bounds.min);
        assert_eq!(bounds.clamp(ymd(2030, 1, 1), false), bounds.max);
    }

    #[test]
    fn test_data_paths() {
        let paths = DataPaths::new("/srv/weather");
        assert_eq!(paths.weather_parquet(), Path::new("/srv/weather/daily_weather.parquet"));
        assert_eq!(paths.database(), Path::new("/srv/weather/db.sqlite"));

        let moved = paths.with_database("/tmp/other.sqlite");
        assert_eq!(moved.database(), Path::new("/tmp/other.sqlite"));
        assert_eq!(moved.required_files().len(), 3);
    }
}
