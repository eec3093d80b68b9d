//! The columnar adapter: reference data from the two CSV files, weather records scanned
//! lazily from the parquet file.

use crate::config::DataPaths;
use crate::filtering::{RecordPredicate, WeatherFrameFilterExt};
use crate::records::{get_f64_column, get_str_column, normalized_weather_columns};
use crate::stores::{ReferenceStore, StoreError, WeatherStore};
use crate::types::metric::{MetricColumn, COL_CITY};
use crate::types::reference::{City, Country};
use chrono::NaiveDate;
use log::{error, info};
use polars::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::task;

const COL_COUNTRY: &str = "country";
const COL_LATITUDE: &str = "latitude";
const COL_LONGITUDE: &str = "longitude";

/// Reads weather records straight from the columnar dataset.
///
/// Reference data is read once when the store is opened and kept in memory. The weather
/// file is only scanned: every query builds a lazy plan (projection, predicate, limit)
/// that polars pushes down into the parquet reader.
#[derive(Clone)]
pub struct ColumnarStore {
    countries: Vec<Country>,
    cities: Vec<City>,
    weather: LazyFrame,
}

impl ColumnarStore {
    /// Opens the three files of the canonical dataset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingFile`] naming the first file that does not exist, or a
    /// read error if a file cannot be parsed.
    pub async fn open(paths: &DataPaths) -> Result<Self, StoreError> {
        for file in paths.required_files() {
            if !file.exists() {
                error!("Data file {} not found", file.display());
                return Err(StoreError::MissingFile(file));
            }
        }

        let countries_path = paths.countries_csv();
        let cities_path = paths.cities_csv();
        let (countries, cities) = task::spawn_blocking(move || {
            let countries = read_countries(&countries_path)?;
            let cities = read_cities(&cities_path)?;
            Ok::<_, StoreError>((countries, cities))
        })
        .await??;
        info!(
            "Loaded {} countries and {} cities",
            countries.len(),
            cities.len()
        );

        let parquet_path = paths.weather_parquet();
        let weather = LazyFrame::scan_parquet(&parquet_path, Default::default())
            .map_err(|e| StoreError::ParquetScan(parquet_path.clone(), e))?
            .select(normalized_weather_columns());

        Ok(Self::new(countries, cities, weather))
    }

    /// Wraps reference data and an already loaded weather frame.
    ///
    /// The frame is normalized to the weather schema, so any frame with the expected
    /// column names works (extra columns are dropped).
    pub fn from_frame(countries: Vec<Country>, cities: Vec<City>, weather: DataFrame) -> Self {
        Self::new(
            countries,
            cities,
            weather.lazy().select(normalized_weather_columns()),
        )
    }

    fn new(countries: Vec<Country>, cities: Vec<City>, weather: LazyFrame) -> Self {
        Self {
            countries,
            cities,
            weather,
        }
    }

    async fn collect(frame: LazyFrame, query: String) -> Result<DataFrame, StoreError> {
        task::spawn_blocking(move || frame.collect())
            .await?
            .map_err(|e| {
                error!("Frame query failed: {} ({})", query, e);
                StoreError::FrameQuery { query, source: e }
            })
    }
}

impl ReferenceStore for ColumnarStore {
    async fn get_countries(&self) -> Result<Vec<Country>, StoreError> {
        Ok(self.countries.clone())
    }

    async fn get_cities(
        &self,
        countries: Option<&BTreeSet<String>>,
    ) -> Result<Vec<City>, StoreError> {
        let cities = match countries {
            Some(countries) if !countries.is_empty() => self
                .cities
                .iter()
                .filter(|city| countries.contains(&city.country))
                .cloned()
                .collect(),
            _ => self.cities.clone(),
        };
        Ok(cities)
    }
}

impl WeatherStore for ColumnarStore {
    async fn get_weather(
        &self,
        predicate: &RecordPredicate,
        row_limit: usize,
    ) -> Result<DataFrame, StoreError> {
        let limit = IdxSize::try_from(row_limit).unwrap_or(IdxSize::MAX);
        let frame = self
            .weather
            .clone()
            .filter_records(predicate)
            .limit(limit);

        let df = Self::collect(frame, format!("{:?} limit {}", predicate, row_limit)).await?;
        info!("Loaded {} weather records", df.height());
        Ok(df)
    }

    async fn get_weather_for_single_date(
        &self,
        date: NaiveDate,
        metric: MetricColumn,
    ) -> Result<Vec<(String, Option<f64>)>, StoreError> {
        let frame = self
            .weather
            .clone()
            .filter_date(date)
            .select([col(COL_CITY), col(metric.column_name())]);

        let df = Self::collect(frame, format!("{} on {}", metric, date)).await?;
        let cities = get_str_column(&df, COL_CITY)?;
        let values = get_f64_column(&df, metric.column_name())?;

        let pairs: Vec<(String, Option<f64>)> = cities
            .into_iter()
            .zip(values.into_iter())
            .filter_map(|(city, value)| city.map(|c| (c.to_string(), value)))
            .collect();
        info!("Returned {} rows for {} on {}", pairs.len(), metric, date);
        Ok(pairs)
    }
}

fn read_csv(path: &Path) -> Result<DataFrame, StoreError> {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| StoreError::CsvRead(path.to_path_buf(), e))?
        .finish()
        .map_err(|e| StoreError::CsvRead(path.to_path_buf(), e))
}

/// Reads the `country` column of the countries file, without duplicates.
pub(crate) fn read_countries(path: &Path) -> Result<Vec<Country>, StoreError> {
    let df = read_csv(path)?;
    let names = get_str_column(&df, COL_COUNTRY).map_err(|e| reference_error(path, e))?;

    let mut seen = BTreeSet::new();
    Ok(names
        .into_iter()
        .flatten()
        .filter(|name| seen.insert(name.to_string()))
        .map(|name| Country {
            name: name.to_string(),
        })
        .collect())
}

/// Reads city names, countries and coordinates from the cities file.
/// Rows without a name, country or coordinates are skipped.
pub(crate) fn read_cities(path: &Path) -> Result<Vec<City>, StoreError> {
    let df = read_csv(path)?
        .lazy()
        .select([
            col(COL_CITY).cast(DataType::String),
            col(COL_COUNTRY).cast(DataType::String),
            col(COL_LATITUDE).cast(DataType::Float64),
            col(COL_LONGITUDE).cast(DataType::Float64),
        ])
        .collect()
        .map_err(|e| StoreError::CsvRead(path.to_path_buf(), e))?;

    let names = get_str_column(&df, COL_CITY).map_err(|e| reference_error(path, e))?;
    let countries = get_str_column(&df, COL_COUNTRY).map_err(|e| reference_error(path, e))?;
    let latitudes = get_f64_column(&df, COL_LATITUDE).map_err(|e| reference_error(path, e))?;
    let longitudes = get_f64_column(&df, COL_LONGITUDE).map_err(|e| reference_error(path, e))?;

    Ok(names
        .into_iter()
        .zip(countries.into_iter())
        .zip(latitudes.into_iter().zip(longitudes.into_iter()))
        .filter_map(|((name, country), (lat, lon))| {
            Some(City::new(name?, country?, lat?, lon?))
        })
        .collect())
}

fn reference_error(path: &Path, source: crate::records::RecordError) -> StoreError {
    StoreError::ReferenceData(PathBuf::from(path), source)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::filtering::CitySelection;
    use crate::records::{frame_to_records, records_to_frame};
    use crate::types::season::Season;
    use crate::types::weather_record::WeatherRecord;
    use std::fs;

    pub(crate) const COUNTRIES_CSV: &str = "iso2,country,capital\n\
        RU,Russia,Moscow\n\
        DE,Germany,Berlin\n\
        AQ,Antarctica,\n";

    pub(crate) const CITIES_CSV: &str = "station_id,city_name,country,latitude,longitude\n\
        26063,Saint Petersburg,Russia,59.94,30.31\n\
        27612,Moscow,Russia,55.75,37.62\n\
        10382,Berlin,Germany,52.52,13.40\n";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub(crate) fn fixture_records() -> Vec<WeatherRecord> {
        let mut records = Vec::new();
        for (city, offset) in [("Saint Petersburg", 0.0), ("Moscow", 1.0), ("Berlin", 5.0)] {
            for (day, season) in [
                (date(2019, 12, 31), Season::Winter),
                (date(2020, 1, 1), Season::Winter),
                (date(2020, 4, 15), Season::Spring),
                (date(2020, 7, 15), Season::Summer),
                (date(2020, 10, 15), Season::Autumn),
                (date(2020, 12, 31), Season::Winter),
                (date(2021, 1, 1), Season::Winter),
            ] {
                let mut record = WeatherRecord::new(day, city, season);
                record.avg_temp_c = Some(offset);
                record.precipitation_mm = Some(1.0);
                records.push(record);
            }
        }
        records
    }

    /// Writes the CSV files and a parquet file holding `records` into `dir`.
    pub(crate) fn write_dataset(
        dir: &Path,
        records: &[WeatherRecord],
    ) -> Result<DataPaths, Box<dyn std::error::Error>> {
        let paths = DataPaths::new(dir);
        fs::write(paths.countries_csv(), COUNTRIES_CSV)?;
        fs::write(paths.cities_csv(), CITIES_CSV)?;
        let mut df = records_to_frame(records)?;
        let file = fs::File::create(paths.weather_parquet())?;
        ParquetWriter::new(file).finish(&mut df)?;
        Ok(paths)
    }

    #[tokio::test]
    async fn test_open_reads_reference_data() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let paths = write_dataset(dir.path(), &fixture_records())?;
        let store = ColumnarStore::open(&paths).await?;

        let countries = store.get_countries().await?;
        assert_eq!(countries.len(), 3);

        let russia: BTreeSet<String> = ["Russia".to_string()].into();
        let cities = store.get_cities(Some(&russia)).await?;
        let names: Vec<&str> = cities.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Saint Petersburg", "Moscow"]);
        assert_eq!(store.get_cities(None).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_open_reports_missing_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let paths = write_dataset(dir.path(), &fixture_records())?;
        fs::remove_file(paths.cities_csv())?;

        match ColumnarStore::open(&paths).await {
            Err(StoreError::MissingFile(path)) => assert_eq!(path, paths.cities_csv()),
            Err(other) => panic!("Expected MissingFile, got {:?}", other),
            Ok(_) => panic!("Expected MissingFile, store opened"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_get_weather_pushes_down_filter_and_limit(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let paths = write_dataset(dir.path(), &fixture_records())?;
        let store = ColumnarStore::open(&paths).await?;

        let predicate = RecordPredicate {
            cities: CitySelection::Only(["Moscow".to_string()].into()),
            start_date: Some(date(2020, 1, 1)),
            end_date: Some(date(2020, 12, 31)),
            ..RecordPredicate::all()
        };
        let df = store.get_weather(&predicate, 100).await?;
        let records = frame_to_records(&df)?;
        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| predicate.matches(r)));

        let limited = store.get_weather(&RecordPredicate::all(), 4).await?;
        assert_eq!(limited.height(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_single_date_values() -> Result<(), Box<dyn std::error::Error>> {
        let store = ColumnarStore::from_frame(
            vec![],
            vec![],
            records_to_frame(&fixture_records())?,
        );
        let mut pairs = store
            .get_weather_for_single_date(date(2020, 7, 15), MetricColumn::AvgTemp)
            .await?;
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            pairs,
            vec![
                ("Berlin".to_string(), Some(5.0)),
                ("Moscow".to_string(), Some(1.0)),
                ("Saint Petersburg".to_string(), Some(0.0)),
            ]
        );
        Ok(())
    }
}
