//! The relational adapter, reading the database written by [`crate::prepare_data`].

use crate::filtering::{CitySelection, RecordPredicate};
use crate::records::{records_to_frame, RecordError};
use crate::stores::{ReferenceStore, StoreError, WeatherStore};
use crate::types::metric::{MetricColumn, COL_CITY, COL_DATE, COL_SEASON};
use crate::types::reference::{City, Country};
use crate::types::season::Season;
use crate::types::weather_record::WeatherRecord;
use chrono::NaiveDate;
use log::{error, info};
use polars::prelude::DataFrame;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use std::collections::BTreeSet;
use std::path::Path;

pub(crate) const COUNTRIES_TABLE: &str = "countries";
pub(crate) const CITIES_TABLE: &str = "cities";
pub(crate) const WEATHER_TABLE: &str = "weather";

const MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, FromRow)]
struct CityRow {
    city_name: String,
    country: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, FromRow)]
struct WeatherRow {
    date: NaiveDate,
    city_name: String,
    season: String,
    avg_temp_c: Option<f64>,
    min_temp_c: Option<f64>,
    max_temp_c: Option<f64>,
    precipitation_mm: Option<f64>,
    snow_depth_mm: Option<f64>,
    avg_wind_speed_kmh: Option<f64>,
    avg_wind_dir_deg: Option<f64>,
    peak_wind_gust_kmh: Option<f64>,
    avg_sea_level_pres_hpa: Option<f64>,
    sunshine_total_min: Option<f64>,
}

impl WeatherRow {
    fn into_record(self, row: usize) -> Result<WeatherRecord, RecordError> {
        let season =
            Season::from_label(&self.season).ok_or_else(|| RecordError::UnknownSeason {
                label: self.season.clone(),
                row,
            })?;
        Ok(WeatherRecord {
            date: self.date,
            city_name: self.city_name,
            season,
            avg_temp_c: self.avg_temp_c,
            min_temp_c: self.min_temp_c,
            max_temp_c: self.max_temp_c,
            precipitation_mm: self.precipitation_mm,
            snow_depth_mm: self.snow_depth_mm,
            avg_wind_speed_kmh: self.avg_wind_speed_kmh,
            avg_wind_dir_deg: self.avg_wind_dir_deg,
            peak_wind_gust_kmh: self.peak_wind_gust_kmh,
            avg_sea_level_pres_hpa: self.avg_sea_level_pres_hpa,
            sunshine_total_min: self.sunshine_total_min,
        })
    }
}

/// The `SELECT` list of weather queries, in schema order.
fn weather_select_list() -> String {
    let mut columns = vec![COL_DATE, COL_CITY, COL_SEASON];
    columns.extend(MetricColumn::ALL.iter().map(|m| m.column_name()));
    columns.join(", ")
}

/// Appends the `WHERE` clause of a predicate, with every value bound as a parameter.
fn push_predicate(builder: &mut QueryBuilder<'_, Sqlite>, predicate: &RecordPredicate) {
    let mut has_condition = false;
    let mut next_condition = |builder: &mut QueryBuilder<'_, Sqlite>| {
        builder.push(if has_condition { " AND " } else { " WHERE " });
        has_condition = true;
    };

    if let Some(start) = predicate.start_date {
        next_condition(builder);
        builder.push("date >= ").push_bind(start);
    }
    if let Some(end) = predicate.end_date {
        next_condition(builder);
        builder.push("date <= ").push_bind(end);
    }
    match &predicate.cities {
        CitySelection::Any => {}
        CitySelection::Only(cities) if cities.is_empty() => {
            next_condition(builder);
            builder.push("1 = 0");
        }
        CitySelection::Only(cities) => {
            next_condition(builder);
            builder.push("city_name IN (");
            let mut separated = builder.separated(", ");
            for city in cities {
                separated.push_bind(city.clone());
            }
            separated.push_unseparated(")");
        }
    }
    if !predicate.seasons.is_empty() {
        next_condition(builder);
        builder.push("season IN (");
        let mut separated = builder.separated(", ");
        for season in &predicate.seasons {
            separated.push_bind(season.as_str());
        }
        separated.push_unseparated(")");
    }
}

/// Reads weather records from the SQLite database built by the preparation step.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connects to an existing database file. The file is never created here: an absent
    /// database means the preparation step has not run.
    pub async fn connect(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            error!("Database {} not found", path.display());
            return Err(StoreError::MissingFile(path.to_path_buf()));
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(false);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connect(path.to_path_buf(), e))?;
        info!("Connected to database {}", path.display());
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn sql_error(query: &str, source: sqlx::Error) -> StoreError {
    error!("SQL query failed: {} ({})", query, source);
    StoreError::SqlQuery {
        query: query.to_string(),
        source,
    }
}

impl ReferenceStore for SqliteStore {
    async fn get_countries(&self) -> Result<Vec<Country>, StoreError> {
        let query = format!("SELECT DISTINCT country FROM {}", COUNTRIES_TABLE);
        let names: Vec<String> = sqlx::query_scalar(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| sql_error(&query, e))?;
        info!("Loaded {} countries", names.len());
        Ok(names.into_iter().map(|name| Country { name }).collect())
    }

    async fn get_cities(
        &self,
        countries: Option<&BTreeSet<String>>,
    ) -> Result<Vec<City>, StoreError> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT city_name, country, latitude, longitude FROM {}",
            CITIES_TABLE
        ));
        if let Some(countries) = countries.filter(|c| !c.is_empty()) {
            builder.push(" WHERE country IN (");
            let mut separated = builder.separated(", ");
            for country in countries {
                separated.push_bind(country.clone());
            }
            separated.push_unseparated(")");
        }

        let sql = builder.sql().to_string();
        let rows: Vec<CityRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| sql_error(&sql, e))?;
        info!("Loaded {} cities for countries {:?}", rows.len(), countries);
        Ok(rows
            .into_iter()
            .map(|r| City::new(r.city_name, r.country, r.latitude, r.longitude))
            .collect())
    }
}

impl WeatherStore for SqliteStore {
    async fn get_weather(
        &self,
        predicate: &RecordPredicate,
        row_limit: usize,
    ) -> Result<DataFrame, StoreError> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM {}",
            weather_select_list(),
            WEATHER_TABLE
        ));
        push_predicate(&mut builder, predicate);
        builder
            .push(" LIMIT ")
            .push_bind(i64::try_from(row_limit).unwrap_or(i64::MAX));

        let sql = builder.sql().to_string();
        let rows: Vec<WeatherRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Weather query with {:?} failed", predicate);
                sql_error(&sql, e)
            })?;
        info!("Loaded {} weather records", rows.len());

        let records = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| row.into_record(i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records_to_frame(&records)?)
    }

    async fn get_weather_for_single_date(
        &self,
        date: NaiveDate,
        metric: MetricColumn,
    ) -> Result<Vec<(String, Option<f64>)>, StoreError> {
        // Column names come from MetricColumn only, never from user input.
        let query = format!(
            "SELECT {}, {} FROM {} WHERE date = ?",
            COL_CITY,
            metric.column_name(),
            WEATHER_TABLE
        );
        let pairs: Vec<(String, Option<f64>)> = sqlx::query_as(&query)
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Map query for {} on {} failed", metric, date);
                sql_error(&query, e)
            })?;
        info!("Returned {} rows for {} on {}", pairs.len(), metric, date);
        Ok(pairs)
    }
}
