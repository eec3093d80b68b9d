//! The offline preparation step: loads the two reference CSV files and the parquet
//! weather file into the SQLite database read by [`crate::SqliteStore`].

use crate::config::{DataPaths, CHUNK_SIZE, INSERT_BATCH_ROWS};
use crate::records::{frame_to_records, metric_value, normalized_weather_columns, RecordError};
use crate::stores::columnar::{read_cities, read_countries};
use crate::stores::sqlite::{CITIES_TABLE, COUNTRIES_TABLE, WEATHER_TABLE};
use crate::stores::StoreError;
use crate::types::metric::{MetricColumn, COL_CITY, COL_DATE, COL_SEASON};
use crate::types::reference::{City, Country};
use crate::types::weather_record::WeatherRecord;
use crate::utils::ensure_dir_exists;
use log::{error, info};
use polars::prelude::*;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::task;

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("Required data file '{0}' not found")]
    MissingFile(PathBuf),

    #[error("Failed to create directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read input data")]
    Input(#[from] StoreError),

    #[error("Failed to read weather chunk at row {offset} of '{path}'")]
    WeatherChunk {
        path: PathBuf,
        offset: usize,
        #[source]
        source: PolarsError,
    },

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("Database error while {step}")]
    Database {
        step: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

fn db_error(step: &'static str) -> impl FnOnce(sqlx::Error) -> PrepareError {
    move |source| {
        error!("Database error while {}: {}", step, source);
        PrepareError::Database { step, source }
    }
}

/// Row counts written by [`prepare_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrepareSummary {
    pub countries: usize,
    pub cities: usize,
    pub weather_records: usize,
    pub chunks: usize,
}

/// Checks that every input file exists before anything is written.
pub fn check_files_exist(paths: &DataPaths) -> Result<(), PrepareError> {
    for file in paths.required_files() {
        if !file.exists() {
            error!("Data file {} not found", file.display());
            return Err(PrepareError::MissingFile(file));
        }
    }
    Ok(())
}

/// Builds the database from the input files, replacing any previous content.
///
/// Weather rows are read from the parquet file `CHUNK_SIZE` at a time and each chunk is
/// written in its own transaction. Indexes are created once all rows are in.
pub async fn prepare_data(paths: &DataPaths) -> Result<PrepareSummary, PrepareError> {
    info!("Starting data preparation in {}", paths.data_dir().display());
    check_files_exist(paths)?;

    if let Some(parent) = paths.database().parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir_exists(parent)
            .await
            .map_err(|e| PrepareError::DirCreation(parent.to_path_buf(), e))?;
    }
    let pool = open_pool(paths.database()).await?;
    create_tables(&pool).await?;

    let mut summary = PrepareSummary::default();

    let countries_path = paths.countries_csv();
    let countries = task::spawn_blocking(move || read_countries(&countries_path)).await??;
    info!("Loading {} countries", countries.len());
    insert_countries(&pool, &countries).await?;
    summary.countries = countries.len();

    let cities_path = paths.cities_csv();
    let cities = task::spawn_blocking(move || read_cities(&cities_path)).await??;
    info!("Loading {} cities", cities.len());
    insert_cities(&pool, &cities).await?;
    summary.cities = cities.len();

    let weather_path = paths.weather_parquet();
    let mut offset = 0;
    loop {
        let chunk = read_weather_chunk(&weather_path, offset).await?;
        if chunk.is_empty() {
            break;
        }
        summary.chunks += 1;
        info!(
            "Writing chunk {} ({} rows)",
            summary.chunks,
            chunk.len()
        );
        insert_weather(&pool, &chunk).await?;
        summary.weather_records += chunk.len();
        offset += chunk.len();
        if chunk.len() < CHUNK_SIZE {
            break;
        }
    }

    create_indexes(&pool).await?;
    pool.close().await;
    info!("Data preparation finished: {:?}", summary);
    Ok(summary)
}

async fn open_pool(path: &Path) -> Result<SqlitePool, PrepareError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(db_error("opening the database"))
}

async fn read_weather_chunk(path: &Path, offset: usize) -> Result<Vec<WeatherRecord>, PrepareError> {
    let path = path.to_path_buf();
    task::spawn_blocking(move || -> Result<Vec<WeatherRecord>, PrepareError> {
        let chunk_error = |source| PrepareError::WeatherChunk {
            path: path.clone(),
            offset,
            source,
        };
        let df = LazyFrame::scan_parquet(&path, Default::default())
            .map_err(chunk_error)?
            .select(normalized_weather_columns())
            .slice(offset as i64, CHUNK_SIZE as IdxSize)
            .collect()
            .map_err(chunk_error)?;
        Ok(frame_to_records(&df)?)
    })
    .await?
}

/// Drops and recreates the three tables.
pub(crate) async fn create_tables(pool: &SqlitePool) -> Result<(), PrepareError> {
    let metric_columns: Vec<String> = MetricColumn::ALL
        .iter()
        .map(|m| format!("{} REAL", m.column_name()))
        .collect();
    let statements = [
        format!("DROP TABLE IF EXISTS {}", COUNTRIES_TABLE),
        format!("DROP TABLE IF EXISTS {}", CITIES_TABLE),
        format!("DROP TABLE IF EXISTS {}", WEATHER_TABLE),
        format!("CREATE TABLE {} (country TEXT NOT NULL)", COUNTRIES_TABLE),
        format!(
            "CREATE TABLE {} (city_name TEXT NOT NULL, country TEXT NOT NULL, \
             latitude REAL NOT NULL, longitude REAL NOT NULL)",
            CITIES_TABLE
        ),
        format!(
            "CREATE TABLE {} ({} TEXT NOT NULL, {} TEXT NOT NULL, {} TEXT NOT NULL, {})",
            WEATHER_TABLE,
            COL_DATE,
            COL_CITY,
            COL_SEASON,
            metric_columns.join(", ")
        ),
    ];
    for statement in statements {
        sqlx::query(&statement)
            .execute(pool)
            .await
            .map_err(db_error("creating tables"))?;
    }
    Ok(())
}

pub(crate) async fn insert_countries(
    pool: &SqlitePool,
    countries: &[Country],
) -> Result<(), PrepareError> {
    let mut tx = pool.begin().await.map_err(db_error("loading countries"))?;
    for batch in countries.chunks(INSERT_BATCH_ROWS) {
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("INSERT INTO {} (country) ", COUNTRIES_TABLE));
        builder.push_values(batch, |mut b, country| {
            b.push_bind(country.name.clone());
        });
        builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(db_error("loading countries"))?;
    }
    tx.commit().await.map_err(db_error("loading countries"))
}

pub(crate) async fn insert_cities(pool: &SqlitePool, cities: &[City]) -> Result<(), PrepareError> {
    let mut tx = pool.begin().await.map_err(db_error("loading cities"))?;
    for batch in cities.chunks(INSERT_BATCH_ROWS) {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "INSERT INTO {} (city_name, country, latitude, longitude) ",
            CITIES_TABLE
        ));
        builder.push_values(batch, |mut b, city| {
            b.push_bind(city.name.clone())
                .push_bind(city.country.clone())
                .push_bind(city.latitude)
                .push_bind(city.longitude);
        });
        builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(db_error("loading cities"))?;
    }
    tx.commit().await.map_err(db_error("loading cities"))
}

/// Inserts weather records in one transaction, using multi-row statements of at most
/// `INSERT_BATCH_ROWS` rows.
pub(crate) async fn insert_weather(
    pool: &SqlitePool,
    records: &[WeatherRecord],
) -> Result<(), PrepareError> {
    let mut columns = vec![COL_DATE, COL_CITY, COL_SEASON];
    columns.extend(MetricColumn::ALL.iter().map(|m| m.column_name()));
    let insert = format!("INSERT INTO {} ({}) ", WEATHER_TABLE, columns.join(", "));

    let mut tx = pool.begin().await.map_err(db_error("loading weather"))?;
    for batch in records.chunks(INSERT_BATCH_ROWS) {
        let mut builder = QueryBuilder::<Sqlite>::new(insert.as_str());
        builder.push_values(batch, |mut b, record| {
            b.push_bind(record.date)
                .push_bind(record.city_name.clone())
                .push_bind(record.season.as_str());
            for metric in MetricColumn::ALL {
                b.push_bind(metric_value(record, metric));
            }
        });
        builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(db_error("loading weather"))?;
    }
    tx.commit().await.map_err(db_error("loading weather"))
}

pub(crate) async fn create_indexes(pool: &SqlitePool) -> Result<(), PrepareError> {
    let statements = [
        format!(
            "CREATE INDEX IF NOT EXISTS idx_country ON {} (country)",
            COUNTRIES_TABLE
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_city ON {} ({})",
            CITIES_TABLE, COL_CITY
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_weather ON {} ({}, {}, {})",
            WEATHER_TABLE, COL_DATE, COL_CITY, COL_SEASON
        ),
    ];
    for statement in statements {
        sqlx::query(&statement)
            .execute(pool)
            .await
            .map_err(db_error("creating indexes"))?;
    }
    info!("Created indexes");
    Ok(())
}
