//! Conversion between polars frames holding the weather schema and [`WeatherRecord`]s.
//!
//! Every store normalizes its output through [`normalized_weather_columns`] so the rest of
//! the crate can rely on one schema: `date` as `Date`, `city_name` and `season` as
//! strings, every measurement as `Float64`.

use crate::types::metric::{MetricColumn, COL_CITY, COL_DATE, COL_SEASON};
use crate::types::season::Season;
use crate::types::weather_record::WeatherRecord;
use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Required column '{0}' not found in DataFrame")]
    ColumnNotFound(String, #[source] PolarsError),

    #[error("Column '{column}' does not have the expected type")]
    ColumnType {
        column: String,
        #[source]
        source: PolarsError,
    },

    #[error("Missing value in required column '{column}' at row {row}")]
    MissingValue { column: &'static str, row: usize },

    #[error("Unknown season label '{label}' at row {row}")]
    UnknownSeason { label: String, row: usize },

    #[error("Failed to build weather DataFrame")]
    Build(#[source] PolarsError),
}

/// Retrieves a column by name from a DataFrame.
pub(crate) fn get_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, RecordError> {
    df.column(name)
        .map_err(|e| RecordError::ColumnNotFound(name.to_string(), e))
}

/// Retrieves a `Float64` column by name.
pub(crate) fn get_f64_column<'a>(
    df: &'a DataFrame,
    name: &str,
) -> Result<&'a Float64Chunked, RecordError> {
    get_column(df, name)?
        .f64()
        .map_err(|e| RecordError::ColumnType {
            column: name.to_string(),
            source: e,
        })
}

/// Retrieves a string column by name.
pub(crate) fn get_str_column<'a>(
    df: &'a DataFrame,
    name: &str,
) -> Result<&'a StringChunked, RecordError> {
    get_column(df, name)?
        .str()
        .map_err(|e| RecordError::ColumnType {
            column: name.to_string(),
            source: e,
        })
}

/// Projection that brings any source frame onto the weather schema.
///
/// The date is cast to `Date`, which also drops a time-of-day component when the source
/// stores datetimes. NaN metric values become missing. Columns not part of the schema
/// (e.g. `station_id`) are dropped.
pub(crate) fn normalized_weather_columns() -> Vec<Expr> {
    let mut columns = vec![
        col(COL_DATE).cast(DataType::Date),
        col(COL_CITY).cast(DataType::String),
        col(COL_SEASON).cast(DataType::String),
    ];
    columns.extend(
        MetricColumn::ALL
            .into_iter()
            .map(|metric| {
                col(metric.column_name())
                    .cast(DataType::Float64)
                    .fill_nan(lit(NULL))
            }),
    );
    columns
}

/// Builds a DataFrame with the weather schema from records.
///
/// An empty slice produces an empty frame that still carries the full schema, so
/// metric and grouping code never has to special-case missing columns.
pub fn records_to_frame(records: &[WeatherRecord]) -> Result<DataFrame, RecordError> {
    let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
    let cities: Vec<&str> = records.iter().map(|r| r.city_name.as_str()).collect();
    let seasons: Vec<&str> = records.iter().map(|r| r.season.as_str()).collect();

    let mut columns = vec![
        Column::new(COL_DATE.into(), dates),
        Column::new(COL_CITY.into(), cities),
        Column::new(COL_SEASON.into(), seasons),
    ];
    for metric in MetricColumn::ALL {
        let values: Vec<Option<f64>> = records.iter().map(|r| metric_value(r, metric)).collect();
        columns.push(Column::new(metric.column_name().into(), values));
    }

    DataFrame::new(columns).map_err(RecordError::Build)
}

/// Collects a weather-schema DataFrame into records.
pub fn frame_to_records(df: &DataFrame) -> Result<Vec<WeatherRecord>, RecordError> {
    let dates = get_column(df, COL_DATE)?
        .date()
        .map_err(|e| RecordError::ColumnType {
            column: COL_DATE.to_string(),
            source: e,
        })?;
    let cities = get_str_column(df, COL_CITY)?;
    let seasons = get_str_column(df, COL_SEASON)?;
    let metrics = MetricColumn::ALL
        .into_iter()
        .map(|metric| get_f64_column(df, metric.column_name()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut records = Vec::with_capacity(df.height());
    for (row, ((date, city), season)) in dates
        .as_date_iter()
        .zip(cities.into_iter())
        .zip(seasons.into_iter())
        .enumerate()
    {
        let date = date.ok_or(RecordError::MissingValue {
            column: COL_DATE,
            row,
        })?;
        let city = city.ok_or(RecordError::MissingValue {
            column: COL_CITY,
            row,
        })?;
        let label = season.ok_or(RecordError::MissingValue {
            column: COL_SEASON,
            row,
        })?;
        let season = Season::from_label(label).ok_or_else(|| RecordError::UnknownSeason {
            label: label.to_string(),
            row,
        })?;

        let mut record = WeatherRecord::new(date, city, season);
        for (metric, values) in MetricColumn::ALL.into_iter().zip(metrics.iter()) {
            *metric_value_mut(&mut record, metric) = values.get(row);
        }
        records.push(record);
    }
    Ok(records)
}

/// Reads one measurement of a record.
pub fn metric_value(record: &WeatherRecord, metric: MetricColumn) -> Option<f64> {
    match metric {
        MetricColumn::AvgTemp => record.avg_temp_c,
        MetricColumn::MinTemp => record.min_temp_c,
        MetricColumn::MaxTemp => record.max_temp_c,
        MetricColumn::Precipitation => record.precipitation_mm,
        MetricColumn::SnowDepth => record.snow_depth_mm,
        MetricColumn::AvgWindSpeed => record.avg_wind_speed_kmh,
        MetricColumn::AvgWindDirection => record.avg_wind_dir_deg,
        MetricColumn::PeakWindGust => record.peak_wind_gust_kmh,
        MetricColumn::AvgSeaLevelPressure => record.avg_sea_level_pres_hpa,
        MetricColumn::SunshineTotal => record.sunshine_total_min,
    }
}

fn metric_value_mut(record: &mut WeatherRecord, metric: MetricColumn) -> &mut Option<f64> {
    match metric {
        MetricColumn::AvgTemp => &mut record.avg_temp_c,
        MetricColumn::MinTemp => &mut record.min_temp_c,
        MetricColumn::MaxTemp => &mut record.max_temp_c,
        MetricColumn::Precipitation => &mut record.precipitation_mm,
        MetricColumn::SnowDepth => &mut record.snow_depth_mm,
        MetricColumn::AvgWindSpeed => &mut record.avg_wind_speed_kmh,
        MetricColumn::AvgWindDirection => &mut record.avg_wind_dir_deg,
        MetricColumn::PeakWindGust => &mut record.peak_wind_gust_kmh,
        MetricColumn::AvgSeaLevelPressure => &mut record.avg_sea_level_pres_hpa,
        MetricColumn::SunshineTotal => &mut record.sunshine_total_min,
    }
}
