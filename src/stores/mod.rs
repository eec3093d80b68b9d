//! Read access to the reference data (countries, cities) and to the weather records.
//!
//! Two adapters implement both traits: [`ColumnarStore`] over the parquet/CSV files and
//! [`SqliteStore`] over the database produced by [`crate::prepare_data`]. The rest of the
//! crate only talks to the traits.

pub mod columnar;
pub mod error;
pub mod sqlite;

pub use columnar::ColumnarStore;
pub use error::StoreError;
pub use sqlite::SqliteStore;

use crate::filtering::RecordPredicate;
use crate::types::metric::MetricColumn;
use crate::types::reference::{City, Country};
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use std::collections::BTreeSet;
use std::future::Future;

/// Static country and city lookups. Never capped.
pub trait ReferenceStore {
    /// All countries, without duplicates.
    fn get_countries(&self) -> impl Future<Output = Result<Vec<Country>, StoreError>> + Send;

    /// Cities of the given countries. `None` or an empty set returns every city.
    fn get_cities(
        &self,
        countries: Option<&BTreeSet<String>>,
    ) -> impl Future<Output = Result<Vec<City>, StoreError>> + Send;
}

/// Filtered reads of the weather fact table.
pub trait WeatherStore {
    /// Returns at most `row_limit` records matching `predicate`, as a frame with the
    /// weather schema. Both the predicate and the limit are pushed into the read, so
    /// the full table is never materialized.
    fn get_weather(
        &self,
        predicate: &RecordPredicate,
        row_limit: usize,
    ) -> impl Future<Output = Result<DataFrame, StoreError>> + Send;

    /// `(city_name, value)` pairs of one metric on one date, for map rendering.
    fn get_weather_for_single_date(
        &self,
        date: NaiveDate,
        metric: MetricColumn,
    ) -> impl Future<Output = Result<Vec<(String, Option<f64>)>, StoreError>> + Send;
}
