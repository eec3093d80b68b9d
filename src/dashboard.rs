//! The entry point of the crate: one [`WeatherDashboard`] answers every query the
//! dashboard makes, over any store implementing both [`ReferenceStore`] and
//! [`WeatherStore`].

use crate::cache::QueryCache;
use crate::capper::{fetch_capped, ResultSet};
use crate::config::{DatasetBounds, ROW_CAP};
use crate::error::DashboardError;
use crate::metrics::{seasonal_statistics, AdditionalMetrics, KeyMetrics};
use crate::report::{DashboardReport, MapPoint, Notice};
use crate::resolver::FilterResolver;
use crate::stores::{ReferenceStore, WeatherStore};
use crate::types::filter_spec::FilterSpec;
use crate::types::metric::{MetricColumn, MAIN_METRICS};
use crate::types::reference::{City, Country};
use bon::bon;
use chrono::NaiveDate;
use log::{info, warn};
use polars::prelude::DataFrame;
use std::collections::{BTreeMap, BTreeSet};
use tokio::task;

/// Filtered, capped and cached access to the weather dataset.
///
/// Every result is memoized by its arguments for the lifetime of the dashboard, so
/// repeating a query with an unchanged [`FilterSpec`] never reaches the store twice.
///
/// # Examples
///
/// ```rust
/// # use weather_dashboard::{ColumnarStore, DashboardError, FilterSpec, WeatherDashboard};
/// # use weather_dashboard::DataPaths;
/// # async fn run() -> Result<(), DashboardError> {
/// let store = ColumnarStore::open(&DataPaths::new("data")).await?;
/// let dashboard = WeatherDashboard::builder().store(store).build();
///
/// let report = dashboard
///     .report(&FilterSpec::new().with_countries(["Russia"]))
///     .await?;
/// for notice in &report.notices {
///     println!("{}", notice);
/// }
/// # Ok(())
/// # }
/// ```
pub struct WeatherDashboard<S> {
    store: S,
    row_cap: usize,
    bounds: DatasetBounds,
    countries: QueryCache<Vec<Country>>,
    cities: QueryCache<Vec<City>>,
    weather: QueryCache<ResultSet>,
    reports: QueryCache<DashboardReport>,
    map_points: QueryCache<Vec<MapPoint>>,
}

#[bon]
impl<S> WeatherDashboard<S>
where
    S: ReferenceStore + WeatherStore + Sync,
{
    /// Creates a dashboard over `store`.
    ///
    /// * `.row_cap(usize)`: Optional. Maximum records per weather query, defaults to
    ///   [`ROW_CAP`].
    /// * `.bounds(DatasetBounds)`: Optional. Date span of the dataset, defaults to
    ///   [`DatasetBounds::default`].
    #[builder]
    pub fn new(store: S, row_cap: Option<usize>, bounds: Option<DatasetBounds>) -> Self {
        Self {
            store,
            row_cap: row_cap.unwrap_or(ROW_CAP),
            bounds: bounds.unwrap_or_default(),
            countries: QueryCache::new("countries"),
            cities: QueryCache::new("cities"),
            weather: QueryCache::new("weather"),
            reports: QueryCache::new("report"),
            map_points: QueryCache::new("map"),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn row_cap(&self) -> usize {
        self.row_cap
    }

    pub fn bounds(&self) -> &DatasetBounds {
        &self.bounds
    }

    /// All countries. Never capped.
    pub async fn countries(&self) -> Result<Vec<Country>, DashboardError> {
        self.countries
            .get_or_try_load(&(), || async {
                Ok::<_, DashboardError>(self.store.get_countries().await?)
            })
            .await
    }

    /// Cities of the given countries, or all cities for an empty set. Never capped.
    pub async fn cities(&self, countries: &BTreeSet<String>) -> Result<Vec<City>, DashboardError> {
        self.cities
            .get_or_try_load(countries, || async {
                Ok::<_, DashboardError>(self.store.get_cities(Some(countries)).await?)
            })
            .await
    }

    /// The records matching `spec`, capped at the configured row cap.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::IncompleteDateRange`] if only one of the two dates is
    /// set and [`DashboardError::InvalidDateRange`] if the start is after the end. No
    /// query is made in either case.
    pub async fn weather(&self, spec: &FilterSpec) -> Result<ResultSet, DashboardError> {
        validate_date_range(spec)?;
        self.weather
            .get_or_try_load(&(spec, self.row_cap), || async {
                let predicate = FilterResolver::new(&self.store).resolve(spec).await?;
                Ok::<_, DashboardError>(fetch_capped(&self.store, &predicate, self.row_cap).await?)
            })
            .await
    }

    /// Key metrics, additional metrics and seasonal statistics of the records matching
    /// `spec`, with the notices to show alongside them.
    pub async fn report(&self, spec: &FilterSpec) -> Result<DashboardReport, DashboardError> {
        let result = self.weather(spec).await?;
        self.reports
            .get_or_try_load(&(spec, self.row_cap), || async {
                let report = task::spawn_blocking(move || build_report(&result)).await??;
                Ok::<_, DashboardError>(report)
            })
            .await
    }

    /// Mean of `metric` per city on `date`, located at the city's coordinates.
    ///
    /// * `.date(NaiveDate)`: **Required.**
    /// * `.metric(MetricColumn)`: Optional. Defaults to [`MetricColumn::AvgTemp`].
    ///
    /// Cities without a value on that date, or without coordinates, are left out.
    #[builder]
    pub async fn map_points(
        &self,
        date: NaiveDate,
        metric: Option<MetricColumn>,
    ) -> Result<Vec<MapPoint>, DashboardError> {
        let metric = metric.unwrap_or(MetricColumn::AvgTemp);
        let cities = self.cities(&BTreeSet::new()).await?;
        self.map_points
            .get_or_try_load(&(date, metric), || async {
                let pairs = self.store.get_weather_for_single_date(date, metric).await?;
                Ok::<_, DashboardError>(join_map_points(date, metric, pairs, &cities))
            })
            .await
    }
}

fn validate_date_range(spec: &FilterSpec) -> Result<(), DashboardError> {
    match (spec.start_date, spec.end_date) {
        (Some(start), Some(end)) if start > end => {
            Err(DashboardError::InvalidDateRange { start, end })
        }
        (Some(_), None) | (None, Some(_)) => {
            warn!("Refusing to query with an incomplete date range");
            Err(DashboardError::IncompleteDateRange {
                start: spec.start_date,
                end: spec.end_date,
            })
        }
        _ => Ok(()),
    }
}

fn build_report(result: &ResultSet) -> Result<DashboardReport, DashboardError> {
    let frame: &DataFrame = &result.frame;
    let mut notices = Vec::new();
    if result.is_empty() {
        notices.push(Notice::NoData);
    }
    if result.truncated {
        notices.push(Notice::Truncated {
            cap: result.row_cap,
        });
    }

    let report = DashboardReport {
        summary: result.summary(),
        key_metrics: KeyMetrics::compute(frame)?,
        additional_metrics: AdditionalMetrics::compute(frame)?,
        seasonal: seasonal_statistics(&MAIN_METRICS, frame)?,
        notices,
    };
    info!("Built report over {} records", report.summary.rows);
    Ok(report)
}

fn join_map_points(
    date: NaiveDate,
    metric: MetricColumn,
    pairs: Vec<(String, Option<f64>)>,
    cities: &[City],
) -> Vec<MapPoint> {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for (city, value) in pairs {
        if let Some(value) = value {
            let entry = sums.entry(city).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }

    let locations: BTreeMap<&str, &City> = cities.iter().map(|c| (c.name.as_str(), c)).collect();
    sums.into_iter()
        .filter_map(|(name, (sum, count))| {
            let city = locations.get(name.as_str())?;
            Some(MapPoint {
                latitude: city.latitude,
                longitude: city.longitude,
                city_name: name,
                date,
                metric,
                value: sum / count as f64,
            })
        })
        .collect()
}
