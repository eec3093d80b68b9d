//! Scalar and seasonal statistics over a weather result frame.
//!
//! Every function accepts an empty frame, or a frame whose column is entirely missing,
//! and returns a neutral value (`0.0`, `0` or `None`) in that case. Missing values, and
//! NaN, are skipped by every aggregate.

use crate::records::{get_f64_column, get_str_column, RecordError};
use crate::types::metric::{MetricColumn, COL_SEASON};
use crate::types::season::Season;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error(transparent)]
    Column(#[from] RecordError),

    #[error("Failed to aggregate seasonal statistics")]
    Aggregation(#[source] PolarsError),
}

/// The metric column with NaN turned into missing values.
fn values(df: &DataFrame, metric: MetricColumn) -> Result<Float64Chunked, MetricsError> {
    Ok(get_f64_column(df, metric.column_name())?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

fn count_positive(df: &DataFrame, metric: MetricColumn) -> Result<usize, MetricsError> {
    Ok(values(df, metric)?
        .into_iter()
        .filter(|v| v.is_some_and(|x| x > 0.0))
        .count())
}

/// Mean of `avg_temp_c`.
pub fn avg_temp(df: &DataFrame) -> Result<f64, MetricsError> {
    Ok(values(df, MetricColumn::AvgTemp)?.mean().unwrap_or(0.0))
}

/// Median of `avg_temp_c`.
pub fn median_temp(df: &DataFrame) -> Result<f64, MetricsError> {
    Ok(values(df, MetricColumn::AvgTemp)?.median().unwrap_or(0.0))
}

/// Percentage (0-100) of rows with precipitation or snow cover.
pub fn precip_day_ratio(df: &DataFrame) -> Result<f64, MetricsError> {
    if df.height() == 0 {
        return Ok(0.0);
    }
    let precipitation = values(df, MetricColumn::Precipitation)?;
    let snow = values(df, MetricColumn::SnowDepth)?;
    let wet_days = precipitation
        .into_iter()
        .zip(snow.into_iter())
        .filter(|(p, s)| p.is_some_and(|x| x > 0.0) || s.is_some_and(|x| x > 0.0))
        .count();
    Ok(wet_days as f64 / df.height() as f64 * 100.0)
}

/// Mean of `avg_wind_speed_kmh`.
pub fn avg_wind_speed(df: &DataFrame) -> Result<f64, MetricsError> {
    Ok(values(df, MetricColumn::AvgWindSpeed)?.mean().unwrap_or(0.0))
}

/// `(min, max)` of the daily average temperature.
pub fn range_temp(df: &DataFrame) -> Result<(f64, f64), MetricsError> {
    let temps = values(df, MetricColumn::AvgTemp)?;
    match (temps.min(), temps.max()) {
        (Some(min), Some(max)) => Ok((min, max)),
        _ => Ok((0.0, 0.0)),
    }
}

/// Highest daily maximum minus lowest daily minimum.
pub fn extreme_temp_diff(df: &DataFrame) -> Result<f64, MetricsError> {
    let highest = values(df, MetricColumn::MaxTemp)?.max();
    let lowest = values(df, MetricColumn::MinTemp)?.min();
    match (highest, lowest) {
        (Some(high), Some(low)) => Ok(high - low),
        _ => Ok(0.0),
    }
}

/// Mean of `precipitation_mm`.
pub fn avg_precip(df: &DataFrame) -> Result<f64, MetricsError> {
    Ok(values(df, MetricColumn::Precipitation)?.mean().unwrap_or(0.0))
}

/// Rows with `precipitation_mm > 0`.
pub fn rain_days(df: &DataFrame) -> Result<usize, MetricsError> {
    count_positive(df, MetricColumn::Precipitation)
}

/// Rows with `snow_depth_mm > 0`.
pub fn snow_days(df: &DataFrame) -> Result<usize, MetricsError> {
    count_positive(df, MetricColumn::SnowDepth)
}

/// Maximum of `peak_wind_gust_kmh`.
pub fn max_wind_gust(df: &DataFrame) -> Result<f64, MetricsError> {
    Ok(values(df, MetricColumn::PeakWindGust)?.max().unwrap_or(0.0))
}

/// Pearson correlation between `avg_temp_c` and `precipitation_mm`, over the rows where
/// both are present.
///
/// Returns `0.0` with fewer than two such rows or when either column is constant.
pub fn temp_precip_corr(df: &DataFrame) -> Result<f64, MetricsError> {
    let temps = values(df, MetricColumn::AvgTemp)?;
    let precipitation = values(df, MetricColumn::Precipitation)?;
    let pairs: Vec<(f64, f64)> = temps
        .into_iter()
        .zip(precipitation.into_iter())
        .filter_map(|(t, p)| Some((t?, p?)))
        .collect();
    Ok(pearson(&pairs))
}

fn pearson(pairs: &[(f64, f64)]) -> f64 {
    if pairs.len() < 2 {
        return 0.0;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

/// One of the eight 45° wind sectors, starting at north and going clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompassSector {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl CompassSector {
    pub const ALL: [CompassSector; 8] = [
        CompassSector::North,
        CompassSector::NorthEast,
        CompassSector::East,
        CompassSector::SouthEast,
        CompassSector::South,
        CompassSector::SouthWest,
        CompassSector::West,
        CompassSector::NorthWest,
    ];

    /// The sector of a direction in degrees.
    ///
    /// Sectors are the bins `[0, 45], (45, 90], ..., (315, 360]`: the first one includes
    /// both ends, the others only their upper end. Directions outside `0..=360` (and NaN)
    /// have no sector.
    pub fn from_degrees(degrees: f64) -> Option<Self> {
        if !(0.0..=360.0).contains(&degrees) {
            return None;
        }
        let index = if degrees <= 45.0 {
            0
        } else {
            ((degrees / 45.0).ceil() as usize - 1).min(7)
        };
        Some(Self::ALL[index])
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompassSector::North => "N",
            CompassSector::NorthEast => "NE",
            CompassSector::East => "E",
            CompassSector::SouthEast => "SE",
            CompassSector::South => "S",
            CompassSector::SouthWest => "SW",
            CompassSector::West => "W",
            CompassSector::NorthWest => "NW",
        }
    }
}

impl fmt::Display for CompassSector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The most frequent wind sector of `avg_wind_dir_deg`.
///
/// Ties go to the sector that comes first clockwise from north. `None` when no row has a
/// direction.
pub fn wind_direction_mode(df: &DataFrame) -> Result<Option<CompassSector>, MetricsError> {
    let mut counts = [0usize; 8];
    for sector in values(df, MetricColumn::AvgWindDirection)?
        .into_iter()
        .flatten()
        .filter_map(CompassSector::from_degrees)
    {
        counts[sector as usize] += 1;
    }

    let mut best: Option<(usize, usize)> = None;
    for (index, &count) in counts.iter().enumerate() {
        if count > best.map_or(0, |(_, most)| most) {
            best = Some((index, count));
        }
    }
    Ok(best.map(|(index, _)| CompassSector::ALL[index]))
}

/// The headline figures of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyMetrics {
    pub avg_temp: f64,
    pub median_temp: f64,
    pub precip_day_ratio: f64,
    pub avg_wind_speed: f64,
}

impl KeyMetrics {
    pub fn compute(df: &DataFrame) -> Result<Self, MetricsError> {
        Ok(Self {
            avg_temp: avg_temp(df)?,
            median_temp: median_temp(df)?,
            precip_day_ratio: precip_day_ratio(df)?,
            avg_wind_speed: avg_wind_speed(df)?,
        })
    }
}

/// The secondary figures shown below the key metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdditionalMetrics {
    pub range_temp: (f64, f64),
    pub extreme_temp_diff: f64,
    pub avg_precip: f64,
    pub rain_days: usize,
    pub snow_days: usize,
    pub wind_direction_mode: Option<CompassSector>,
    pub max_wind_gust: f64,
    pub temp_precip_corr: f64,
}

impl AdditionalMetrics {
    pub fn compute(df: &DataFrame) -> Result<Self, MetricsError> {
        Ok(Self {
            range_temp: range_temp(df)?,
            extreme_temp_diff: extreme_temp_diff(df)?,
            avg_precip: avg_precip(df)?,
            rain_days: rain_days(df)?,
            snow_days: snow_days(df)?,
            wind_direction_mode: wind_direction_mode(df)?,
            max_wind_gust: max_wind_gust(df)?,
            temp_precip_corr: temp_precip_corr(df)?,
        })
    }
}

/// The aggregates of the seasonal statistics table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statistic {
    Mean,
    Median,
    Min,
    Max,
}

impl Statistic {
    pub const ALL: [Statistic; 4] = [
        Statistic::Mean,
        Statistic::Median,
        Statistic::Min,
        Statistic::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Median => "median",
            Statistic::Min => "min",
            Statistic::Max => "max",
        }
    }

    fn expr(&self, column: &str) -> Expr {
        let c = col(column).fill_nan(lit(NULL));
        match self {
            Statistic::Mean => c.mean(),
            Statistic::Median => c.median(),
            Statistic::Min => c.min(),
            Statistic::Max => c.max(),
        }
    }
}

fn stat_column_name(metric: MetricColumn, statistic: Statistic) -> String {
    format!("{}_{}", metric.column_name(), statistic.as_str())
}

/// One row of [`SeasonalStatistics`]: the values of every (metric, statistic) pair,
/// metric-major in the table's metric order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalRow {
    pub season: Season,
    pub values: Vec<Option<f64>>,
}

/// A season × (metric × statistic) table.
///
/// Always holds exactly four rows in canonical season order. Seasons without data have
/// a row of `None`s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalStatistics {
    metrics: Vec<MetricColumn>,
    rows: Vec<SeasonalRow>,
}

impl SeasonalStatistics {
    pub fn metrics(&self) -> &[MetricColumn] {
        &self.metrics
    }

    pub fn rows(&self) -> &[SeasonalRow] {
        &self.rows
    }

    pub fn get(&self, season: Season, metric: MetricColumn, statistic: Statistic) -> Option<f64> {
        let metric_index = self.metrics.iter().position(|m| *m == metric)?;
        let stat_index = Statistic::ALL.iter().position(|s| *s == statistic)?;
        let row = self.rows.iter().find(|r| r.season == season)?;
        row.values
            .get(metric_index * Statistic::ALL.len() + stat_index)
            .copied()
            .flatten()
    }

    /// The table as a flat frame: a `season` column followed by one
    /// `<metric>_<statistic>` column per pair.
    pub fn to_frame(&self) -> Result<DataFrame, MetricsError> {
        let seasons: Vec<&str> = self.rows.iter().map(|r| r.season.as_str()).collect();
        let mut columns = vec![Column::new(COL_SEASON.into(), seasons)];
        let mut index = 0;
        for &metric in &self.metrics {
            for statistic in Statistic::ALL {
                let values: Vec<Option<f64>> = self.rows.iter().map(|r| r.values[index]).collect();
                columns.push(Column::new(
                    stat_column_name(metric, statistic).into(),
                    values,
                ));
                index += 1;
            }
        }
        DataFrame::new(columns).map_err(MetricsError::Aggregation)
    }
}

/// Groups `df` by season and computes mean, median, min and max of each metric.
///
/// A metric listed more than once gets a single set of columns, at its first position.
pub fn seasonal_statistics(
    metrics: &[MetricColumn],
    df: &DataFrame,
) -> Result<SeasonalStatistics, MetricsError> {
    // Repeated metrics would produce clashing column names.
    let mut seen = HashSet::new();
    let metrics: Vec<MetricColumn> = metrics.iter().copied().filter(|m| seen.insert(*m)).collect();

    let aggregations: Vec<Expr> = metrics
        .iter()
        .flat_map(|&metric| {
            Statistic::ALL.into_iter().map(move |statistic| {
                statistic
                    .expr(metric.column_name())
                    .alias(stat_column_name(metric, statistic))
            })
        })
        .collect();

    let grouped = df
        .clone()
        .lazy()
        .group_by([col(COL_SEASON)])
        .agg(aggregations)
        .collect()
        .map_err(MetricsError::Aggregation)?;

    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (row, label) in get_str_column(&grouped, COL_SEASON)?.into_iter().enumerate() {
        if let Some(label) = label {
            positions.insert(label, row);
        }
    }

    let stat_columns = metrics
        .iter()
        .flat_map(|&metric| Statistic::ALL.map(|statistic| stat_column_name(metric, statistic)))
        .map(|name| get_f64_column(&grouped, &name))
        .collect::<Result<Vec<_>, _>>()?;

    let rows = Season::CANONICAL
        .into_iter()
        .map(|season| {
            let values = match positions.get(season.as_str()) {
                Some(&row) => stat_columns.iter().map(|c| c.get(row)).collect(),
                None => vec![None; stat_columns.len()],
            };
            SeasonalRow { season, values }
        })
        .collect();

    Ok(SeasonalStatistics { metrics, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::records_to_frame;
    use crate::types::weather_record::WeatherRecord;
    use chrono::NaiveDate;

    fn record(day: u32, season: Season) -> WeatherRecord {
        WeatherRecord::new(
            NaiveDate::from_ymd_opt(2020, 1, day).unwrap(),
            "Saint Petersburg",
            season,
        )
    }

    fn saint_petersburg() -> DataFrame {
        let records: Vec<WeatherRecord> = [(-5.0, 1.0), (0.0, 0.0), (5.0, 2.0)]
            .into_iter()
            .enumerate()
            .map(|(i, (temp, precip))| {
                let mut r = record(i as u32 + 1, Season::Winter);
                r.avg_temp_c = Some(temp);
                r.precipitation_mm = Some(precip);
                r
            })
            .collect();
        records_to_frame(&records).unwrap()
    }

    fn with_directions(directions: &[Option<f64>]) -> DataFrame {
        let records: Vec<WeatherRecord> = directions
            .iter()
            .enumerate()
            .map(|(i, dir)| {
                let mut r = record(i as u32 + 1, Season::Winter);
                r.avg_wind_dir_deg = *dir;
                r
            })
            .collect();
        records_to_frame(&records).unwrap()
    }

    #[test]
    fn test_saint_petersburg_example() -> Result<(), MetricsError> {
        let df = saint_petersburg();
        assert_eq!(avg_temp(&df)?, 0.0);
        assert_eq!(median_temp(&df)?, 0.0);
        assert!((precip_day_ratio(&df)? - 66.67).abs() < 0.01);
        assert_eq!(rain_days(&df)?, 2);
        assert_eq!(snow_days(&df)?, 0);
        assert_eq!(range_temp(&df)?, (-5.0, 5.0));
        assert_eq!(avg_precip(&df)?, 1.0);
        Ok(())
    }

    #[test]
    fn test_snow_counts_as_wet_day() -> Result<(), MetricsError> {
        let mut dry = record(1, Season::Winter);
        dry.precipitation_mm = Some(0.0);
        dry.snow_depth_mm = Some(40.0);
        let mut missing = record(2, Season::Winter);
        missing.snow_depth_mm = Some(0.0);
        let df = records_to_frame(&[dry, missing]).unwrap();
        assert_eq!(precip_day_ratio(&df)?, 50.0);
        assert_eq!(rain_days(&df)?, 0);
        assert_eq!(snow_days(&df)?, 1);
        Ok(())
    }

    #[test]
    fn test_empty_set_is_neutral() -> Result<(), MetricsError> {
        let df = records_to_frame(&[]).unwrap();
        let key = KeyMetrics::compute(&df)?;
        assert_eq!(
            key,
            KeyMetrics {
                avg_temp: 0.0,
                median_temp: 0.0,
                precip_day_ratio: 0.0,
                avg_wind_speed: 0.0
            }
        );
        let extra = AdditionalMetrics::compute(&df)?;
        assert_eq!(extra.range_temp, (0.0, 0.0));
        assert_eq!(extra.extreme_temp_diff, 0.0);
        assert_eq!(extra.rain_days, 0);
        assert_eq!(extra.wind_direction_mode, None);
        assert_eq!(extra.max_wind_gust, 0.0);
        assert_eq!(extra.temp_precip_corr, 0.0);
        Ok(())
    }

    #[test]
    fn test_extreme_diff_uses_daily_extremes() -> Result<(), MetricsError> {
        let mut a = record(1, Season::Winter);
        a.avg_temp_c = Some(0.0);
        a.min_temp_c = Some(-12.0);
        a.max_temp_c = Some(3.0);
        let mut b = record(2, Season::Winter);
        b.avg_temp_c = Some(2.0);
        b.min_temp_c = Some(-1.0);
        b.max_temp_c = Some(8.0);
        let df = records_to_frame(&[a, b]).unwrap();
        assert_eq!(extreme_temp_diff(&df)?, 20.0);
        assert_eq!(range_temp(&df)?, (0.0, 2.0));
        Ok(())
    }

    #[test]
    fn test_compass_sector_bins() {
        assert_eq!(CompassSector::from_degrees(0.0), Some(CompassSector::North));
        assert_eq!(CompassSector::from_degrees(45.0), Some(CompassSector::North));
        assert_eq!(CompassSector::from_degrees(45.5), Some(CompassSector::NorthEast));
        assert_eq!(CompassSector::from_degrees(90.0), Some(CompassSector::NorthEast));
        assert_eq!(CompassSector::from_degrees(359.0), Some(CompassSector::NorthWest));
        assert_eq!(CompassSector::from_degrees(360.0), Some(CompassSector::NorthWest));
        assert_eq!(CompassSector::from_degrees(-1.0), None);
        assert_eq!(CompassSector::from_degrees(f64::NAN), None);
    }

    #[test]
    fn test_wind_mode_is_deterministic_and_stable() -> Result<(), MetricsError> {
        let df = with_directions(&[Some(200.0), Some(10.0), None, Some(190.0), Some(30.0)]);
        let first = wind_direction_mode(&df)?;
        assert_eq!(first, Some(CompassSector::North));
        for _ in 0..5 {
            assert_eq!(wind_direction_mode(&df)?, first);
        }

        let south_majority = with_directions(&[Some(200.0), Some(10.0), Some(190.0)]);
        assert_eq!(
            wind_direction_mode(&south_majority)?,
            Some(CompassSector::South)
        );

        let no_data = with_directions(&[None, None]);
        assert_eq!(wind_direction_mode(&no_data)?, None);
        Ok(())
    }

    #[test]
    fn test_correlation() -> Result<(), MetricsError> {
        let mut records = Vec::new();
        for (i, (t, p)) in [(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)].into_iter().enumerate() {
            let mut r = record(i as u32 + 1, Season::Summer);
            r.avg_temp_c = Some(t);
            r.precipitation_mm = Some(p);
            records.push(r);
        }
        let df = records_to_frame(&records).unwrap();
        assert!((temp_precip_corr(&df)? - 1.0).abs() < 1e-12);

        let constant = saint_petersburg()
            .lazy()
            .with_column(lit(1.0).alias("precipitation_mm"))
            .collect()
            .unwrap();
        assert_eq!(temp_precip_corr(&constant)?, 0.0);
        Ok(())
    }

    #[test]
    fn test_seasonal_statistics_has_canonical_rows() -> Result<(), MetricsError> {
        let mut summer = record(1, Season::Summer);
        summer.avg_temp_c = Some(20.0);
        let mut summer2 = record(2, Season::Summer);
        summer2.avg_temp_c = Some(24.0);
        let mut winter = record(3, Season::Winter);
        winter.avg_temp_c = Some(-4.0);
        let df = records_to_frame(&[summer, winter, summer2]).unwrap();

        let table = seasonal_statistics(&[MetricColumn::AvgTemp, MetricColumn::Precipitation], &df)?;
        let seasons: Vec<Season> = table.rows().iter().map(|r| r.season).collect();
        assert_eq!(seasons, Season::CANONICAL.to_vec());
        assert!(table.rows().iter().all(|r| r.values.len() == 8));

        assert_eq!(
            table.get(Season::Summer, MetricColumn::AvgTemp, Statistic::Mean),
            Some(22.0)
        );
        assert_eq!(
            table.get(Season::Summer, MetricColumn::AvgTemp, Statistic::Max),
            Some(24.0)
        );
        assert_eq!(
            table.get(Season::Winter, MetricColumn::AvgTemp, Statistic::Median),
            Some(-4.0)
        );
        assert_eq!(
            table.get(Season::Spring, MetricColumn::AvgTemp, Statistic::Mean),
            None
        );
        assert_eq!(
            table.get(Season::Summer, MetricColumn::Precipitation, Statistic::Min),
            None
        );

        let frame = table.to_frame()?;
        assert_eq!(frame.shape(), (4, 9));
        Ok(())
    }

    #[test]
    fn test_nan_is_treated_as_missing() -> Result<(), MetricsError> {
        let records: Vec<WeatherRecord> = [f64::NAN, 2.0]
            .into_iter()
            .enumerate()
            .map(|(i, temp)| {
                let mut r = record(i as u32 + 1, Season::Summer);
                r.avg_temp_c = Some(temp);
                r
            })
            .collect();
        let df = records_to_frame(&records).unwrap();

        assert_eq!(avg_temp(&df)?, 2.0);
        assert_eq!(median_temp(&df)?, 2.0);
        assert_eq!(range_temp(&df)?, (2.0, 2.0));

        let table = seasonal_statistics(&[MetricColumn::AvgTemp], &df)?;
        assert_eq!(
            table.get(Season::Summer, MetricColumn::AvgTemp, Statistic::Mean),
            Some(2.0)
        );
        Ok(())
    }

    #[test]
    fn test_repeated_metric_is_aggregated_once() -> Result<(), MetricsError> {
        let df = saint_petersburg();
        let table = seasonal_statistics(
            &[
                MetricColumn::AvgTemp,
                MetricColumn::Precipitation,
                MetricColumn::AvgTemp,
            ],
            &df,
        )?;
        assert_eq!(
            table.metrics(),
            &[MetricColumn::AvgTemp, MetricColumn::Precipitation]
        );
        assert_eq!(
            table.get(Season::Winter, MetricColumn::AvgTemp, Statistic::Mean),
            Some(0.0)
        );
        assert_eq!(table.to_frame()?.shape(), (4, 9));
        Ok(())
    }

    #[test]
    fn test_seasonal_statistics_on_empty_set() -> Result<(), MetricsError> {
        let df = records_to_frame(&[]).unwrap();
        let table = seasonal_statistics(&[MetricColumn::AvgTemp], &df)?;
        assert_eq!(table.rows().len(), 4);
        assert!(table
            .rows()
            .iter()
            .all(|r| r.values.iter().all(Option::is_none)));
        Ok(())
    }
}
