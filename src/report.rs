use crate::capper::ResultSummary;
use crate::metrics::{AdditionalMetrics, KeyMetrics, SeasonalStatistics};
use crate::types::metric::MetricColumn;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// A non-fatal condition the user should be told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Notice {
    /// The filters matched no record.
    NoData,
    /// More records matched than the row cap, only the first `cap` were kept.
    Truncated { cap: usize },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NoData => write!(f, "No data for the selected filters."),
            Notice::Truncated { cap } => write!(
                f,
                "The selection matched more than {} records, only the first {} are shown. \
                 Narrow the filters to see all data.",
                cap, cap
            ),
        }
    }
}

/// Everything the dashboard shows for one filter selection, apart from the raw rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub summary: ResultSummary,
    pub key_metrics: KeyMetrics,
    pub additional_metrics: AdditionalMetrics,
    pub seasonal: SeasonalStatistics,
    pub notices: Vec<Notice>,
}

impl DashboardReport {
    pub fn has_data(&self) -> bool {
        self.summary.rows > 0
    }
}

/// One city on the map: the mean of a metric on a single date at the city's location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub city_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub date: NaiveDate,
    pub metric: MetricColumn,
    pub value: f64,
}
