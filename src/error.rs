use crate::cache::CacheKeyError;
use crate::export::ExportError;
use crate::metrics::MetricsError;
use crate::prepare::PrepareError;
use crate::records::RecordError;
use crate::stores::StoreError;
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Prepare(#[from] PrepareError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    CacheKey(#[from] CacheKeyError),

    #[error("Incomplete date range (start: {start:?}, end: {end:?}), select both dates")]
    IncompleteDateRange {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },

    #[error("Start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Failed to write '{0}'")]
    Output(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine data directory")]
    DataDirResolution(#[source] std::io::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
