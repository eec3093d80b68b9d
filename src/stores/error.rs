use crate::records::RecordError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Required data file '{0}' not found")]
    MissingFile(PathBuf),

    #[error("Failed to read CSV file '{0}'")]
    CsvRead(PathBuf, #[source] PolarsError),

    #[error("Failed to scan parquet file '{0}'")]
    ParquetScan(PathBuf, #[source] PolarsError),

    #[error("Reference data in '{0}' is malformed")]
    ReferenceData(PathBuf, #[source] RecordError),

    // Errors while executing a weather query against a columnar frame
    #[error("Frame query failed: {query}")]
    FrameQuery {
        query: String,
        #[source]
        source: PolarsError,
    },

    #[error("Failed to connect to database '{0}'")]
    Connect(PathBuf, #[source] sqlx::Error),

    #[error("SQL query failed: {query}")]
    SqlQuery {
        query: String,
        #[source]
        source: sqlx::Error,
    },

    #[error(transparent)]
    Record(#[from] RecordError),

    // Covers errors joining tokio blocking tasks
    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
