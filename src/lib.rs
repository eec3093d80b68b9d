mod cache;
mod capper;
mod config;
mod dashboard;
mod error;
mod export;
mod filtering;
mod metrics;
mod prepare;
mod records;
mod report;
mod resolver;
mod stores;
mod types;
mod utils;

pub use error::DashboardError;
pub use dashboard::WeatherDashboard;

pub use cache::{CacheKeyError, QueryCache};
pub use capper::{fetch_capped, ResultSet, ResultSummary};
pub use config::*;
pub use filtering::{CitySelection, RecordPredicate, WeatherFrameFilterExt};
pub use resolver::FilterResolver;
pub use report::{DashboardReport, MapPoint, Notice};

pub use metrics::*;

pub use export::{export_records, export_seasonal_statistics, import_records, ExportError};
pub use prepare::{check_files_exist, prepare_data, PrepareError, PrepareSummary};
pub use records::{frame_to_records, metric_value, records_to_frame, RecordError};

pub use stores::{ColumnarStore, ReferenceStore, SqliteStore, StoreError, WeatherStore};

pub use types::filter_spec::FilterSpec;
pub use types::metric::{MetricColumn, RecordColumn, UnknownColumnError, MAIN_METRICS};
pub use types::reference::{City, Country};
pub use types::season::{ParseSeasonError, Season};
pub use types::weather_record::WeatherRecord;

pub use utils::{ensure_dir_exists, get_data_dir};
