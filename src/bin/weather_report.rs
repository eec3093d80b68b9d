use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use log::warn;
use std::path::{Path, PathBuf};
use weather_dashboard::{
    export_records, export_seasonal_statistics, ColumnarStore, DashboardError, DataPaths,
    DatasetBounds, FilterSpec, MetricColumn, RecordColumn, ReferenceStore, Season, SqliteStore,
    WeatherDashboard, WeatherStore, ROW_CAP,
};

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// Read the parquet and CSV files directly
    Parquet,
    /// Read the database written by prepare-data
    Sqlite,
}

/// Filter the daily weather dataset and print metrics and seasonal statistics.
#[derive(Parser)]
#[command(name = "weather-report")]
struct Cli {
    #[arg(long, value_enum, default_value = "parquet")]
    backend: Backend,

    /// Directory holding the input files (defaults to the user data directory)
    #[arg(long, env = "WEATHER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Database file (defaults to db.sqlite in the data directory)
    #[arg(long, env = "WEATHER_DATABASE")]
    database: Option<PathBuf>,

    /// Country to include, repeatable. Ignored when cities are given
    #[arg(long = "country")]
    countries: Vec<String>,

    /// City to include, repeatable
    #[arg(long = "city")]
    cities: Vec<String>,

    /// Season to include, repeatable
    #[arg(long = "season")]
    seasons: Vec<Season>,

    /// First date, YYYY-MM-DD
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date, YYYY-MM-DD
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Query the whole dataset span instead of the default range, and accept explicit
    /// dates before the timeline start
    #[arg(long)]
    all_dates: bool,

    /// Maximum number of records per query
    #[arg(long, env = "WEATHER_ROW_CAP", default_value_t = ROW_CAP)]
    row_cap: usize,

    /// Comma-separated columns to export
    #[arg(long, value_delimiter = ',')]
    columns: Vec<RecordColumn>,

    /// Write the records to this .xlsx file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Write the seasonal statistics to this .xlsx file
    #[arg(long)]
    seasonal_export: Option<PathBuf>,

    /// Print per-city values of a metric on this date
    #[arg(long)]
    map_date: Option<NaiveDate>,

    /// Metric for --map-date
    #[arg(long, default_value = "avg_temp_c")]
    map_metric: MetricColumn,
}

impl Cli {
    fn filter_spec(&self, bounds: &DatasetBounds) -> FilterSpec {
        let spec = FilterSpec::new()
            .with_countries(self.countries.iter().cloned())
            .with_cities(self.cities.iter().cloned())
            .with_seasons(self.seasons.iter().copied());
        match (self.start, self.end) {
            (None, None) if self.all_dates => spec.with_date_range(bounds.min, bounds.max),
            (None, None) => spec.with_date_range(bounds.default_start, bounds.default_end),
            (start, end) => FilterSpec {
                start_date: start.map(|d| bounds.clamp(d, self.all_dates)),
                end_date: end.map(|d| bounds.clamp(d, self.all_dates)),
                ..spec
            },
        }
    }

    fn data_paths(&self) -> Result<DataPaths, DashboardError> {
        let paths = match &self.data_dir {
            Some(dir) => DataPaths::new(dir),
            None => DataPaths::default_location().map_err(DashboardError::DataDirResolution)?,
        };
        Ok(match &self.database {
            Some(database) => paths.with_database(database),
            None => paths,
        })
    }
}

async fn run<S>(dashboard: WeatherDashboard<S>, cli: &Cli) -> Result<(), DashboardError>
where
    S: ReferenceStore + WeatherStore + Sync,
{
    let spec = cli.filter_spec(dashboard.bounds());
    let result = dashboard.weather(&spec).await?;
    let report = dashboard.report(&spec).await?;

    for notice in &report.notices {
        println!("! {}", notice);
    }
    println!("Records: {} (cap {})", report.summary.rows, report.summary.row_cap);
    if let Some(days) = spec.selected_days() {
        println!("Days selected: {}", days);
    }

    let key = &report.key_metrics;
    println!("Average temperature: {:.1} °C", key.avg_temp);
    println!("Median temperature: {:.1} °C", key.median_temp);
    println!("Precipitation days: {:.2} %", key.precip_day_ratio);
    println!("Average wind speed: {:.1} km/h", key.avg_wind_speed);

    let extra = &report.additional_metrics;
    println!(
        "Temperature range: {:.1} .. {:.1} °C",
        extra.range_temp.0, extra.range_temp.1
    );
    println!("Extreme temperature difference: {:.1} °C", extra.extreme_temp_diff);
    println!("Average precipitation: {:.2} mm", extra.avg_precip);
    println!("Rain days: {}, snow days: {}", extra.rain_days, extra.snow_days);
    match extra.wind_direction_mode {
        Some(sector) => println!("Prevailing wind: {}", sector),
        None => println!("Prevailing wind: no data"),
    }
    println!("Maximum wind gust: {:.1} km/h", extra.max_wind_gust);
    println!(
        "Temperature/precipitation correlation: {:.2}",
        extra.temp_precip_corr
    );
    println!("{}", report.seasonal.to_frame()?);

    if let Some(path) = &cli.export {
        let columns = if cli.columns.is_empty() {
            RecordColumn::default_selection()
        } else {
            cli.columns.clone()
        };
        let bytes = export_records(&result.frame, &columns)?;
        write_file(path, &bytes).await?;
    }
    if let Some(path) = &cli.seasonal_export {
        let bytes = export_seasonal_statistics(&report.seasonal)?;
        write_file(path, &bytes).await?;
    }

    if let Some(date) = cli.map_date {
        match dashboard
            .map_points()
            .date(date)
            .metric(cli.map_metric)
            .call()
            .await
        {
            Ok(points) => {
                for point in points {
                    println!(
                        "{:<24} {:>8.3} {:>8.3} {:>10.2}",
                        point.city_name, point.latitude, point.longitude, point.value
                    );
                }
            }
            Err(e) => warn!("Could not load map data for {}: {}", date, e),
        }
    }
    Ok(())
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), DashboardError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| DashboardError::Output(path.to_path_buf(), e))?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), DashboardError> {
    env_logger::init();
    let cli = Cli::parse();
    let paths = cli.data_paths()?;

    match cli.backend {
        Backend::Parquet => {
            let store = ColumnarStore::open(&paths).await?;
            let dashboard = WeatherDashboard::builder()
                .store(store)
                .row_cap(cli.row_cap)
                .build();
            run(dashboard, &cli).await
        }
        Backend::Sqlite => {
            let store = SqliteStore::connect(paths.database()).await?;
            let dashboard = WeatherDashboard::builder()
                .store(store)
                .row_cap(cli.row_cap)
                .build();
            run(dashboard, &cli).await
        }
    }
}
