use clap::Parser;
use std::path::PathBuf;
use weather_dashboard::{prepare_data, DashboardError, DataPaths};

/// Load countries.csv, cities.csv and daily_weather.parquet into the SQLite database.
#[derive(Parser)]
#[command(name = "prepare-data")]
struct Cli {
    /// Directory holding the input files (defaults to the user data directory)
    #[arg(long, env = "WEATHER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Database file to write (defaults to db.sqlite in the data directory)
    #[arg(long, env = "WEATHER_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), DashboardError> {
    env_logger::init();
    let cli = Cli::parse();

    let mut paths = match cli.data_dir {
        Some(dir) => DataPaths::new(dir),
        None => DataPaths::default_location().map_err(DashboardError::DataDirResolution)?,
    };
    if let Some(database) = cli.database {
        paths = paths.with_database(database);
    }

    let summary = prepare_data(&paths).await?;
    println!(
        "Wrote {} countries, {} cities and {} weather records ({} chunks) to {}",
        summary.countries,
        summary.cities,
        summary.weather_records,
        summary.chunks,
        paths.database().display()
    );
    Ok(())
}
