//! Weather data ingester.
//!
//! One subcommand per source: each run fetches the upstream data once,
//! writes it to Redis and exits. Scheduling is left to the caller.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use weather_common::CountryId;

use config::{Config, DatabaseMode};

#[derive(Parser, Debug)]
#[command(name = "ingester")]
#[command(about = "Ingest DWD, ARSO and MeteoAlarm data into Redis", version)]
struct Args {
    /// Configuration file path
    #[arg(long, global = true, env = "WEATHER_INGEST_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Database to write to, overriding the config file
    #[arg(long, global = true, env = "WEATHER_INGEST_DATABASE", value_enum)]
    database: Option<DatabaseMode>,

    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the effective configuration
    Config {
        /// Write a default configuration file instead
        #[arg(long)]
        generate: bool,
    },

    /// Store a country's local station list and drop stations not in it
    StationsStore {
        /// `de` or `si`
        country: CountryId,
    },

    /// Regenerate the DWD station catalogue from the latest MOSMIX bundle
    DwdStations {
        /// Catalogue of curated stations (default from config)
        output: Option<PathBuf>,
        /// Stations awaiting curation (default from config)
        output_new: Option<PathBuf>,
        /// Read the local MOSMIX bundle instead of downloading it
        #[arg(long)]
        local_source: bool,
    },

    /// Ingest MOSMIX point forecasts
    DwdMosmix {
        #[arg(long)]
        local_source: bool,
        /// Take the station allow-list from the local catalogue
        #[arg(long)]
        local_stations: bool,
        /// Stop after the first record
        #[arg(long)]
        test_mode: bool,
    },

    /// Ingest current DWD station observations
    DwdCurrent {
        #[arg(long)]
        local_stations: bool,
        /// Stop after the first station
        #[arg(long)]
        test_mode: bool,
    },

    /// Ingest ARSO nowcast and forecast snapshots
    ArsoWeather {
        #[arg(long)]
        local_stations: bool,
    },

    /// Ingest ARSO nowcast map references
    ArsoMaps,

    /// Update MeteoAlarm warnings
    AlertsGet {
        country: CountryId,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if let Command::Config { generate: true } = args.command {
        Config::generate(&args.config)?;
        println!("Wrote default configuration to {}", args.config.display());
        return Ok(());
    }

    let mut config = Config::load(&args.config)?;
    if let Some(mode) = args.database {
        config.mode = mode;
    }

    init_tracing(&config, args.debug)?;
    info!(
        config = %args.config.display(),
        mode = %config.mode,
        command = ?args.command,
        "Starting weather ingester"
    );

    let runner = commands::Runner::new(config)?;
    match args.command {
        Command::Config { .. } => print!("{}", runner.config().to_yaml()?),
        Command::StationsStore { country } => runner.stations_store(country).await?,
        Command::DwdStations {
            output,
            output_new,
            local_source,
        } => runner.dwd_stations(output, output_new, local_source).await?,
        Command::DwdMosmix {
            local_source,
            local_stations,
            test_mode,
        } => runner.dwd_mosmix(local_source, local_stations, test_mode).await?,
        Command::DwdCurrent {
            local_stations,
            test_mode,
        } => runner.dwd_current(local_stations, test_mode).await?,
        Command::ArsoWeather { local_stations } => runner.arso_weather(local_stations).await?,
        Command::ArsoMaps => runner.arso_maps().await?,
        Command::AlertsGet { country } => runner.alerts_get(country).await?,
    }

    Ok(())
}

fn init_tracing(config: &Config, debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { config.logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    let installed = if config.logging.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to install tracing subscriber")
}
