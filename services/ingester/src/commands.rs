//! Subcommand runners.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use forecast_parser::{KmzArchive, StationFilter, StationReader};
use ingestion::meteoalarm::{read_areas, update_alerts, AreaCatalogue};
use ingestion::{arso, dwd, HttpClient, StationSource};
use storage::RedisStore;
use tempfile::NamedTempFile;
use tracing::{info, warn};
use weather_common::CountryId;

use crate::config::Config;

pub struct Runner {
    config: Config,
    http: HttpClient,
}

impl Runner {
    pub fn new(config: Config) -> Result<Self> {
        let http = HttpClient::new(&config.http_options()).context("Failed to build HTTP client")?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn store(&self) -> Result<RedisStore> {
        let database = self.config.mode.database_index();
        RedisStore::connect(&self.config.redis.url, database)
            .await
            .with_context(|| format!("Failed to connect to Redis database {}", database))
    }

    /// Where the allow-list of `country` comes from.
    fn station_source(&self, country: CountryId, local: bool) -> StationSource {
        if local {
            return StationSource::Local(self.config.paths.stations(country).to_path_buf());
        }
        match &self.config.roster {
            Some(roster) if country == CountryId::Germany => StationSource::Roster {
                url: roster.url.clone(),
                api_key: roster.api_key.clone(),
            },
            _ => StationSource::Store,
        }
    }

    pub async fn stations_store(&self, country: CountryId) -> Result<()> {
        let path = self.config.paths.stations(country);
        let stations = ingestion::load_local_stations(country, path)
            .with_context(|| format!("Failed to read station list {}", path.display()))?;

        let store = self.store().await?;
        let summary = ingestion::store_stations(&store, country, &stations).await?;
        info!(country = %country, stored = summary.stored, removed = summary.removed, "Stations stored");
        Ok(())
    }

    pub async fn dwd_stations(
        &self,
        output: Option<PathBuf>,
        output_new: Option<PathBuf>,
        local_source: bool,
    ) -> Result<()> {
        let paths = &self.config.paths;
        let output = output.unwrap_or_else(|| paths.dwd_stations.clone());
        let output_new = output_new.unwrap_or_else(|| paths.dwd_stations_new.clone());

        let previous = match open_optional(&paths.dwd_stations)? {
            Some(file) => dwd::read_station_csv(file)?,
            None => Default::default(),
        };
        let lists = dwd::StationLists {
            with_reports: open_optional(&paths.dwd_reporting)?
                .map(dwd::read_id_list)
                .transpose()?,
            included: read_ids_or_empty(&paths.dwd_included)?,
            ignored: read_ids_or_empty(&paths.dwd_ignored)?,
        };

        let (_download, archive_path) = self.mosmix_archive(local_source).await?;
        let mut archive = KmzArchive::open(&archive_path)?;
        let mut reader = StationReader::new(archive.cursor()?);
        let catalogue = dwd::build_catalogue(&mut reader, &previous, &lists)?;

        write_catalogue(&output, &catalogue.known)?;
        write_catalogue(&output_new, &catalogue.new)?;
        info!(
            output = %output.display(),
            output_new = %output_new.display(),
            known = catalogue.known.len(),
            new = catalogue.new.len(),
            "Wrote DWD station catalogue"
        );
        Ok(())
    }

    pub async fn dwd_mosmix(&self, local_source: bool, local_stations: bool, test_mode: bool) -> Result<()> {
        let store = self.store().await?;
        let source = self.station_source(CountryId::Germany, local_stations);
        let ids = ingestion::station_ids(&source, &store, &self.http, CountryId::Germany, false).await?;
        if ids.is_empty() {
            warn!("No station allow-list, ingesting every station");
        }

        let (_download, archive_path) = self.mosmix_archive(local_source).await?;
        let mut archive = KmzArchive::open(&archive_path)?;
        let summary = dwd::ingest_mosmix(
            &store,
            &mut archive,
            StationFilter::from_ids(ids),
            Utc::now(),
            &self.config.pipeline_options(test_mode),
        )
        .await?;

        info!(records = summary.records, flushes = summary.flushes, "MOSMIX ingest finished");
        Ok(())
    }

    pub async fn dwd_current(&self, local_stations: bool, test_mode: bool) -> Result<()> {
        let store = self.store().await?;
        let source = self.station_source(CountryId::Germany, local_stations);
        let ids = ingestion::station_ids(&source, &store, &self.http, CountryId::Germany, true).await?;

        let summary = dwd::ingest_current(
            &store,
            &self.http,
            &ids,
            Utc::now(),
            &self.config.pipeline_options(test_mode),
        )
        .await?;

        info!(stations = ids.len(), records = summary.records, "Current observations ingest finished");
        Ok(())
    }

    pub async fn arso_weather(&self, local_stations: bool) -> Result<()> {
        let store = self.store().await?;
        let source = self.station_source(CountryId::Slovenia, local_stations);
        let ids = ingestion::station_ids(&source, &store, &self.http, CountryId::Slovenia, false).await?;

        let summary = arso::ingest_weather(
            &store,
            &self.http,
            &StationFilter::from_ids(ids),
            Utc::now(),
            &self.config.pipeline_options(false),
        )
        .await?;

        info!(
            current = summary.current.records,
            forecast = summary.forecast.records,
            missing = summary.missing,
            "ARSO weather ingest finished"
        );
        Ok(())
    }

    pub async fn arso_maps(&self) -> Result<()> {
        let store = self.store().await?;
        let summary =
            arso::ingest_maps(&store, &self.http, Utc::now(), &self.config.pipeline_options(false)).await?;

        info!(records = summary.records, "ARSO maps ingest finished");
        Ok(())
    }

    pub async fn alerts_get(&self, country: CountryId) -> Result<()> {
        let path = self.config.paths.alert_areas(country);
        let areas = match open_optional(&path)? {
            Some(file) => read_areas(file)
                .with_context(|| format!("Failed to read alert areas {}", path.display()))?,
            None => {
                warn!(path = %path.display(), "No alert area list, relying on EMMA geocodes");
                AreaCatalogue::default()
            }
        };

        let store = self.store().await?;
        let summary = update_alerts(&store, &self.http, country, &areas, Utc::now()).await?;
        info!(
            country = %country,
            added = summary.added,
            removed = summary.removed,
            total = summary.total,
            "Alerts update finished"
        );
        Ok(())
    }

    /// Path of the MOSMIX bundle to read. A downloaded bundle lives as long
    /// as the returned temporary file.
    async fn mosmix_archive(&self, local_source: bool) -> Result<(Option<NamedTempFile>, PathBuf)> {
        if local_source {
            return Ok((None, self.config.paths.mosmix_archive.clone()));
        }

        let download = dwd::download_mosmix(&self.http)
            .await
            .context("Failed to download MOSMIX bundle")?;
        let path = download.path().to_path_buf();
        Ok((Some(download), path))
    }
}

fn open_optional(path: &Path) -> Result<Option<BufReader<File>>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(Some(BufReader::new(file)))
}

fn read_ids_or_empty(path: &Path) -> Result<std::collections::HashSet<String>> {
    match open_optional(path)? {
        Some(file) => Ok(dwd::read_id_list(file)?),
        None => Ok(Default::default()),
    }
}

fn write_catalogue(path: &Path, stations: &[dwd::DwdStation]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    dwd::write_station_csv(file, stations)?;
    Ok(())
}
