//! Ingester configuration.
//!
//! Loaded from a YAML file after `.env` has been applied. Values may
//! reference the environment with `${VAR}` or `${VAR:-default}`. Every
//! section has defaults, so a partial file is valid.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use ingestion::{HttpOptions, PipelineOptions};
use serde::{Deserialize, Serialize};
use storage::ExpiryPolicy;
use weather_common::CountryId;

/// Which Redis database the ingester writes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseMode {
    #[default]
    Staging,
    Production,
    Test,
}

impl DatabaseMode {
    pub fn database_index(&self) -> i64 {
        match self {
            DatabaseMode::Staging => 0,
            DatabaseMode::Production => 1,
            DatabaseMode::Test => 2,
        }
    }
}

impl fmt::Display for DatabaseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DatabaseMode::Staging => "staging",
            DatabaseMode::Production => "production",
            DatabaseMode::Test => "test",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: DatabaseMode,
    pub redis: RedisConfig,
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub expiry: ExpiryConfig,
    pub batch: BatchConfig,
    pub paths: PathsConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roster: Option<RosterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let options = HttpOptions::default();
        Self {
            timeout_secs: options.timeout.as_secs(),
            user_agent: options.user_agent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpiryConfig {
    pub forecast_margin_minutes: i64,
    pub current_margin_minutes: i64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            forecast_margin_minutes: storage::FORECAST_MARGIN_MINUTES,
            current_margin_minutes: storage::CURRENT_CONDITION_MARGIN_MINUTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub limit: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            limit: storage::DEFAULT_BATCH_LIMIT,
        }
    }
}

/// Local files used instead of, or alongside, the upstream services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// DWD station catalogue
    pub dwd_stations: PathBuf,
    /// DWD stations awaiting curation
    pub dwd_stations_new: PathBuf,
    pub dwd_ignored: PathBuf,
    pub dwd_included: PathBuf,
    /// Ids of DWD stations publishing observations
    pub dwd_reporting: PathBuf,
    /// Local MOSMIX bundle for `--local-source`
    pub mosmix_archive: PathBuf,
    /// ARSO station list
    pub arso_stations: PathBuf,
    /// Directory with `{country}.json` MeteoAlarm area lists
    pub alert_areas: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dwd_stations: PathBuf::from("data/DWD.csv"),
            dwd_stations_new: PathBuf::from("data/DWD.new.csv"),
            dwd_ignored: PathBuf::from("data/DWD.ignored.csv"),
            dwd_included: PathBuf::from("data/DWD.included.csv"),
            dwd_reporting: PathBuf::from("data/DWD.current.csv"),
            mosmix_archive: PathBuf::from("data/MOSMIX_S_LATEST_240.kmz"),
            arso_stations: PathBuf::from("data/ARSO.json"),
            alert_areas: PathBuf::from("data/meteoalarm"),
        }
    }
}

impl PathsConfig {
    /// Local station list of a country.
    pub fn stations(&self, country: CountryId) -> &Path {
        match country {
            CountryId::Germany => &self.dwd_stations,
            CountryId::Slovenia => &self.arso_stations,
        }
    }

    pub fn alert_areas(&self, country: CountryId) -> PathBuf {
        self.alert_areas.join(format!("{}.json", country.code()))
    }
}

/// Remote station roster queried instead of the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    pub url: String,
    pub api_key: String,
}

impl Config {
    /// Load `path` with environment substitution.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let config: Config = serde_yaml::from_str(&expanded).context("Failed to parse YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration to `path`. Refuses to overwrite.
    pub fn generate(path: &Path) -> Result<()> {
        if path.exists() {
            bail!("{} already exists", path.display());
        }
        fs::write(path, Config::default().to_yaml()?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout: Duration::from_secs(self.http.timeout_secs),
            user_agent: self.http.user_agent.clone(),
        }
    }

    pub fn pipeline_options(&self, test_mode: bool) -> PipelineOptions {
        PipelineOptions {
            batch_limit: self.batch.limit,
            forecast_expiry: ExpiryPolicy::from_minutes(self.expiry.forecast_margin_minutes),
            current_expiry: ExpiryPolicy::from_minutes(self.expiry.current_margin_minutes),
            test_mode,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.batch.limit == 0 {
            bail!("batch.limit must be positive");
        }
        if self.http.timeout_secs == 0 {
            bail!("http.timeout_secs must be positive");
        }
        if self.expiry.forecast_margin_minutes < 0 || self.expiry.current_margin_minutes < 0 {
            bail!("expiry margins must not be negative");
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            bail!("logging.format must be text or json, got {}", self.logging.format);
        }
        Ok(())
    }
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut expr = String::new();
        loop {
            match chars.next() {
                Some('}') => break,
                Some(c) => expr.push(c),
                None => bail!("Unclosed variable substitution: ${{{}", expr),
            }
        }
        result.push_str(&resolve_var(&expr)?);
    }

    Ok(result)
}

fn resolve_var(expr: &str) -> Result<String> {
    match expr.split_once(":-") {
        Some((name, default)) => match std::env::var(name.trim()) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => Ok(default.to_string()),
        },
        None => std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr.trim())),
    }
}
