//! Process settings.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables. Environment variable names match the keys in
//! upper case (`INFLUX_HOSTNAME`, `TIME_PERIOD`, ...). Empty variables are
//! treated as unset.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use fitflux_pipeline::{MetricStream, PipelineConfig, RetentionWindow};

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "fitflux";

/// Resolved process settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// InfluxDB HTTP endpoint.
    pub influx_hostname: String,
    /// InfluxDB database.
    pub influx_db: String,
    /// InfluxDB username; empty disables authentication.
    pub influx_username: String,
    pub influx_password: String,
    /// Retention window in days.
    pub time_period: u32,
    pub fitbit_client_id: String,
    pub fitbit_client_secret: String,
    /// Pre-issued access token for one-shot runs.
    #[serde(default)]
    pub fitbit_access_token: Option<String>,
    /// OAuth2 redirect URI registered for the app.
    pub redirect_uri: String,
    /// Address the callback server binds to.
    pub listen_addr: String,
    /// Zone intraday samples are anchored to.
    pub timezone: String,
    /// Period requested for daily history (e.g. "max", "1y").
    pub history_period: String,
}

impl Settings {
    /// Load settings from defaults, the config file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, Environment::default())
    }

    /// Load settings with an explicit environment source.
    pub fn load_with(path: Option<&Path>, env: Environment) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = defaults()
            .and_then(|builder| {
                builder
                    .add_source(file)
                    .add_source(env.ignore_empty(true))
                    .build()
            })
            .context("failed to load settings")?;

        config
            .try_deserialize()
            .context("invalid settings")
    }

    /// Parse the configured intraday timezone.
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("invalid timezone '{}': {}", self.timezone, e))
    }

    /// Build the pipeline configuration.
    ///
    /// An empty stream list selects every stream.
    pub fn pipeline_config(&self, streams: &[MetricStream]) -> Result<PipelineConfig> {
        let mut builder = PipelineConfig::builder()
            .database(&self.influx_db)
            .window(RetentionWindow::days(self.time_period))
            .timezone(self.timezone()?);

        if !streams.is_empty() {
            builder = builder.streams(streams.iter().copied());
        }

        Ok(builder.build())
    }
}

fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Config::builder()
        .set_default("influx_hostname", "http://localhost:8086")?
        .set_default("influx_db", "fitbit")?
        .set_default("influx_username", "")?
        .set_default("influx_password", "")?
        .set_default("time_period", i64::from(RetentionWindow::DEFAULT_DAYS))?
        .set_default("fitbit_client_id", "")?
        .set_default("fitbit_client_secret", "")?
        .set_default("redirect_uri", "http://localhost:4000/auth")?
        .set_default("listen_addr", "0.0.0.0:4000")?
        .set_default("timezone", "Europe/London")?
        .set_default("history_period", "max")
}
