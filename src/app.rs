//! Wiring of settings into a runnable loader.

use anyhow::{Context, Result};
use tracing::info;

use fitflux_adapters::{fitbit::FitbitClient, influx::InfluxClient};
use fitflux_pipeline::{MetricStream, Pipeline, PipelineError, RunReport};

use crate::settings::Settings;
use crate::sink::{DryRunSink, Sink};

/// Options chosen on the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Print line protocol instead of writing to InfluxDB.
    pub dry_run: bool,
    /// Streams to load; empty loads all of them.
    pub streams: Vec<MetricStream>,
    /// Access token to use instead of the OAuth flow.
    pub access_token: Option<String>,
}

/// A configured Fitbit client, sink and pipeline.
#[derive(Debug)]
pub struct App {
    settings: Settings,
    fitbit: FitbitClient,
    sink: Sink,
    pipeline: Pipeline,
}

impl App {
    /// Build the app from settings.
    ///
    /// Unless this is a dry run, the InfluxDB connection is checked here so
    /// that a bad endpoint fails before any data is fetched.
    pub async fn new(settings: Settings, options: RunOptions) -> Result<Self> {
        let pipeline = Pipeline::new(settings.pipeline_config(&options.streams)?);

        let mut fitbit = FitbitClient::builder()
            .credentials(&settings.fitbit_client_id, &settings.fitbit_client_secret)
            .redirect_uri(&settings.redirect_uri)
            .period(&settings.history_period);
        if let Some(token) = options
            .access_token
            .or_else(|| settings.fitbit_access_token.clone())
        {
            fitbit = fitbit.access_token(token);
        }
        let fitbit = fitbit.build().context("failed to build Fitbit client")?;

        let sink = if options.dry_run {
            info!("Dry run: writing line protocol to stdout");
            Sink::DryRun(DryRunSink::stdout())
        } else {
            let client = InfluxClient::builder()
                .endpoint(&settings.influx_hostname)
                .credentials(&settings.influx_username, &settings.influx_password)
                .database(&settings.influx_db)
                .connect()
                .await
                .with_context(|| {
                    format!("failed to connect to InfluxDB at {}", settings.influx_hostname)
                })?;
            info!("Connected to InfluxDB at {}", settings.influx_hostname);
            Sink::Influx(client)
        };

        Ok(Self {
            settings,
            fitbit,
            sink,
            pipeline,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn fitbit(&self) -> &FitbitClient {
        &self.fitbit
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run every configured stream once.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let report = self.pipeline.run(&self.fitbit, &self.sink).await?;
        info!(
            "Load complete: {} points in {} batches",
            report.total_points(),
            report.total_batches()
        );
        Ok(report)
    }
}
