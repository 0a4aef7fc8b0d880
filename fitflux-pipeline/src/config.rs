//! Pipeline configuration.

use chrono_tz::Tz;

use fitflux_types::Precision;

use crate::{MetricStream, RetentionWindow};

/// Timezone intraday samples are anchored to when none is configured.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::London;

/// Database written to when none is configured.
pub const DEFAULT_DATABASE: &str = "fitbit";

/// Resolved configuration for one pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Target database.
    pub database: String,
    /// Look-back window.
    pub window: RetentionWindow,
    /// Zone intraday times are interpreted in.
    pub timezone: Tz,
    /// Timestamp precision of every batch.
    pub precision: Precision,
    /// Streams to load, in load order.
    pub streams: Vec<MetricStream>,
}

impl PipelineConfig {
    /// Create a builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    database: Option<String>,
    window: Option<RetentionWindow>,
    timezone: Option<Tz>,
    streams: Option<Vec<MetricStream>>,
}

impl PipelineConfigBuilder {
    /// Set the target database (default: "fitbit").
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the look-back window (default: 30 days).
    pub fn window(mut self, window: RetentionWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Set the intraday timezone (default: Europe/London).
    pub fn timezone(mut self, timezone: Tz) -> Self {
        self.timezone = Some(timezone);
        self
    }

    /// Restrict the streams to load (default: all four).
    ///
    /// Streams always load in the fixed order steps, weight, resting heart
    /// rate, intraday heart rate, whatever order they are given in.
    pub fn streams(mut self, streams: impl IntoIterator<Item = MetricStream>) -> Self {
        let mut streams: Vec<_> = streams.into_iter().collect();
        streams.sort();
        streams.dedup();
        self.streams = Some(streams);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> PipelineConfig {
        PipelineConfig {
            database: self
                .database
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            window: self.window.unwrap_or_default(),
            timezone: self.timezone.unwrap_or(DEFAULT_TIMEZONE),
            precision: Precision::Seconds,
            streams: self
                .streams
                .unwrap_or_else(|| MetricStream::ALL.to_vec()),
        }
    }
}
