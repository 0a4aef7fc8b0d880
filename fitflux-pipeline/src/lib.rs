//! # fitflux-pipeline
//!
//! The windowed extraction and load pipeline behind fitflux.
//!
//! A run walks four metric streams in a fixed order: daily steps, body
//! weight, resting heart rate and intraday heart rate. Each daily stream is
//! fetched once, filtered through the retention window, mapped to series
//! points and written as a single batch. The intraday stream is fetched one
//! day at a time, normalized to a civil timezone and written as one batch
//! per day.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fitflux_pipeline::{Pipeline, PipelineConfig, RetentionWindow};
//!
//! let config = PipelineConfig::builder()
//!     .database("fitbit")
//!     .window(RetentionWindow::days(30))
//!     .build();
//!
//! // `source` implements FitnessSource, `sink` implements SeriesSink
//! let report = Pipeline::new(config).run(&source, &sink).await?;
//! ```
//!
//! ## Failure Policy
//!
//! The first fetch, parse, point or write error aborts the run. There is no
//! retry and no rollback: batches written before the error stay written.

mod config;
mod error;
mod pipeline;
mod source;
pub mod stream;
mod window;

pub use config::{PipelineConfig, PipelineConfigBuilder, DEFAULT_DATABASE, DEFAULT_TIMEZONE};
pub use error::{BoxError, PipelineError};
pub use pipeline::{Pipeline, RunReport, StreamReport};
pub use source::{FitnessSource, SeriesSink};
pub use stream::{DailyValue, MetricStream, StreamSpec};
pub use window::{is_within_window, parse_record_date, RetentionWindow, DATE_FORMAT};

// Re-export types for convenience
pub use fitflux_types::{Batch, FieldValue, IntradaySeries, Precision, SeriesPoint};
