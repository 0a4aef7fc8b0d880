//! Pipeline error types.

use thiserror::Error;

use fitflux_types::PointError;

use crate::MetricStream;

/// Boxed error from a source or sink.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that abort a pipeline run.
///
/// Batches written before the error stay in the store.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Fetching records from the upstream API failed.
    #[error("failed to fetch {stream} data: {source}")]
    Fetch {
        stream: MetricStream,
        #[source]
        source: BoxError,
    },

    /// A record carried a malformed date.
    #[error("invalid date {value:?} in {stream} history: {source}")]
    Parse {
        stream: MetricStream,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A point could not be constructed.
    #[error("invalid {stream} point: {source}")]
    Point {
        stream: MetricStream,
        #[source]
        source: PointError,
    },

    /// The store rejected a batch.
    #[error("failed to write {stream} batch: {source}")]
    Write {
        stream: MetricStream,
        #[source]
        source: BoxError,
    },
}

impl PipelineError {
    /// The stream that was being loaded when the error occurred.
    pub fn stream(&self) -> MetricStream {
        match self {
            PipelineError::Fetch { stream, .. }
            | PipelineError::Parse { stream, .. }
            | PipelineError::Point { stream, .. }
            | PipelineError::Write { stream, .. } => *stream,
        }
    }
}
