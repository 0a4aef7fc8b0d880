//! Output sinks selected at startup.

use std::io::{self, Write};

use async_trait::async_trait;
use parking_lot::Mutex;

use fitflux_adapters::{influx::InfluxClient, AdapterError};
use fitflux_pipeline::{Batch, SeriesSink};

/// Writes each batch as line protocol instead of sending it.
pub struct DryRunSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl DryRunSink {
    /// Print batches to stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Print batches to any writer.
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }
}

impl std::fmt::Debug for DryRunSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DryRunSink").finish_non_exhaustive()
    }
}

#[async_trait]
impl SeriesSink for DryRunSink {
    type Error = AdapterError;

    async fn write(&self, batch: Batch) -> Result<(), AdapterError> {
        let mut out = self.out.lock();
        writeln!(
            out,
            "# db={} precision={} points={}",
            batch.database(),
            batch.precision().as_query(),
            batch.len()
        )
        .and_then(|_| out.write_all(batch.to_line_protocol().as_bytes()))
        .and_then(|_| out.flush())
        .map_err(|e| AdapterError::Write(e.to_string()))
    }
}

/// The sink a run writes to.
#[derive(Debug)]
pub enum Sink {
    Influx(InfluxClient),
    DryRun(DryRunSink),
}

#[async_trait]
impl SeriesSink for Sink {
    type Error = AdapterError;

    async fn write(&self, batch: Batch) -> Result<(), AdapterError> {
        match self {
            Sink::Influx(client) => client.write_batch(&batch).await,
            Sink::DryRun(sink) => sink.write(batch).await,
        }
    }
}
