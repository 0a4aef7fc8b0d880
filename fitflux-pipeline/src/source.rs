//! Seams between the pipeline and the outside world.

use async_trait::async_trait;
use chrono::NaiveDate;

use fitflux_types::{Batch, IntradaySeries, RestingHeartRecord, StepRecord, WeightRecord};

/// Upstream provider of fitness records.
///
/// Each daily fetch returns the complete history in a single call.
#[async_trait]
pub trait FitnessSource: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Daily step totals.
    async fn fetch_step_history(&self) -> Result<Vec<StepRecord>, Self::Error>;

    /// Daily body weight.
    async fn fetch_weight_history(&self) -> Result<Vec<WeightRecord>, Self::Error>;

    /// Daily heart summaries carrying the resting heart rate.
    async fn fetch_resting_heart_history(&self) -> Result<Vec<RestingHeartRecord>, Self::Error>;

    /// Per-second heart rate samples for one day.
    async fn fetch_intraday_heart(&self, date: NaiveDate) -> Result<IntradaySeries, Self::Error>;
}

/// Downstream time-series store.
#[async_trait]
pub trait SeriesSink: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Write a batch in a single call.
    async fn write(&self, batch: Batch) -> Result<(), Self::Error>;
}
