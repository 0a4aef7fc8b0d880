//! Records as delivered by the Fitbit Web API.
//!
//! Daily records carry the calendar date exactly as the API returned it
//! (`YYYY-MM-DD`); parsing happens in the pipeline so that a malformed date
//! can abort the run with context.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Daily step total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Steps taken that day.
    pub value: i64,
}

/// Daily body weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightRecord {
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Weight in the unit system of the account.
    pub value: f64,
}

/// Daily heart summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestingHeartRecord {
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Nested summary values.
    pub value: HeartValue,
}

/// The nested value of a daily heart summary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeartValue {
    /// Resting heart rate in bpm; 0 on days without enough data.
    pub resting_heart_rate: i64,
}

/// One intraday heart rate sample: a local time of day and a rate in bpm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntradaySample {
    pub time: NaiveTime,
    pub value: i64,
}

/// A sample anchored to an absolute instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedSample {
    pub timestamp: DateTime<Utc>,
    pub value: i64,
}

/// One day of intraday heart rate samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntradaySeries {
    /// The day the samples belong to.
    pub date: NaiveDate,
    /// Samples in the order the API returned them.
    pub samples: Vec<IntradaySample>,
}

impl IntradaySeries {
    /// Create a series for a day.
    pub fn new(date: NaiveDate, samples: Vec<IntradaySample>) -> Self {
        Self { date, samples }
    }

    /// Anchor every sample to an absolute instant in `tz`.
    ///
    /// Ambiguous local times resolve to the earlier instant. Local times that
    /// do not exist in `tz` (inside a spring-forward gap) are dropped.
    pub fn normalize(&self, tz: Tz) -> Vec<NormalizedSample> {
        self.samples
            .iter()
            .filter_map(|sample| {
                let local = self.date.and_time(sample.time);
                tz.from_local_datetime(&local)
                    .earliest()
                    .map(|dt| NormalizedSample {
                        timestamp: dt.with_timezone(&Utc),
                        value: sample.value,
                    })
            })
            .collect()
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the day has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
