//! Metric stream descriptors.
//!
//! Each stream has a fixed measurement name, a single tag and a single
//! field. The three daily streams share one load routine; the intraday
//! stream is loaded day by day.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use fitflux_types::{
    FieldValue, PointError, RestingHeartRecord, SeriesPoint, StepRecord, WeightRecord,
};

/// Fixed point shape of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub measurement: &'static str,
    pub tag_key: &'static str,
    pub tag_value: &'static str,
    pub field: &'static str,
}

impl StreamSpec {
    /// Build a point with this shape.
    pub fn point(
        &self,
        value: FieldValue,
        timestamp: DateTime<Utc>,
    ) -> Result<SeriesPoint, PointError> {
        SeriesPoint::builder(self.measurement)
            .tag(self.tag_key, self.tag_value)
            .field(self.field, value)
            .timestamp(timestamp)
            .build()
    }
}

pub const STEPS: StreamSpec = StreamSpec {
    measurement: "activity_steps",
    tag_key: "steps",
    tag_value: "steps-total",
    field: "steps",
};

pub const BODY_WEIGHT: StreamSpec = StreamSpec {
    measurement: "body_weight",
    tag_key: "weight",
    tag_value: "body-weight",
    field: "weight",
};

pub const RESTING_HEART: StreamSpec = StreamSpec {
    measurement: "heart",
    tag_key: "heart",
    tag_value: "resting-heart",
    field: "resting",
};

pub const INTRADAY_HEART: StreamSpec = StreamSpec {
    measurement: "heart-intraday",
    tag_key: "heart",
    tag_value: "intraday-heart",
    field: "rate",
};

/// The metric streams, declared in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricStream {
    Steps,
    Weight,
    RestingHeart,
    IntradayHeart,
}

impl MetricStream {
    /// All streams in load order.
    pub const ALL: [MetricStream; 4] = [
        MetricStream::Steps,
        MetricStream::Weight,
        MetricStream::RestingHeart,
        MetricStream::IntradayHeart,
    ];

    /// Point shape of this stream.
    pub fn spec(&self) -> &'static StreamSpec {
        match self {
            MetricStream::Steps => &STEPS,
            MetricStream::Weight => &BODY_WEIGHT,
            MetricStream::RestingHeart => &RESTING_HEART,
            MetricStream::IntradayHeart => &INTRADAY_HEART,
        }
    }

    /// Short name used in logs and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            MetricStream::Steps => "steps",
            MetricStream::Weight => "weight",
            MetricStream::RestingHeart => "resting-heart",
            MetricStream::IntradayHeart => "intraday-heart",
        }
    }
}

impl fmt::Display for MetricStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricStream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricStream::ALL
            .into_iter()
            .find(|stream| stream.name() == s)
            .ok_or_else(|| {
                format!(
                    "unknown stream '{}' (expected one of: steps, weight, resting-heart, intraday-heart)",
                    s
                )
            })
    }
}

/// A daily record: a date string plus the value to store.
pub trait DailyValue {
    /// Date as returned by the API (`YYYY-MM-DD`).
    fn date(&self) -> &str;

    /// Value to store.
    fn value(&self) -> FieldValue;
}

impl DailyValue for StepRecord {
    fn date(&self) -> &str {
        &self.date
    }

    fn value(&self) -> FieldValue {
        FieldValue::Integer(self.value)
    }
}

impl DailyValue for WeightRecord {
    fn date(&self) -> &str {
        &self.date
    }

    fn value(&self) -> FieldValue {
        FieldValue::Float(self.value)
    }
}

impl DailyValue for RestingHeartRecord {
    fn date(&self) -> &str {
        &self.date
    }

    fn value(&self) -> FieldValue {
        FieldValue::Integer(self.value.resting_heart_rate)
    }
}
