//! Batches - the unit of a single write to the store.

use chrono::{DateTime, Utc};

use crate::SeriesPoint;

/// Timestamp precision of a batch.
///
/// Records are dated by day and intraday samples by second, so whole
/// seconds are the only precision written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// Whole seconds.
    #[default]
    Seconds,
}

impl Precision {
    /// The value of the `precision` query parameter on the write endpoint.
    pub fn as_query(&self) -> &'static str {
        match self {
            Precision::Seconds => "s",
        }
    }

    /// Encode a timestamp at this precision.
    pub fn encode(&self, timestamp: DateTime<Utc>) -> i64 {
        match self {
            Precision::Seconds => timestamp.timestamp(),
        }
    }
}

/// An ordered set of points written in one call.
///
/// Points keep the order in which they were added.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    database: String,
    precision: Precision,
    points: Vec<SeriesPoint>,
}

impl Batch {
    /// Create an empty batch for a database.
    pub fn new(database: impl Into<String>, precision: Precision) -> Self {
        Self {
            database: database.into(),
            precision,
            points: Vec::new(),
        }
    }

    /// Append a point.
    pub fn add_point(&mut self, point: SeriesPoint) {
        self.points.push(point);
    }

    /// Target database.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Timestamp precision.
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Points in insertion order.
    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the batch has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Encode every point as newline-terminated line protocol.
    pub fn to_line_protocol(&self) -> String {
        let mut body = String::new();
        for point in &self.points {
            body.push_str(&point.to_line(self.precision));
            body.push('\n');
        }
        body
    }
}
