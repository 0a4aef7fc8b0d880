//! Series points - one timestamped measurement ready for storage.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::Precision;

/// A numeric field value.
///
/// InfluxDB fixes a field's type the first time it is written, so each
/// stream always emits the same variant for the same field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// Signed integer, written with an `i` suffix.
    Integer(i64),
    /// 64-bit float.
    Float(f64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{}i", v),
            FieldValue::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

/// Errors raised when a point cannot be built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PointError {
    /// The measurement name is empty.
    #[error("measurement name is empty")]
    EmptyMeasurement,

    /// A point needs at least one field.
    #[error("point for '{0}' has no fields")]
    NoFields(String),

    /// No timestamp was supplied.
    #[error("point for '{0}' has no timestamp")]
    MissingTimestamp(String),

    /// A tag or field key is empty.
    #[error("point for '{0}' has an empty tag or field key")]
    EmptyKey(String),

    /// Float fields must be finite.
    #[error("field '{field}' of '{measurement}' is not a finite number")]
    NonFinite { measurement: String, field: String },
}

/// One timestamped measurement with tags and fields.
///
/// Points are immutable once built; use [`SeriesPoint::builder`].
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    timestamp: DateTime<Utc>,
}

impl SeriesPoint {
    /// Create a builder for a point in the given measurement.
    pub fn builder(measurement: impl Into<String>) -> SeriesPointBuilder {
        SeriesPointBuilder::new(measurement)
    }

    /// The measurement (metric) name.
    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    /// Tag set, ordered by key.
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Field set, ordered by key.
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Look up a single field.
    pub fn field(&self, key: &str) -> Option<FieldValue> {
        self.fields.get(key).copied()
    }

    /// The absolute instant of the measurement.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Encode this point as one line of InfluxDB line protocol (no newline).
    pub fn to_line(&self, precision: Precision) -> String {
        let mut line = escape_measurement(&self.measurement);

        for (key, value) in &self.tags {
            line.push(',');
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&escape_key(value));
        }

        let fields = self
            .fields
            .iter()
            .map(|(key, value)| format!("{}={}", escape_key(key), value))
            .collect::<Vec<_>>()
            .join(",");

        line.push(' ');
        line.push_str(&fields);
        line.push(' ');
        line.push_str(&precision.encode(self.timestamp).to_string());
        line
    }
}

/// Builder for [`SeriesPoint`].
#[derive(Debug)]
pub struct SeriesPointBuilder {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    timestamp: Option<DateTime<Utc>>,
}

impl SeriesPointBuilder {
    /// Create a new builder.
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp: None,
        }
    }

    /// Add a tag.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add a field.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Set the timestamp.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Validate and build the point.
    pub fn build(self) -> Result<SeriesPoint, PointError> {
        if self.measurement.is_empty() {
            return Err(PointError::EmptyMeasurement);
        }
        if self.fields.is_empty() {
            return Err(PointError::NoFields(self.measurement));
        }
        let Some(timestamp) = self.timestamp else {
            return Err(PointError::MissingTimestamp(self.measurement));
        };
        if self.tags.keys().chain(self.fields.keys()).any(|k| k.is_empty()) {
            return Err(PointError::EmptyKey(self.measurement));
        }
        if let Some((field, _)) = self
            .fields
            .iter()
            .find(|(_, v)| matches!(v, FieldValue::Float(f) if !f.is_finite()))
        {
            return Err(PointError::NonFinite {
                measurement: self.measurement.clone(),
                field: field.clone(),
            });
        }

        Ok(SeriesPoint {
            measurement: self.measurement,
            tags: self.tags,
            fields: self.fields,
            timestamp,
        })
    }
}

fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

// Tag keys, tag values and field keys share the same escaping rules.
fn escape_key(s: &str) -> String {
    s.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_builder_accessors() {
        let point = SeriesPoint::builder("heart")
            .tag("heart", "resting-heart")
            .field("resting", 52i64)
            .timestamp(ts())
            .build()
            .unwrap();

        assert_eq!(point.measurement(), "heart");
        assert_eq!(point.tags().get("heart").map(String::as_str), Some("resting-heart"));
        assert_eq!(point.field("resting"), Some(FieldValue::Integer(52)));
        assert_eq!(point.timestamp(), ts());
    }

    #[test]
    fn test_builder_rejects_invalid_points() {
        assert_eq!(
            SeriesPoint::builder("").field("x", 1i64).timestamp(ts()).build(),
            Err(PointError::EmptyMeasurement)
        );
        assert_eq!(
            SeriesPoint::builder("m").timestamp(ts()).build(),
            Err(PointError::NoFields("m".to_string()))
        );
        assert_eq!(
            SeriesPoint::builder("m").field("x", 1i64).build(),
            Err(PointError::MissingTimestamp("m".to_string()))
        );
        assert_eq!(
            SeriesPoint::builder("m").tag("", "v").field("x", 1i64).timestamp(ts()).build(),
            Err(PointError::EmptyKey("m".to_string()))
        );
        assert!(matches!(
            SeriesPoint::builder("m").field("x", f64::NAN).timestamp(ts()).build(),
            Err(PointError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_line_encoding() {
        let point = SeriesPoint::builder("body_weight")
            .tag("weight", "body-weight")
            .field("weight", 72.5)
            .timestamp(ts())
            .build()
            .unwrap();

        assert_eq!(
            point.to_line(Precision::Seconds),
            "body_weight,weight=body-weight weight=72.5 1709251200"
        );
    }

    #[test]
    fn test_line_escaping() {
        let point = SeriesPoint::builder("my metric,x")
            .tag("a b", "c=d,e")
            .field("f g", 1i64)
            .timestamp(ts())
            .build()
            .unwrap();

        assert_eq!(
            point.to_line(Precision::Seconds),
            "my\\ metric\\,x,a\\ b=c\\=d\\,e f\\ g=1i 1709251200"
        );
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Integer(-3).to_string(), "-3i");
        assert_eq!(FieldValue::Float(70.0).to_string(), "70");
        assert_eq!(FieldValue::Float(0.25).to_string(), "0.25");
    }
}
