//! # fitflux-types
//!
//! Core types shared by the fitflux crates: the daily and intraday records
//! pulled from the Fitbit Web API, and the series points and batches written
//! to InfluxDB.
//!
//! ## Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use fitflux_types::{Batch, FieldValue, Precision, SeriesPoint};
//!
//! let point = SeriesPoint::builder("activity_steps")
//!     .tag("steps", "steps-total")
//!     .field("steps", FieldValue::Integer(5000))
//!     .timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
//!     .build()
//!     .unwrap();
//!
//! let mut batch = Batch::new("fitbit", Precision::Seconds);
//! batch.add_point(point);
//!
//! assert_eq!(
//!     batch.to_line_protocol(),
//!     "activity_steps,steps=steps-total steps=5000i 1709251200\n"
//! );
//! ```

mod batch;
mod point;
mod records;

pub use batch::*;
pub use point::*;
pub use records::*;
