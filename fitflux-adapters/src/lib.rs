//! # fitflux-adapters
//!
//! Adapters connecting the fitflux pipeline to real services.
//!
//! ## Supported Systems
//!
//! - **Fitbit Web API** (`fitbit` feature) - OAuth2 authorization code
//!   exchange, profile lookup, and the step, weight, resting heart rate and
//!   intraday heart rate time series
//! - **InfluxDB 1.x** (`influx` feature) - connection check and batch writes
//!   over the HTTP API in line protocol
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fitflux_adapters::fitbit::FitbitClient;
//! use fitflux_adapters::influx::InfluxClient;
//! use fitflux_pipeline::{Pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fitbit = FitbitClient::builder()
//!         .access_token("eyJhbGciOi...")
//!         .build()?;
//!
//!     let influx = InfluxClient::builder()
//!         .endpoint("http://localhost:8086")
//!         .database("fitbit")
//!         .connect()
//!         .await?;
//!
//!     let report = Pipeline::new(PipelineConfig::default())
//!         .run(&fitbit, &influx)
//!         .await?;
//!
//!     println!("Wrote {} points", report.total_points());
//!     Ok(())
//! }
//! ```

pub mod error;

#[cfg(feature = "fitbit")]
pub mod fitbit;

#[cfg(feature = "influx")]
pub mod influx;

#[cfg(all(test, any(feature = "fitbit", feature = "influx")))]
mod test_server;

pub use error::AdapterError;
