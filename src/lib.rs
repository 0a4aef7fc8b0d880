//! # fitflux
//!
//! Loads Fitbit history into InfluxDB.
//!
//! Daily steps, body weight and resting heart rate are fetched in one request
//! each, filtered to the retention window and written as one batch per
//! stream. Intraday heart rate is then fetched and written one day at a time
//! for each day in the window.
//!
//! ```text
//!  Fitbit API ──▶ FitbitClient ──▶ Pipeline ──▶ Sink ──▶ InfluxDB
//!                      ▲              │                  (or stdout)
//!   /auth callback ────┘              └── window filter, point building
//! ```
//!
//! - **[`settings`]**: layered configuration (defaults, TOML file, environment)
//! - **[`app`]**: wires settings into a Fitbit client, a sink and a pipeline
//! - **[`server`]**: the OAuth2 callback server that triggers a load
//! - **[`sink`]**: the InfluxDB sink and the dry-run sink
//!
//! ## Usage
//!
//! ```bash
//! # Authorize in the browser, then load
//! FITBIT_CLIENT_ID=... FITBIT_CLIENT_SECRET=... fitflux serve
//!
//! # Load once with an existing token, printing line protocol
//! fitflux --dry-run --only steps run --access-token "$TOKEN"
//! ```

pub mod app;
pub mod server;
pub mod settings;
pub mod sink;

pub use app::{App, RunOptions};
pub use settings::Settings;
pub use sink::{DryRunSink, Sink};
