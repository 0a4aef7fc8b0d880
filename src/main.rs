use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fitflux::{server, App, RunOptions, Settings};
use fitflux_pipeline::MetricStream;

#[derive(Parser, Debug)]
#[command(name = "fitflux")]
#[command(about = "Load Fitbit steps, weight and heart rate history into InfluxDB")]
#[command(version)]
struct Args {
    /// Path to a TOML settings file (default: ./fitflux.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print line protocol to stdout instead of writing to InfluxDB
    #[arg(long, global = true)]
    dry_run: bool,

    /// Load only this stream (repeatable): steps, weight, resting-heart, intraday-heart
    #[arg(long = "only", value_name = "STREAM", global = true)]
    only: Vec<MetricStream>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Serve the OAuth2 callback and load after each authorization (default)
    Serve,
    /// Load once with an existing access token and exit
    Run {
        /// Fitbit access token
        #[arg(long, env = "FITBIT_ACCESS_TOKEN", hide_env_values = true)]
        access_token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;

    let mut options = RunOptions {
        dry_run: args.dry_run,
        streams: args.only,
        access_token: None,
    };

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let app = App::new(settings, options).await?;
            server::serve(app).await
        }
        Command::Run { access_token } => {
            options.access_token = access_token;
            let app = App::new(settings, options).await?;
            if !app.fitbit().is_authorized() {
                bail!("no access token: pass --access-token or set FITBIT_ACCESS_TOKEN");
            }
            let report = app.run().await?;
            for stream in &report.streams {
                info!(
                    "{}: {} points, {} skipped, {} batches",
                    stream.stream, stream.points, stream.skipped, stream.batches
                );
            }
            Ok(())
        }
    }
}

/// Log to stderr so dry-run output on stdout stays clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
