//! CLI entry point for the NextBus feed client.
//!
//! Provides subcommands for listing agencies and routes, dumping a route's
//! configuration and sampling live predictions at a stop.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use nextbus_feed::{
    FeedClient, FeedError,
    config::FeedConfig,
    output::{append_rows, prediction_rows, write_json},
};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "nextbus_feed")]
#[command(about = "Query the NextBus public XML feed", long_about = None)]
struct Cli {
    /// JSON config file; overrides NEXTBUS_* environment variables
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all agencies served by the feed
    Agencies,
    /// List the routes of an agency
    Routes {
        /// Agency tag (e.g. "sf-muni")
        agency: String,
    },
    /// Show stops and directions of a route
    RouteConfig {
        agency: String,
        route: String,
    },
    /// Show live predictions at a stop
    Predictions {
        agency: String,
        /// Stop id as printed on the stop sign
        stop: String,

        /// Only show predictions for this route
        #[arg(short, long)]
        route: Option<String>,

        /// CSV file to append prediction rows to
        #[arg(long)]
        csv: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/nextbus_feed.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("nextbus_feed.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<FeedError>() {
            Some(feed_err) if feed_err.is_precondition() => {
                warn!(error = %e, "Request rejected before contacting the feed")
            }
            _ => error!(error = %e, "Command failed"),
        }
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => FeedConfig::load(path)?,
        None => FeedConfig::from_env()?,
    };
    let client = FeedClient::from_config(&config)?;
    let stdout = std::io::stdout();

    match cli.command {
        Commands::Agencies => {
            let agencies = client.list_agencies().await?;
            info!(total = agencies.len(), "Agency list fetched");
            write_json(stdout, &agencies)?;
        }
        Commands::Routes { agency } => {
            let agency = client.agency(&agency).await?;
            info!(agency = agency.id(), total = agency.routes().len(), "Route list fetched");
            write_json(stdout, agency.routes())?;
        }
        Commands::RouteConfig { agency, route } => {
            let agency = client.agency(&agency).await?;
            let config = agency.route_config(&route).await?;

            let dangling = config.dangling_stop_tags();
            if !dangling.is_empty() {
                info!(count = dangling.len(), "Directions reference unknown stops");
            }
            write_json(stdout, &config)?;
        }
        Commands::Predictions {
            agency,
            stop,
            route,
            csv,
        } => {
            let agency = client.agency(&agency).await?;
            let by_route = match &route {
                Some(route) => {
                    let preds = agency.predictions_for_route(&stop, route).await?;
                    BTreeMap::from([(route.clone(), preds)])
                }
                None => agency.predictions(&stop).await?,
            };

            let count: usize = by_route
                .values()
                .map(|p| p.directions.values().map(Vec::len).sum::<usize>())
                .sum();
            info!(routes = by_route.len(), predictions = count, "Predictions fetched");

            if let Some(path) = csv {
                let rows = prediction_rows(Utc::now(), agency.id(), &stop, &by_route);
                append_rows(&path, &rows)
                    .with_context(|| format!("appending predictions to '{path}'"))?;
            }

            match &route {
                Some(route) => write_json(stdout, &by_route[route])?,
                None => write_json(stdout, &by_route)?,
            }
        }
    }

    Ok(())
}
