//! kastle-visit - pre-authorize a single visitor from the command line
//!
//! Operator tool around the library: reads the portal login from the
//! environment and runs one authorization attempt.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use kastle_visit::config::Config;
use kastle_visit::{KastlePortal, VisitAuthorizer, VisitorDetails};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kastle-visit")]
#[command(about = "Pre-authorize a visitor on the MyKastle portal", long_about = None)]
struct Args {
    /// Visitor full name ("First Middle Last")
    #[arg(short, long)]
    name: String,

    /// Visitor email address
    #[arg(short, long)]
    email: String,

    /// Visit time as RFC 3339, e.g. 2025-07-01T14:00:00Z
    #[arg(short, long, value_parser = parse_timestamp)]
    date: DateTime<Utc>,

    /// Config file path (default: search standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let cfg = Config::load(args.config.as_deref())?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level)),
        )
        .init();

    tracing::info!("kastle-visit v{}", env!("CARGO_PKG_VERSION"));

    let credentials = cfg.credentials()?;
    let portal = KastlePortal::new(cfg.kastle()?)?;
    let visitor = VisitorDetails::new(args.name, args.email, args.date);

    match portal.authorize_visit(&credentials, &visitor).await {
        Ok(confirmation) => {
            tracing::info!(
                "Authorization confirmed (HTTP {}, {} bytes)",
                confirmation.status,
                confirmation.body.len()
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Authorization failed at {} stage: {}", e.stage(), e);
            Err(e).context("Visitor authorization failed")
        }
    }
}
