//! Threat Intel - read-only query service over threat-intelligence records
//!
//! Serves:
//! - `GET /api/livecheck` liveness probe
//! - `GET /api/threats` paginated, filterable listing
//! - `GET /api/threats/:id` single record lookup
//! - `GET /api/threats/stats` counts by category and severity
//!
//! `threat-intel import <rows.json>` loads a dataset export into the store.

mod config;
mod db;
mod error;
mod ingest;
mod query;
mod service;
mod threat;
mod web;

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

enum Command {
    Serve,
    Import(PathBuf),
}

fn parse_command() -> Result<Command> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None | Some("serve") => Ok(Command::Serve),
        Some("import") => match args.next() {
            Some(path) => Ok(Command::Import(PathBuf::from(path))),
            None => anyhow::bail!("usage: threat-intel import <rows.json>"),
        },
        Some(other) => anyhow::bail!("unknown command '{}' (expected 'serve' or 'import')", other),
    }
}

fn init_logging(level: &str) {
    // Use LOG_FORMAT=gcp for structured GCP Cloud Logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "gcp" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before any other initialization)
    let _ = dotenvy::dotenv();

    let command = parse_command()?;
    let config = config::Config::load()?;
    init_logging(&config.logging.level);
    info!("Configuration loaded");

    let db = db::Database::new(&config.database).await?;
    db.run_migrations().await?;
    info!("Database initialized");

    match command {
        Command::Import(path) => {
            ingest::import_file(&db, &path).await?;
        }
        Command::Serve => {
            let threats = service::ThreatService::new(db);
            web::start_server(&config, threats).await?;
        }
    }

    Ok(())
}
