//! Inspects the checkpoint store the way the background context does after a
//! restart, and prints the resulting report as JSON.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use cvpdf::{
    init_logging, load_config, LifecycleManager, LogFormat, SqliteStore, StartupReport,
    StoreError, SystemClock, TrackingConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a JSON tracking configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database to scan, overriding the configuration
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Delete stale and settled checkpoints after scanning
    #[arg(long)]
    purge: bool,

    /// Emit log lines as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    });

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> cvpdf::Result<()> {
    let report = scan(args).await?;
    let json = serde_json::to_string_pretty(&report).map_err(|e| StoreError::Serialization {
        key: "startupReport".to_string(),
        source: e,
    })?;
    println!("{}", json);
    Ok(())
}

/// Runs the startup handler against the configured database.
async fn scan(args: Args) -> cvpdf::Result<StartupReport> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => TrackingConfig::default(),
    };
    if args.purge {
        config.purge_stale_checkpoints = true;
    }

    let db_path = args
        .database
        .or_else(|| config.resolved_database_path())
        .ok_or_else(|| StoreError::Unavailable("no home directory for the default database".to_string()))?;
    tracing::info!("Scanning checkpoints in {}", db_path.display());

    let store = Arc::new(SqliteStore::open(&db_path)?);
    let manager = LifecycleManager::new(store, Arc::new(SystemClock), &config);

    // Logs each orphan the same way a restarted background context does
    manager
        .handle_startup()
        .await
        .ok_or_else(|| StoreError::Unavailable(format!("checkpoint scan of {} failed", db_path.display())).into())
}
