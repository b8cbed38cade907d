//! picu-loader - incremental HL7 vital-sign loader
//!
//! One invocation is one pass: new message files under `root_dir` are
//! ingested, their points sent to OpenTSDB, and the subject registry and
//! processed-file ledger rewritten. Exits non-zero on any fatal error, in
//! which case nothing is persisted.

use anyhow::{Context, Result};
use clap::Parser;
use picu_common::config::ConfigFileResolver;
use picu_common::logging::init_tracing;
use picu_loader::config::{LoaderConfig, MODULE_NAME};
use picu_loader::{LoadOrchestrator, RunOptions};
use std::path::PathBuf;
use tracing::{error, info};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "picu-loader")]
#[command(about = "Load HL7 vital-sign messages into OpenTSDB", long_about = None)]
#[command(version)]
struct Args {
    /// Config file (overrides PICU_LOADER_CONFIG and default locations)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Log points instead of sending them and do not write any outputs
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is needed for the log level, so resolution errors are reported
    // through a provisional subscriber
    let resolved = ConfigFileResolver::new(MODULE_NAME)
        .resolve(args.config.as_deref())
        .context("Failed to locate configuration");
    let config = resolved.and_then(|path| {
        LoaderConfig::load(&path)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    });

    let level = args
        .log_level
        .clone()
        .or_else(|| config.as_ref().ok().map(|c| c.logging.level.clone()))
        .unwrap_or_else(picu_common::logging::default_log_level);
    init_tracing(&level);

    info!(
        "Starting PICU loader (picu-loader) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = config.map_err(|e| {
        error!("{:#}", e);
        e
    })?;
    info!("Root directory: {}", config.root_dir.display());
    info!("OpenTSDB: {}{}", config.opentsdb_url, config.api_put);

    let options = RunOptions {
        dry_run: args.dry_run,
    };
    if options.dry_run {
        info!("Dry run: no points are sent and nothing is persisted");
    }

    let orchestrator =
        LoadOrchestrator::new(config, options).context("Failed to create time-series client")?;
    let summary = orchestrator.run().await.map_err(|e| {
        error!("Run aborted, no files marked processed: {}", e);
        anyhow::Error::new(e)
    })?;

    info!(
        "Done: {} files, {} points, {} subjects ({} target population)",
        summary.files_processed, summary.points_emitted, summary.subjects, summary.target_subjects
    );
    Ok(())
}
