use clap::{Parser, Subcommand};
use photoimportd::config::Overrides;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "photoimportd")]
#[command(about = "Deduplicating photo and video ingestion daemon", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (defaults to ./Config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Photo library master path
    #[arg(long, global = true)]
    pub src: Option<String>,

    /// Long term storage path
    #[arg(long, global = true)]
    pub dst: Option<String>,

    /// Index database path
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Number of worker threads per pool
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Sleep interval between scans, in seconds
    #[arg(long, global = true)]
    pub sleep: Option<u64>,

    /// Log decisions without touching the archive or the index
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Walk both trees completely once at startup
    #[arg(long, global = true)]
    pub rescan: bool,

    /// Walk every source subfolder each cycle, not just the current month
    #[arg(long, global = true)]
    pub walk_all: bool,

    /// Exit on the first file read failure
    #[arg(long, global = true)]
    pub fail_fast: bool,

    /// Turn on debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Serve Prometheus metrics
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Port for the metrics endpoint
    #[arg(long, global = true)]
    pub metrics_port: Option<u16>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan and archive forever (default)
    Run,
    /// Print configuration values
    PrintConfig,
    /// Display the number of records in each index namespace
    Stats,
}

fn flag(set: bool) -> Option<bool> {
    set.then_some(true)
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config_file: self.config.clone(),
            source_root: self.src.clone(),
            archive_root: self.dst.clone(),
            db_path: self.db.clone(),
            workers: self.workers,
            sleep_interval_secs: self.sleep,
            dry_run: flag(self.dry_run),
            rescan: flag(self.rescan),
            walk_all_source: flag(self.walk_all),
            fail_fast: flag(self.fail_fast),
            log_level: self.debug.then(|| "debug".to_string()),
            log_json: flag(self.json_logs),
            metrics_enabled: flag(self.metrics),
            metrics_port: self.metrics_port,
        }
    }
}
