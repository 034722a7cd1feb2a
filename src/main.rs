mod cli;
mod logging;

use clap::Parser;
use colored::*;
use cli::{Cli, Commands};
use dotenv::dotenv;
use photoimportd::{config, Daemon, IdentityIndex};
use std::process;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let args = Cli::parse();

    let config = match config::load_configuration(&args.overrides()) {
        Ok(config) => config,
        Err(err) => {
            let _guard = logging::init_logger("info", args.json_logs);
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let _guard = logging::init_logger(&config.log_level, config.log_json);

    let result = match args.command {
        Some(Commands::Run) | None => run_daemon(config),
        Some(Commands::PrintConfig) => {
            println!("{} {:#?}", "Configuration:".bold(), config);
            Ok(())
        }
        Some(Commands::Stats) => print_stats(&config),
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run_daemon(config: photoimportd::AppConfig) -> anyhow::Result<()> {
    let daemon = Daemon::new(config)?;
    daemon.run()?;
    Ok(())
}

fn print_stats(config: &photoimportd::AppConfig) -> anyhow::Result<()> {
    let index = IdentityIndex::open(&config.db_path)?;
    let counts = index.counts()?;
    info!(db = %config.db_path.display(), "Counted index records");
    println!("{}", "Index record counts".bold());
    println!("  srcPathSeen:  {}", counts.src_paths_seen.to_string().green());
    println!("  dstHash2Path: {}", counts.dst_hashes.to_string().green());
    println!("  dstPath2Hash: {}", counts.dst_paths.to_string().green());
    Ok(())
}
