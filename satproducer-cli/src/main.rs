//! satproducer CLI - offline tooling for producer configurations
//!
//! The production loop itself is embedded by deployments that provide the
//! scene, region and composite capabilities. This binary checks their
//! configuration and previews what a message would produce.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use satproducer::logging::{default_log_dir, default_log_file, init_logging};
use std::path::PathBuf;

use commands::plan::PlanArgs;
use commands::validate::ValidateArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "satproducer")]
#[command(version = satproducer::VERSION)]
#[command(about = "Satellite product pipeline tooling", long_about = None)]
struct Cli {
    /// Directory for the log file
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Log file name
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load settings and product configuration and report problems
    Validate(ValidateArgs),
    /// Show which products and files a message would produce
    Plan(PlanArgs),
}

fn main() {
    let cli = Cli::parse();

    let log_dir = cli.log_dir.unwrap_or_else(|| PathBuf::from(default_log_dir()));
    let log_file = cli.log_file.unwrap_or_else(|| default_log_file().to_string());
    let _logging_guard = match init_logging(&log_dir, &log_file) {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e.to_string()).exit(),
    };

    let result = match cli.command {
        Commands::Validate(args) => commands::validate::run(args),
        Commands::Plan(args) => commands::plan::run(args),
    };

    if let Err(e) = result {
        e.exit();
    }
}
