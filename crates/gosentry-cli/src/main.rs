//! gosentry CLI tool.
//!
//! Usage:
//! ```bash
//! gosentry scan [OPTIONS] [PATH]...
//! gosentry rules
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

/// Static security analyzer for Go-shaped source trees
#[derive(Parser)]
#[command(name = "gosentry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan packages for security issues
    Scan {
        /// Paths to analyze; `dir/...` scans recursively
        #[arg(default_value = "./...")]
        paths: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Build tags to apply while loading
        #[arg(long)]
        tags: Vec<String>,

        /// Directory exclusion regexes (can be repeated)
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Include _test files in the scan
        #[arg(long)]
        tests: bool,

        /// Skip files carrying the generated-code banner
        #[arg(long, default_value_t = true)]
        exclude_generated: bool,

        /// Exit zero even when issues are found
        #[arg(long)]
        no_fail: bool,
    },

    /// List available rules
    Rules,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Scan {
            paths,
            format,
            tags,
            exclude,
            tests,
            exclude_generated,
            no_fail,
        } => commands::scan::run(commands::scan::ScanArgs {
            paths,
            format,
            tags,
            exclude,
            tests,
            exclude_generated,
            no_fail,
            config: cli.config,
        }),
        Commands::Rules => {
            commands::rules::run();
            Ok(())
        }
    }
}
