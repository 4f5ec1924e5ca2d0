//! Opsy - interactive runner for markdown SOPs.
//!
//! Without a subcommand, opens the terminal UI. `opsy list` prints every
//! SOP under the base directory.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use opsy::{sop, tui, Config};

/// Step through markdown runbooks one shell command at a time
#[derive(Parser)]
#[command(name = "opsy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,

    /// SOP base directory
    #[arg(long, global = true, env = "OPSY_SOP_DIR")]
    sop_dir: Option<PathBuf>,

    /// Execution log directory
    #[arg(long, global = true, env = "OPSY_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Configuration file (defaults to ~/.opsy/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List all SOPs under the base directory
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .with_overrides(cli.sop_dir, cli.log_dir);

    match cli.command {
        Some(Commands::List) => {
            init_stderr_logging(cli.verbose);
            cmd_list(&config);
        }
        None => {
            config.ensure_log_dir().with_context(|| {
                format!("Failed to create log directory {}", config.log_dir.display())
            })?;
            init_file_logging(&config, cli.verbose)?;
            tracing::info!(sop_dir = %config.sop_dir.display(), "Starting interactive session");
            tui::run_tui(&config)?;
        }
    }

    Ok(())
}

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

fn init_stderr_logging(verbose: bool) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(env_filter(verbose))
        .init();
}

/// The TUI owns the terminal, so diagnostics go to a file under the log root.
fn init_file_logging(config: &Config, verbose: bool) -> Result<()> {
    let path = config.log_dir.join("opsy.trace.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(false).with_writer(Mutex::new(file)))
        .with(env_filter(verbose))
        .init();

    Ok(())
}

/// Print every SOP below the base directory with its title.
fn cmd_list(config: &Config) {
    let base = &config.sop_dir;
    if !base.exists() {
        println!("Base directory does not exist: {}", base.display());
        println!("Please create the directory or update your configuration.");
        return;
    }

    for (path, parsed) in sop::discover_sops(base) {
        match parsed {
            Ok(doc) => println!("  {}: {}", path.display(), doc.title),
            Err(e) => println!("  [ERROR] {}: could not parse ({e})", path.display()),
        }
    }
}
