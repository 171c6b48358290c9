use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ezpoll_core::{LedgerConfig, Registry};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod script;

#[derive(Parser)]
#[command(name = "ezpoll")]
#[command(about = "Replay poll scripts against an in-process ezpoll registry")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a JSON script of operations and print the resulting tallies
    Run {
        /// Script file (JSON array of steps)
        script: PathBuf,

        /// Ledger configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the default ledger configuration as TOML
    DefaultConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG takes precedence over -v
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("ezpoll={log_level},ezpoll_core={log_level},warn"))),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Run { script, config } => {
            let config = match config {
                Some(path) => LedgerConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => LedgerConfig::default(),
            };

            let steps = script::load(&script)?;
            info!(steps = steps.len(), "running script");

            let mut registry = Registry::new(config).context("invalid ledger config")?;
            let snapshot = script::run(&mut registry, &steps)?;
            if !snapshot.rejected.is_empty() {
                warn!(rejected = snapshot.rejected.len(), "some steps were rejected");
            }

            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Command::DefaultConfig => {
            print!("{}", LedgerConfig::default().to_toml_string()?);
        }
    }

    Ok(())
}
