//! Termext CLI
//!
//! Lists the terminal backends installed extensions advertise and attaches
//! the current terminal to one of them.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::commands::Context;
use crate::config::SettingsManager;

#[derive(Parser)]
#[command(name = "termext")]
#[command(author, version, about = "Termext - Terminal backends provided by extensions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding extension manifests
    #[arg(long, global = true, env = "TERMEXT_EXTENSIONS_DIR")]
    extensions_dir: Option<PathBuf>,

    /// Catalog category to enumerate
    #[arg(long, global = true)]
    catalog: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available terminal backends
    List,

    /// Show details of one backend
    Show {
        /// Connection type GUID
        id: Uuid,
    },

    /// Attach this terminal to a backend
    Connect {
        /// Connection type GUID
        id: Uuid,

        /// Initial row count
        #[arg(long)]
        rows: Option<u32>,

        /// Initial column count
        #[arg(long)]
        columns: Option<u32>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (settings, settings_error) = match SettingsManager::load() {
        Ok(settings) => (settings, None),
        Err(e) => (Default::default(), Some(e)),
    };

    let filter = if cli.verbose {
        "termext=debug,termext_cli=debug,termext_core=debug,termext_adapters=debug".to_string()
    } else {
        settings
            .log_filter
            .clone()
            .unwrap_or_else(|| "termext=info,termext_cli=info,termext_core=warn".to_string())
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    info!("Starting Termext CLI");

    if let Some(e) = settings_error {
        warn!("Using default configuration: {:#}", e);
    }

    let ctx = Context::new(settings, cli.extensions_dir, cli.catalog)?;

    let result = match cli.command {
        Commands::List => commands::list::execute(&ctx).await,
        Commands::Show { id } => commands::show::execute(&ctx, id).await,
        Commands::Connect { id, rows, columns } => {
            commands::connect::execute(&ctx, id, rows, columns).await
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&ctx).await,
        },
    };

    if let Err(ref e) = result {
        error!("Command failed: {}", e);
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    result
}
