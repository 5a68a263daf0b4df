//! # Log Sync CLI (`logsync`)
//!
//! ## Usage
//!
//! ```bash
//! logsync [--config ./config/logsync.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `logsync init` | Create the store schema |
//! | `logsync sync` | Upsert the source file, clear it, export CSVs |
//! | `logsync export` | Rewrite the CSV exports from the store |
//! | `logsync stats` | Print document and group counts |
//!
//! ## Exit codes
//!
//! `0` on success (including runs where some records failed), `2` when the
//! configuration is missing or invalid, `1` for any other fatal error.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use tracing_subscriber::EnvFilter;

use log_sync::config::{self, ClearPolicy, Config};
use log_sync::progress::ProgressMode;
use log_sync::{db, export, migrate, stats, sync, SyncError};

/// Log Sync: deduplicating JSON log sync into a document store, with CSV
/// export.
///
/// The store connection string comes from `LOGSYNC_DATABASE_URL` or the
/// `[store]` section of the config file.
#[derive(Parser)]
#[command(
    name = "logsync",
    about = "Log Sync: deduplicating JSON log sync into a document store, with CSV export",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/logsync.toml` when that file exists. Settings
    /// from `LOGSYNC_*` environment variables override the file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the store schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Sync the source log file into the store.
    ///
    /// Loads the source file, inserts records not already stored, clears the
    /// file according to the clear policy, and writes the CSV exports and
    /// the sync report.
    Sync {
        /// Never clear the source file after this sync.
        #[arg(long)]
        keep_source: bool,

        /// Progress on stderr: `off`, `human`, or `json`.
        /// Defaults to `human` when stderr is a terminal.
        #[arg(long)]
        progress: Option<ProgressMode>,
    },

    /// Write the CSV exports from the current store contents.
    Export,

    /// Show document counts and the top values of the grouping field.
    Stats,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            let code = err
                .downcast_ref::<SyncError>()
                .map(SyncError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut cfg = config::load_config(cli.config.as_deref())?;

    if let Commands::Sync {
        keep_source: true, ..
    } = cli.command
    {
        cfg.sync.clear_policy = ClearPolicy::Never;
    }

    let pool = db::connect(&cfg).await?;
    db::run_bounded(
        &pool,
        cfg.store.run_timeout(),
        dispatch(&cfg, &pool, cli.command),
    )
    .await?;
    Ok(())
}

async fn dispatch(cfg: &Config, pool: &SqlitePool, command: Commands) -> Result<(), SyncError> {
    match command {
        Commands::Init => {
            migrate::run_migrations(pool).await?;
            println!("Store initialized successfully.");
        }
        Commands::Sync { progress, .. } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            sync::run_sync(cfg, pool, mode).await?;
        }
        Commands::Export => {
            export::run_export(cfg, pool).await?;
        }
        Commands::Stats => {
            stats::run_stats(cfg, pool).await?;
        }
    }
    Ok(())
}
