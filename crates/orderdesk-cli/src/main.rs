//! `orderdesk`: inspect and administer a desk snapshot from the shell.
//!
//! ```text
//! orderdesk --config desk.json stats
//! orderdesk pending --limit 5
//! orderdesk ban 123456
//! ```
//!
//! The CLI writes the snapshot file directly, so it refuses to run while
//! another writer holds `<snapshot>.lock`. A desk process sharing the file
//! must hold the same [`WriterLock`] for as long as it runs.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use orderdesk_engine::LifecycleEngine;
use orderdesk_store::{FileSink, WriterLock};
use orderdesk_types::{constants, DeskConfig, UserId};

#[derive(Parser, Debug)]
#[command(name = "orderdesk")]
#[command(about = "OrderDesk operator CLI", version = constants::VERSION, long_about = None)]
struct Cli {
    /// JSON config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Snapshot file, overriding the configured `snapshot_path`.
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Desk-wide counters
    Stats,

    /// Orders waiting for review, oldest first
    Pending {
        #[arg(long, default_value_t = constants::DEFAULT_PENDING_LIMIT)]
        limit: usize,
    },

    /// Live orders older than the configured TTL
    Stale,

    /// Banned user ids
    Banned,

    /// Ban a user and cancel their live order
    Ban { user: UserId },

    /// Lift a ban
    Unban { user: UserId },

    /// Show one user's order
    Show { user: UserId },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = match &cli.config {
        Some(path) => DeskConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DeskConfig::default(),
    };
    if let Some(snapshot) = &cli.snapshot {
        config.snapshot_path.clone_from(snapshot);
    }

    let (_lock, engine) = open_engine(config)?;
    let output = commands::execute(&engine, &cli.cmd, cli.json).await?;
    println!("{output}");
    Ok(())
}

/// Take the writer lock on the configured snapshot, then open the engine on it.
fn open_engine(config: DeskConfig) -> Result<(WriterLock, LifecycleEngine)> {
    let snapshot_path = config.snapshot_path.clone();
    let lock = WriterLock::acquire(&snapshot_path)
        .with_context(|| format!("locking snapshot {}", snapshot_path.display()))?;
    let engine = LifecycleEngine::open(config, FileSink::new(&snapshot_path))
        .with_context(|| format!("opening snapshot {}", snapshot_path.display()))?;
    tracing::debug!(snapshot = %snapshot_path.display(), lock = %lock.path().display(), "Snapshot opened");
    Ok((lock, engine))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
