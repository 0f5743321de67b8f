use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use taskd::{config::DaemonConfig, rest, seed, storage::Storage, AppContext};

#[derive(Parser)]
#[command(
    name = "taskd",
    about = "Role-gated task tracking API daemon",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// REST server port
    #[arg(long, env = "TASKD_PORT")]
    port: Option<u16>,

    /// Data directory for the SQLite database and config.toml
    #[arg(long, env = "TASKD_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TASKD_LOG")]
    log: Option<String>,

    /// Bind address (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "TASKD_BIND")]
    bind_address: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the API server (default when no subcommand given).
    ///
    /// Examples:
    ///   taskd serve
    ///   taskd
    Serve,
    /// Seed demo users and tasks into the database.
    ///
    /// Creates one manager (manager@example.com) and three regular users
    /// (user1..3@example.com), password "password", plus a six-task
    /// dependency graph. Fails if those accounts already exist.
    ///
    /// Examples:
    ///   taskd seed
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = DaemonConfig::new(args.port, args.data_dir, args.log, args.bind_address);
    setup_logging(&config.log, &config.log_format);

    match args.command {
        Some(Command::Seed) => {
            let storage = Storage::new(&config.data_dir).await?;
            seed::run(&storage).await?;
        }
        None | Some(Command::Serve) => {
            let storage = Storage::new(&config.data_dir).await?;
            info!(data_dir = %config.data_dir.display(), "storage ready");
            let ctx = Arc::new(AppContext::new(config, storage));
            rest::start_rest_server(ctx).await?;
        }
    }

    Ok(())
}

/// Initialize the tracing subscriber. Must happen before any tracing calls.
///
/// `log_format` may be `"pretty"` (default, human-readable compact format)
/// or `"json"` (structured JSON for log aggregators).
fn setup_logging(log_level: &str, log_format: &str) {
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(log_level)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(log_level)
            .compact()
            .init();
    }
}
