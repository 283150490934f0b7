//! cli
//!
//! Command-line interface for the git core.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Set up logging and a session for the requested workspace
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It seeds an in-memory state container from the
//! config file and environment, calls one session operation and prints what
//! the operation published.

pub mod args;
pub mod commands;

pub use args::{BackendArg, Cli, Command, RemoteAction};

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "EGIT_LOG";

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let ctx = commands::Context::open(cli.workspace.clone(), cli.backend).await?;
        commands::dispatch(cli.command, &ctx).await
    })
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    // A second initialization (tests) is not an error worth reporting.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}
