//! schoolgate - sign in to the school-management portal from a terminal.
//!
//! Keeps the session on disk (or in the OS keyring) between runs and shows
//! the dashboard that matches the signed-in user's role.

mod app;
mod cli;
mod ui;

use std::io;

use anyhow::Result;
use clap::Parser;
use schoolgate_core::AuthError;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use cli::Cli;

/// Initialize the tracing subscriber for logging
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (writer, guard) = tracing_appender::non_blocking(io::stderr());
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let log_guard = init_tracing();
    info!(command = ?cli.command, "schoolgate starting");

    let mut app = App::new(cli.api_url)?;
    if let Err(e) = app.run(cli.command).await {
        if let Some(AuthError::SessionExpired) = e.downcast_ref::<AuthError>() {
            eprintln!("{}", e);
            eprintln!("Run `schoolgate login` to sign in again.");
            drop(log_guard);
            std::process::exit(1);
        }
        return Err(e);
    }
    Ok(())
}
