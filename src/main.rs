//! bantracker - IRC ban/quiet tracker.
//!
//! Keeps a durable record of every ban and quiet in its channels, expires
//! them on schedule, and optionally kicks members matching a new ban.

mod config;
mod db;
mod duration;
mod error;
mod expiry;
mod handlers;
mod network;
mod state;

use crate::config::{Config, validate};
use crate::db::Database;
use crate::expiry::spawn_expiry_task;
use crate::handlers::Context;
use crate::network::Connection;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Everything runs on one thread; handlers interleave only at awaits.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run())
}

async fn run() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "bantracker.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(path = %config_path, "{e}");
        }
        anyhow::bail!("{} configuration problem(s) in {config_path}", errors.len());
    }

    info!(
        host = %config.server.host,
        port = config.server.port,
        nick = %config.server.nick,
        channels = config.bot.channels.len(),
        enforce = config.bot.enforce,
        quiet = ?config.bot.quiet,
        "Starting bantracker"
    );

    // Initialize database
    let db = Database::new(&config.database.path).await?;

    let ctx = Arc::new(Context::new(config, db));
    spawn_expiry_task(Arc::clone(&ctx));

    let delay = ctx.config.server.reconnect_delay();
    loop {
        tokio::select! {
            result = Connection::new(Arc::clone(&ctx)).run() => {
                match result {
                    Ok(()) => info!("Connection closed"),
                    Err(e) => warn!(error = %e, "Connection failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                return Ok(());
            }
        }

        info!(seconds = delay.as_secs(), "Reconnecting after delay");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                return Ok(());
            }
        }
    }
}
