//! Subscriber Bot - Main Entry Point
//!
//! A Telegram bot that registers subscribers on `/start` and lets
//! administrators broadcast a message to all of them.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use subscriber_bot::broadcast::Broadcaster;
use subscriber_bot::commands::{BotCommand, CommandRouter};
use subscriber_bot::config::{AdminList, AdminsFile, BotSettings, TelegramConfig};
use subscriber_bot::dispatch::{Dispatcher, StopReason};
use subscriber_bot::shutdown::{ShutdownCoordinator, join_background};
use subscriber_bot::store::SqliteSubscriberStore;
use subscriber_bot::telegram::TelegramGateway;

/// Telegram bot for subscriber registration and broadcasts.
#[derive(Parser, Debug)]
#[command(name = "subscriber_bot")]
#[command(about = "Register subscribers and broadcast announcements on Telegram")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Path to the administrators JSON file (overrides `ADMINS_PATH`).
    #[arg(short, long)]
    admins: Option<PathBuf>,

    /// Generate an example administrators file and exit.
    #[arg(long)]
    generate_admins: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    if args.generate_admins {
        return generate_example_admins();
    }

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    // Load configurations
    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;

    let mut settings = BotSettings::from_env_with_defaults();
    if let Some(path) = args.admins {
        settings.admins_path = path;
    }

    let admins = Arc::new(
        AdminList::load(&settings.admins_path, settings.admin_ids.iter().copied())
            .with_context(|| {
                format!(
                    "Failed to load administrators from {}",
                    settings.admins_path.display()
                )
            })?,
    );
    if admins.is_empty() {
        warn!("No administrators configured, /stats and /broadcast will be refused");
    }

    let store = Arc::new(
        SqliteSubscriberStore::connect(&settings.database_url)
            .await
            .context("Failed to open subscriber store")?,
    );

    // Connect to Telegram
    let gateway = Arc::new(
        TelegramGateway::connect(&tg_config)
            .await
            .context("Failed to connect to Telegram")?,
    );

    if let Err(e) = gateway
        .register_commands(&BotCommand::public_commands())
        .await
    {
        warn!("Failed to register bot commands: {}", e);
    }

    // Signal handling runs alongside the dispatch loop for the whole process.
    let shutdown = ShutdownCoordinator::new();
    let signal_task = shutdown.spawn();
    #[cfg(unix)]
    let reload_task =
        subscriber_bot::shutdown::spawn_admin_reload(Arc::clone(&admins), shutdown.token());

    let events = gateway.spawn_polling(shutdown.token());

    let broadcaster = Broadcaster::new(store.clone(), gateway.clone())
        .with_workers(settings.broadcast_workers);
    let router = CommandRouter::new(store.clone(), admins, broadcaster);
    let dispatcher = Dispatcher::new(gateway.clone(), router);

    info!(
        username = gateway.username().unwrap_or("unknown"),
        broadcast_workers = settings.broadcast_workers,
        "Bot is running. Use Ctrl+C to stop."
    );

    let reason = dispatcher.run(events, shutdown.token()).await;

    // Cleanup
    shutdown.trigger("dispatch loop finished");
    join_background("signals", signal_task).await;
    #[cfg(unix)]
    join_background("admin reload", reload_task).await;
    store.close().await;

    match reason {
        StopReason::Shutdown => {
            info!("Shut down cleanly");
            Ok(())
        }
        StopReason::StreamClosed => bail!("Telegram update stream ended unexpectedly"),
    }
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Generates an example administrators file.
fn generate_example_admins() -> Result<()> {
    AdminsFile::example().save_to_file("admins.example.json")?;

    println!("✓ Example administrators file written to: admins.example.json");
    println!("\nTo use this bot:");
    println!("1. Copy admins.example.json to admins.json");
    println!("2. Replace the example id with your Telegram user id");
    println!("3. Create a .env file with TELEGRAM_BOT_TOKEN");
    println!("4. Run: subscriber_bot");

    Ok(())
}
