//! Weather digest bot
//!
//! A Telegram bot that answers one-off weather lookups, remembers a favorite
//! city per user, and sends every user a daily digest for that city.

mod config;
mod db;
mod runtime;
mod state_machine;
mod telegram;
mod weather;

use config::BotConfig;
use db::Database;
use runtime::{Coordinator, DatabaseStore, ProductionCoordinator};
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use telegram::{Command, TelegramSender};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weather::{LoggingResolver, OpenWeatherService};

const DIALOG_PRUNE_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_digest_bot=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = BotConfig::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    if let Some(legacy) = &config.legacy_favorites_path {
        db.import_legacy_json(legacy)?;
    }

    let weather = LoggingResolver::new(OpenWeatherService::new(&config.weather)?);

    let bot = Bot::new(&config.bot_token);
    bot.set_my_commands(Command::bot_commands()).await?;

    let coordinator: Arc<ProductionCoordinator> = Arc::new(Coordinator::new(
        DatabaseStore::new(db),
        weather,
        TelegramSender::new(bot.clone()),
        config.digest_concurrency,
    ));

    let shutdown = CancellationToken::new();

    let digest_task = tokio::spawn(
        coordinator
            .clone()
            .run_daily_digest(config.digest_time, shutdown.clone()),
    );

    // Bound the dialog table
    let prune_task = tokio::spawn({
        let coordinator = coordinator.clone();
        let shutdown = shutdown.clone();
        async move {
            let mut interval = tokio::time::interval(DIALOG_PRUNE_INTERVAL);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        coordinator.prune_idle_dialogs().await;
                    }
                }
            }
        }
    });

    tracing::info!(
        digest_time = %config.digest_time,
        digest_concurrency = config.digest_concurrency,
        "Weather digest bot started"
    );

    Dispatcher::builder(bot, telegram::schema())
        .dependencies(dptree::deps![coordinator])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("Shutting down");
    shutdown.cancel();
    let (digest, prune) = tokio::join!(digest_task, prune_task);
    for (task, result) in [("digest", digest), ("prune", prune)] {
        if let Err(e) = result {
            tracing::error!(task, error = %e, "Background task did not finish cleanly");
        }
    }

    Ok(())
}
