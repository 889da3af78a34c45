use alfred_ai::{GeminiBackend, LlmBackend};
use alfred_bot::app::build_dispatcher;
use alfred_bot::config::BotConfig;
use alfred_bot::discord::{Bot, ShardManagerKey};
use serenity::all::{Client, GatewayIntents};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,alfred_bot=debug,alfred_assistant=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BotConfig::from_env().expect("failed to load configuration");
    info!(model = %config.gemini.model, "Loaded configuration");

    let backend: Arc<dyn LlmBackend> = Arc::new(
        GeminiBackend::new(config.gemini.clone()).expect("invalid Gemini configuration"),
    );
    let dispatcher = Arc::new(
        build_dispatcher(&config, backend).expect("failed to set up handlers"),
    );

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let bot = Bot::new(
        dispatcher,
        config.discord.command_prefix.clone(),
        config.discord.owner_id,
    );

    let mut client = Client::builder(&config.discord.token, intents)
        .event_handler(bot)
        .await
        .expect("failed to create Discord client");

    {
        let mut data = client.data.write().await;
        data.insert::<ShardManagerKey>(client.shard_manager.clone());
    }

    // Close all shards on SIGTERM or Ctrl+C.
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sigterm = signal(SignalKind::terminate()).expect("SIGTERM handler");
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await.ok();
        }
        info!("Shutdown signal received, stopping Discord client");
        shard_manager.shutdown_all().await;
    });

    info!("Starting Discord gateway connection");
    if let Err(e) = client.start().await {
        error!(error = %e, "Discord client error");
    }
    info!("Alfred stopped");
}
