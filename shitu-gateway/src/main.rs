use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shitu_gateway::discord::start_discord_bot;
use shitu_gateway::{Recognizer, ShituHandler, WaitingRegistry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first so the log level fallback comes from settings
    let config = shitu_core::Config::load()?;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.settings.logging.level.as_str().into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Configuration loaded (endpoint: {}, session timeout: {}s)",
        config.settings.recognition.api_url, config.settings.session.timeout_seconds
    );

    let recognizer = Recognizer::from_settings(&config.settings.recognition)?;
    let registry = WaitingRegistry::new();
    let handler = Arc::new(ShituHandler::new(
        recognizer,
        registry.clone(),
        &config.settings,
    ));

    let discord_token = config.discord_bot_token().map(|s| s.to_string());

    let discord_task = if config.discord_enabled() {
        match start_discord_bot(discord_token, Arc::clone(&handler)).await? {
            Some(mut client) => {
                info!("Discord bot started");
                Some(tokio::spawn(async move {
                    if let Err(e) = client.start().await {
                        tracing::error!("Discord client error: {}", e);
                    }
                }))
            }
            None => {
                info!("Discord bot not started");
                None
            }
        }
    } else {
        info!("Discord bot disabled in config");
        None
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    registry.shutdown();
    if let Some(task) = discord_task {
        task.abort();
    }

    Ok(())
}
