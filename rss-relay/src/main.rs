use anyhow::Context;
use clap::Parser;
use rss_relay::{RelayArgs, RelayConfig, RssRelay};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env must be loaded before clap reads the environment.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let args = RelayArgs::parse();
    let config = RelayConfig::from_args(args).context("Invalid configuration")?;

    info!("Starting the bot...");
    let relay = RssRelay::from_config(&config).context("Failed to build relay")?;

    let bot_name = relay.login().await.context("Discord login failed")?;
    info!("Bot logged in as {}", bot_name);

    if config.once {
        let report = relay.run_once().await.map_err(|e| {
            error!("Cycle failed: {}", e);
            e
        })?;
        info!("Single cycle finished: {} delivered", report.delivered);
        return Ok(());
    }

    tokio::select! {
        _ = relay.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Received Ctrl-C, shutting down");
        }
    }

    Ok(())
}
