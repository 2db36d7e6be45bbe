mod config;
mod engine;
mod error;
mod rng;
mod worker;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{GameConfig, ServerArgs, NUMBER_OF_SLOTS};
use engine::Engine;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let args = ServerArgs::parse();
    let port = args.port;
    let config = match GameConfig::try_from(args) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, "invalid configuration");
            std::process::exit(1);
        }
    };

    tracing::info!(
        server_name = %config.server_name,
        players_count = config.players_count,
        size_x = config.size_x,
        size_y = config.size_y,
        "starting bombit-server"
    );

    let engine = Arc::new(Engine::new(config));

    let tick_engine = engine.clone();
    tokio::spawn(async move {
        tick_engine.run_ticks().await;
    });

    if let Err(error) = worker::run(engine, port, NUMBER_OF_SLOTS).await {
        tracing::error!(%error, "listener failed");
        std::process::exit(1);
    }
}
