mod chatbot;
mod config;
mod keepalive;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::prelude::*;

use chatbot::discord;
use chatbot::{Database, GeminiClient, Router};
use config::{Config, DEFAULT_CONFIG_PATH};

fn fatal(message: impl std::fmt::Display) -> ! {
    error!("{message}");
    eprintln!("error: {message}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Explicit path must exist; the default is only used if present
    let config_path = std::env::args().nth(1).map(PathBuf::from).or_else(|| {
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        default.exists().then_some(default)
    });
    let config = match Config::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("geminicord.log"))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("error: failed to open log file in {}: {e}", log_dir.display());
            std::process::exit(1);
        }
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting geminicord...");
    match &config_path {
        Some(path) => info!("Loaded config from {} (env overrides applied)", path.display()),
        None => info!("Loaded config from environment"),
    }
    info!("Gemini model: {}", config.gemini_model);

    let database = match Database::connect(&config.database).await {
        Ok(db) => db,
        Err(e) => fatal(format!("failed to connect to database: {e}")),
    };
    if let Err(e) = database.ensure_schema().await {
        fatal(format!("failed to create schema: {e}"));
    }
    match database.active_count().await {
        Ok(count) => info!("{count} active channel(s)"),
        Err(e) => fatal(format!("failed to read active channels: {e}")),
    }

    if let Some(port) = config.keepalive_port {
        tokio::spawn(async move {
            if let Err(e) = keepalive::serve(port).await {
                error!("Keep-alive server failed: {e}");
            }
        });
    }

    let gemini = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_model.clone());
    let router = Arc::new(Router::new(Arc::new(database), Arc::new(gemini)));

    if let Err(e) = discord::run(&config.discord_token, router).await {
        fatal(e);
    }
}
