use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use khata_agents::llm::{GeminiClient, LlmProvider};
use khata_agents::{TransactionAgent, TransactionToolExecutor};
use khata_api::config::{get_config_path, ApiConfig};
use khata_api::{handlers, helpers, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long)]
    log_file_path: Option<String>,

    /// Config file to use instead of `<config_dir>/khata/api.toml`
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_tracing(log_file_path: Option<String>) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if let Some(log_path) = log_file_path {
        let log_path = std::path::Path::new(&log_path);
        let file_appender = tracing_appender::rolling::never(
            log_path.parent().unwrap_or(std::path::Path::new(".")),
            log_path
                .file_name()
                .unwrap_or(std::ffi::OsStr::new("khata-api.log")),
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        std::mem::forget(guard);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(true)
                    .with_writer(std::io::stdout),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

fn build_agent(config: &ApiConfig, config_path: &std::path::Path) -> anyhow::Result<TransactionAgent> {
    let store = helpers::database::initialize_store(config)?;
    let executor = TransactionToolExecutor::new(store)
        .with_currency_symbol(config.assistant.currency_symbol.clone());

    let api_key = config
        .gemini
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Missing Gemini API key: set GEMINI_API_KEY or gemini.api_key in {:?}",
                config_path
            )
        })?;

    let client = GeminiClient::new(api_key, Duration::from_secs(config.gemini.timeout_secs))?
        .with_model(config.gemini.model.clone())
        .with_base_url(config.gemini.base_url.clone());
    tracing::info!("Using Gemini model {}", client.model());
    let provider: Arc<dyn LlmProvider> = Arc::new(client);

    Ok(TransactionAgent::new(provider, Arc::new(executor))
        .with_recent_context(config.assistant.recent_context))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file_path);

    let (config, config_path) = ApiConfig::load(args.config.as_deref()).with_context(|| {
        format!(
            "Failed to load config from {:?}",
            args.config.clone().unwrap_or_else(get_config_path)
        )
    })?;
    tracing::info!("Loaded config from {:?}", config_path);

    let state = AppState::new(build_agent(&config, &config_path)?);

    let host = config.server.host.clone();
    let port = config.server.port;
    tracing::info!("Starting server on {}:{}", host, port);

    let cors_config = config.cors.clone();
    let server = HttpServer::new(move || {
        let cors = if let Some(cors_config) = &cors_config {
            let mut cors_builder = Cors::default();
            for origin in &cors_config.allowed_origins {
                cors_builder = cors_builder.allowed_origin(origin);
            }
            cors_builder
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .allowed_headers(vec!["Accept", "Content-Type"])
                .max_age(3600)
        } else {
            Cors::default()
                .allow_any_origin()
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .allowed_headers(vec!["Accept", "Content-Type"])
                .max_age(3600)
        };

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::configure)
    })
    .bind((host.as_str(), port))?
    .run();

    let handle = server.handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }

        tracing::info!("Ctrl+C received, shutting down...");
        handle.stop(true).await;
    });

    server.await?;
    Ok(())
}
