use anyhow::{Context, Result};
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use khata_agents::llm::{GeminiClient, LlmProvider, DEFAULT_GEMINI_MODEL};
use khata_agents::storage::{SqliteTransactionStore, TransactionStore};
use khata_agents::{TransactionAgent, TransactionToolExecutor};
use khata_types::ProcessMessageRequest;

#[derive(Parser, Debug)]
#[command(name = "khata-cli", about = "Process one finance message through the assistant")]
struct Cli {
    /// User the transactions belong to
    #[arg(long)]
    user_id: String,

    /// Client application or tenant
    #[arg(long)]
    client_id: String,

    /// Free-text message, e.g. "I sold 10kg tomatoes for 1200 today"
    #[arg(long)]
    message: String,

    /// Override the Gemini model ID
    #[arg(long)]
    model: Option<String>,

    /// Override the SQLite database path
    #[arg(long, value_name = "PATH")]
    db_path: Option<PathBuf>,
}

/// The parts of the API server config this tool needs
#[derive(Debug, Default, Deserialize, Clone)]
struct CliConfig {
    #[serde(default)]
    database: DatabaseConfig,
    #[serde(default)]
    gemini: GeminiConfig,
    #[serde(default)]
    assistant: AssistantConfig,
}

#[derive(Debug, Default, Deserialize, Clone)]
struct DatabaseConfig {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
struct GeminiConfig {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Clone)]
struct AssistantConfig {
    currency_symbol: Option<String>,
    recent_context: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config().context("Failed to load khata config")?;

    let api_key = std::env::var("GEMINI_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())
        .or_else(|| config.gemini.api_key.clone())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Missing Gemini API key: set GEMINI_API_KEY or gemini.api_key in {:?}",
                get_config_path()
            )
        })?;

    let model = cli
        .model
        .clone()
        .or_else(|| std::env::var("GEMINI_MODEL").ok())
        .or_else(|| config.gemini.model.clone())
        .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

    let db_path = match &cli.db_path {
        Some(path) => path.clone(),
        None => resolve_db_path(&config)?,
    };
    tracing::info!("Using database at {:?}", db_path);

    let store: Arc<dyn TransactionStore> = Arc::new(
        SqliteTransactionStore::open(&db_path)
            .with_context(|| format!("Failed to open db at {:?}", db_path))?,
    );

    let mut executor = TransactionToolExecutor::new(store);
    if let Some(symbol) = &config.assistant.currency_symbol {
        executor = executor.with_currency_symbol(symbol.clone());
    }

    let mut client = GeminiClient::new(
        api_key,
        Duration::from_secs(config.gemini.timeout_secs.unwrap_or(30)),
    )?
    .with_model(model);
    if let Some(base_url) = &config.gemini.base_url {
        client = client.with_base_url(base_url.clone());
    }
    let provider: Arc<dyn LlmProvider> = Arc::new(client);

    let mut agent = TransactionAgent::new(provider, Arc::new(executor));
    if let Some(recent) = config.assistant.recent_context {
        agent = agent.with_recent_context(recent);
    }

    let response = agent
        .process_message(ProcessMessageRequest {
            user_id: cli.user_id,
            client_id: cli.client_id,
            message: cli.message,
        })
        .await;

    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

/// The server's config file is optional here; env vars fill the gaps
fn load_config() -> Result<CliConfig> {
    let config_path = get_config_path();

    let settings = Config::builder()
        .add_source(File::from(config_path).required(false))
        .add_source(Environment::with_prefix("KHATA").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("khata").join("api.toml")
    } else {
        PathBuf::from("api.toml")
    }
}

fn resolve_db_path(config: &CliConfig) -> Result<PathBuf> {
    if let Some(path) = &config.database.path {
        return Ok(PathBuf::from(path));
    }

    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;
    Ok(data_dir.join("khata").join("transactions.sqlite"))
}
