use config::{Config, ConfigError, Environment, File};
use khata_agents::agent::DEFAULT_RECENT_CONTEXT;
use khata_agents::llm::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use khata_agents::tools::executor::DEFAULT_CURRENCY_SYMBOL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub cors: Option<CorsConfig>,
    pub database: DatabaseConfig,
    pub gemini: GeminiConfig,
    pub assistant: AssistantConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Defaults to `<data_local_dir>/khata/transactions.sqlite`
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AssistantConfig {
    pub currency_symbol: String,
    /// How many recent transactions go into the prompt
    pub recent_context: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
            recent_context: DEFAULT_RECENT_CONTEXT,
        }
    }
}

impl ApiConfig {
    /// Reads the TOML file (writing a default one first if missing), then
    /// `KHATA__SECTION__KEY` and the `GEMINI_*` variables on top.
    pub fn load(path_override: Option<&Path>) -> Result<(Self, PathBuf), ConfigError> {
        let config_path = path_override
            .map(Path::to_path_buf)
            .unwrap_or_else(get_config_path);

        if !config_path.exists() {
            write_default_config(&config_path)?;
        }

        let builder = Config::builder()
            .add_source(File::from(config_path.clone()))
            .add_source(
                Environment::with_prefix("KHATA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: ApiConfig = builder.try_deserialize()?;
        config.apply_env_overrides(|name| std::env::var(name).ok());

        Ok((config, config_path))
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("GEMINI_API_KEY").filter(|v| !v.trim().is_empty()) {
            self.gemini.api_key = Some(key);
        }
        if let Some(model) = lookup("GEMINI_MODEL").filter(|v| !v.trim().is_empty()) {
            self.gemini.model = model;
        }
    }
}

fn write_default_config(config_path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::Message(format!("Failed to create config directory: {e}"))
        })?;
    }

    let defaults = ApiConfig {
        cors: Some(CorsConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }),
        ..Default::default()
    };
    let body = toml::to_string_pretty(&defaults)
        .map_err(|e| ConfigError::Message(format!("Failed to encode default config: {e}")))?;
    let contents = format!(
        "# Set gemini.api_key here or export GEMINI_API_KEY\n\n{}",
        body
    );

    std::fs::write(config_path, contents)
        .map_err(|e| ConfigError::Message(format!("Failed to write default config: {e}")))?;
    tracing::info!("Wrote default config to {:?}", config_path);
    Ok(())
}

pub fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("khata").join("api.toml")
    } else {
        PathBuf::from("api.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.gemini.timeout_secs, 30);
        assert_eq!(config.assistant.currency_symbol, "₹");
        assert_eq!(config.assistant.recent_context, 5);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ApiConfig = Config::builder()
            .add_source(File::from_str(
                "[server]\nport = 9001\n\n[gemini]\nmodel = \"gemini-2.5-flash\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.gemini.timeout_secs, 30);
        assert!(config.cors.is_none());
    }

    #[test]
    fn test_gemini_env_overrides() {
        let mut config = ApiConfig::default();
        config.apply_env_overrides(|name| match name {
            "GEMINI_API_KEY" => Some("secret".to_string()),
            "GEMINI_MODEL" => Some(" ".to_string()),
            _ => None,
        });

        assert_eq!(config.gemini.api_key.as_deref(), Some("secret"));
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_default_file_round_trips() {
        let dir = std::env::temp_dir().join(format!("khata-config-test-{}", std::process::id()));
        let path = dir.join("api.toml");
        let _ = std::fs::remove_file(&path);

        write_default_config(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[server]"));
        assert!(written.contains("allowed_origins"));

        let config: ApiConfig = Config::builder()
            .add_source(File::from(path.clone()))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.assistant.recent_context, 5);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
