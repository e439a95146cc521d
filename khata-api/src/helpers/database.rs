use crate::config::ApiConfig;
use khata_agents::SqliteTransactionStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Returns the path to the transactions database
///
/// `database.path` from the config wins. Otherwise:
///
/// - **macOS**: `~/Library/Application Support/khata/transactions.sqlite`
/// - **Linux**: `~/.local/share/khata/transactions.sqlite`
/// - **Windows**: `%LOCALAPPDATA%\khata\transactions.sqlite`
pub fn get_db_path(config: &ApiConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = config.database.path.as_ref().filter(|p| !p.trim().is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;

    Ok(data_dir.join("khata").join("transactions.sqlite"))
}

/// Open the store, creating the file and schema on first use
pub fn initialize_store(config: &ApiConfig) -> anyhow::Result<Arc<SqliteTransactionStore>> {
    let db_path = get_db_path(config)?;
    let store = SqliteTransactionStore::open(&db_path)?;
    tracing::info!("Database initialized at: {:?}", db_path);
    Ok(Arc::new(store))
}
