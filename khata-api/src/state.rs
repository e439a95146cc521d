use khata_agents::{TransactionAgent, TransactionToolExecutor};
use std::sync::Arc;

/// Shared by every worker; built once in `main`
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<TransactionAgent>,
}

impl AppState {
    pub fn new(agent: TransactionAgent) -> Self {
        Self {
            agent: Arc::new(agent),
        }
    }

    pub fn executor(&self) -> &TransactionToolExecutor {
        self.agent.executor()
    }
}
