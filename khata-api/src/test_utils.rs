use crate::handlers;
use crate::state::AppState;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use khata_agents::storage::{TransactionQuery, TransactionStore};
use khata_agents::{
    ScriptedProvider, SqliteTransactionStore, ToolError, ToolResult, TransactionAgent,
    TransactionToolExecutor,
};
use khata_types::{NewTransaction, Scope, Transaction, TransactionChanges};
use std::sync::Arc;

fn app_with(
    provider: Arc<ScriptedProvider>,
    store: Arc<dyn TransactionStore>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let executor = Arc::new(TransactionToolExecutor::new(store));
    let agent = TransactionAgent::new(provider, executor);

    App::new()
        .app_data(web::Data::new(AppState::new(agent)))
        .configure(handlers::configure)
}

/// App over a fresh in-memory store; the store is returned for seeding and checks
pub fn setup_test_app(
    provider: Arc<ScriptedProvider>,
) -> (
    App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    >,
    Arc<SqliteTransactionStore>,
) {
    let store = Arc::new(SqliteTransactionStore::in_memory().expect("in-memory store"));
    (app_with(provider, store.clone()), store)
}

/// App whose store fails every call
pub fn setup_failing_app() -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    app_with(Arc::new(ScriptedProvider::new()), Arc::new(UnavailableStore))
}

struct UnavailableStore;

fn unavailable() -> ToolError {
    ToolError::Storage("database is locked".to_string())
}

#[async_trait]
impl TransactionStore for UnavailableStore {
    async fn create(
        &self,
        _scope: &Scope,
        _transaction: NewTransaction,
        _created_at: DateTime<Utc>,
    ) -> ToolResult<Transaction> {
        Err(unavailable())
    }

    async fn get(&self, _scope: &Scope, _id: i64) -> ToolResult<Option<Transaction>> {
        Err(unavailable())
    }

    async fn list(&self, _scope: &Scope, _query: &TransactionQuery) -> ToolResult<Vec<Transaction>> {
        Err(unavailable())
    }

    async fn update(
        &self,
        _scope: &Scope,
        _id: i64,
        _changes: &TransactionChanges,
    ) -> ToolResult<Option<Transaction>> {
        Err(unavailable())
    }

    async fn delete(&self, _scope: &Scope, _id: i64) -> ToolResult<Option<Transaction>> {
        Err(unavailable())
    }

    async fn ping(&self) -> ToolResult<()> {
        Err(unavailable())
    }
}
