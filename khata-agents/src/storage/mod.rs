pub mod sqlite_storage;

pub use sqlite_storage::SqliteTransactionStore;

use crate::error::ToolResult;
use crate::filters::{AmountPredicate, DateRange};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use khata_types::{NewTransaction, Scope, Transaction, TransactionChanges, TransactionType};

/// Filters for listing transactions inside one scope
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    /// Narrows the listing to one row; not counted by `has_criteria`
    pub id: Option<i64>,
    pub transaction_type: Option<TransactionType>,
    /// Case-insensitive exact match
    pub sub_type: Option<String>,
    /// Case-insensitive exact match
    pub whom_to_paid: Option<String>,
    pub created: Option<DateRange>,
    pub amounts: Vec<AmountPredicate>,
    pub limit: Option<usize>,
}

impl TransactionQuery {
    pub fn recent(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }

    pub fn has_criteria(&self) -> bool {
        self.transaction_type.is_some()
            || self.sub_type.is_some()
            || self.whom_to_paid.is_some()
            || self.created.is_some()
            || !self.amounts.is_empty()
    }
}

/// Owner of persisted transactions.
///
/// Every call is confined to the given scope; a row outside it behaves as if
/// it did not exist. Listings are ordered most recent first, ties broken by
/// descending id.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn create(
        &self,
        scope: &Scope,
        transaction: NewTransaction,
        created_at: DateTime<Utc>,
    ) -> ToolResult<Transaction>;

    async fn get(&self, scope: &Scope, id: i64) -> ToolResult<Option<Transaction>>;

    async fn list(&self, scope: &Scope, query: &TransactionQuery) -> ToolResult<Vec<Transaction>>;

    /// Returns the updated row, or `None` when no row with `id` exists in scope
    async fn update(
        &self,
        scope: &Scope,
        id: i64,
        changes: &TransactionChanges,
    ) -> ToolResult<Option<Transaction>>;

    /// Returns the removed row, or `None` when nothing was deleted
    async fn delete(&self, scope: &Scope, id: i64) -> ToolResult<Option<Transaction>>;

    async fn ping(&self) -> ToolResult<()>;
}
