use super::{TransactionQuery, TransactionStore};
use crate::error::ToolResult;
use crate::filters::{AmountPredicate, AMOUNT_EPSILON};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use khata_types::{NewTransaction, Scope, Transaction, TransactionChanges, TransactionType};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;

const COLUMNS: &str = "id, client_id, user_id, amount, type, sub_type, whom_to_paid, created_at";

/// Create the transactions table and its indexes
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            client_id VARCHAR(50) NOT NULL,
            user_id VARCHAR(50) NOT NULL,
            amount REAL NOT NULL CHECK (amount >= 0),
            type VARCHAR(16) NOT NULL CHECK (type IN ('income', 'expense')),
            sub_type VARCHAR(100),
            whom_to_paid VARCHAR(100),
            created_at BIGINT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_transactions_user_client
            ON transactions(user_id, client_id);
        CREATE INDEX IF NOT EXISTS idx_transactions_created_at
            ON transactions(created_at);",
    )
}

fn init_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

pub struct SqliteTransactionStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteTransactionStore {
    /// Open (or create) the database file and run migrations
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(init_connection);
        let pool = Pool::builder().max_size(8).build(manager)?;

        {
            let conn = pool.get()?;
            run_migrations(&conn)?;
        }

        Ok(Self { pool })
    }

    /// A private database that lives as long as the store
    pub fn in_memory() -> anyhow::Result<Self> {
        // Each in-memory connection is its own database, so keep exactly one
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            init_connection(conn)?;
            run_migrations(conn)
        });
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> ToolResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }
}

fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    let type_str: String = row.get(4)?;
    let transaction_type = type_str
        .parse::<TransactionType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    let created_ms: i64 = row.get(7)?;
    let created_at = DateTime::from_timestamp_millis(created_ms)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(7, created_ms))?;

    Ok(Transaction {
        id: row.get(0)?,
        client_id: row.get(1)?,
        user_id: row.get(2)?,
        amount: row.get(3)?,
        transaction_type,
        sub_type: row.get(5)?,
        whom_to_paid: row.get(6)?,
        created_at,
    })
}

fn push_amount_predicate(sql: &mut String, values: &mut Vec<Value>, predicate: &AmountPredicate) {
    match *predicate {
        AmountPredicate::GreaterThan(v) => {
            sql.push_str(" AND amount > ?");
            values.push(Value::Real(v));
        }
        AmountPredicate::LessThan(v) => {
            sql.push_str(" AND amount < ?");
            values.push(Value::Real(v));
        }
        AmountPredicate::EqualTo(v) => {
            sql.push_str(" AND ABS(amount - ?) < ?");
            values.push(Value::Real(v));
            values.push(Value::Real(AMOUNT_EPSILON));
        }
        AmountPredicate::AtLeast(v) => {
            sql.push_str(" AND amount >= ?");
            values.push(Value::Real(v));
        }
        AmountPredicate::AtMost(v) => {
            sql.push_str(" AND amount <= ?");
            values.push(Value::Real(v));
        }
    }
}

#[async_trait]
impl TransactionStore for SqliteTransactionStore {
    async fn create(
        &self,
        scope: &Scope,
        transaction: NewTransaction,
        created_at: DateTime<Utc>,
    ) -> ToolResult<Transaction> {
        let conn = self.conn()?;

        let created = conn.query_row(
            &format!(
                "INSERT INTO transactions
                 (client_id, user_id, amount, type, sub_type, whom_to_paid, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 RETURNING {COLUMNS}"
            ),
            params![
                &scope.client_id,
                &scope.user_id,
                transaction.amount,
                transaction.transaction_type.as_str(),
                transaction.sub_type.as_deref(),
                transaction.whom_to_paid.as_deref(),
                created_at.timestamp_millis(),
            ],
            row_to_transaction,
        )?;

        tracing::debug!(id = created.id, scope = %scope, "Transaction inserted");
        Ok(created)
    }

    async fn get(&self, scope: &Scope, id: i64) -> ToolResult<Option<Transaction>> {
        let conn = self.conn()?;

        let transaction = conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM transactions
                     WHERE id = ? AND user_id = ? AND client_id = ?"
                ),
                params![id, &scope.user_id, &scope.client_id],
                row_to_transaction,
            )
            .optional()?;

        Ok(transaction)
    }

    async fn list(&self, scope: &Scope, query: &TransactionQuery) -> ToolResult<Vec<Transaction>> {
        let mut sql = format!(
            "SELECT {COLUMNS} FROM transactions WHERE user_id = ? AND client_id = ?"
        );
        let mut values = vec![
            Value::Text(scope.user_id.clone()),
            Value::Text(scope.client_id.clone()),
        ];

        if let Some(id) = query.id {
            sql.push_str(" AND id = ?");
            values.push(Value::Integer(id));
        }

        if let Some(transaction_type) = query.transaction_type {
            sql.push_str(" AND type = ?");
            values.push(Value::Text(transaction_type.as_str().to_string()));
        }

        if let Some(sub_type) = &query.sub_type {
            sql.push_str(" AND sub_type = ? COLLATE NOCASE");
            values.push(Value::Text(sub_type.trim().to_string()));
        }

        if let Some(whom_to_paid) = &query.whom_to_paid {
            sql.push_str(" AND whom_to_paid = ? COLLATE NOCASE");
            values.push(Value::Text(whom_to_paid.trim().to_string()));
        }

        if let Some(range) = &query.created {
            sql.push_str(" AND created_at >= ? AND created_at < ?");
            values.push(Value::Integer(range.start.timestamp_millis()));
            values.push(Value::Integer(range.end.timestamp_millis()));
        }

        for predicate in &query.amounts {
            push_amount_predicate(&mut sql, &mut values, predicate);
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(params_from_iter(values.iter()), row_to_transaction)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    async fn update(
        &self,
        scope: &Scope,
        id: i64,
        changes: &TransactionChanges,
    ) -> ToolResult<Option<Transaction>> {
        let conn = self.conn()?;

        let updated = conn
            .query_row(
                &format!(
                    "UPDATE transactions
                     SET amount = COALESCE(?, amount),
                         sub_type = COALESCE(?, sub_type),
                         whom_to_paid = COALESCE(?, whom_to_paid)
                     WHERE id = ? AND user_id = ? AND client_id = ?
                     RETURNING {COLUMNS}"
                ),
                params![
                    changes.amount,
                    changes.sub_type.as_deref(),
                    changes.whom_to_paid.as_deref(),
                    id,
                    &scope.user_id,
                    &scope.client_id,
                ],
                row_to_transaction,
            )
            .optional()?;

        Ok(updated)
    }

    async fn delete(&self, scope: &Scope, id: i64) -> ToolResult<Option<Transaction>> {
        let conn = self.conn()?;

        let deleted = conn
            .query_row(
                &format!(
                    "DELETE FROM transactions
                     WHERE id = ? AND user_id = ? AND client_id = ?
                     RETURNING {COLUMNS}"
                ),
                params![id, &scope.user_id, &scope.client_id],
                row_to_transaction,
            )
            .optional()?;

        Ok(deleted)
    }

    async fn ping(&self) -> ToolResult<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}
