use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

/// Direction of money for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transaction type '{0}', expected 'income' or 'expense'")]
pub struct ParseTransactionTypeError(pub String);

impl FromStr for TransactionType {
    type Err = ParseTransactionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            _ => Err(ParseTransactionTypeError(s.to_string())),
        }
    }
}

/// The (user, client) pair every read and write is confined to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
pub struct Scope {
    pub user_id: String,
    pub client_id: String,
}

impl Scope {
    pub fn new(user_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            client_id: client_id.into(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user_id, self.client_id)
    }
}

/// A persisted income or expense record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Transaction {
    pub id: i64,
    pub client_id: String,
    pub user_id: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub sub_type: Option<String>,
    pub whom_to_paid: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Amount with income positive and expense negative
    pub fn signed_amount(&self) -> f64 {
        match self.transaction_type {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }
}

/// Fields supplied when recording a new transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct NewTransaction {
    pub amount: f64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub sub_type: Option<String>,
    pub whom_to_paid: Option<String>,
}

/// Mutable fields of an existing transaction; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
pub struct TransactionChanges {
    pub amount: Option<f64>,
    pub sub_type: Option<String>,
    pub whom_to_paid: Option<String>,
}

impl TransactionChanges {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.sub_type.is_none() && self.whom_to_paid.is_none()
    }
}

/// Income, expense and net balance over a calendar month
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BalanceResponse {
    pub status: String,
    pub month: String,
    pub income: f64,
    pub expense: f64,
    pub net_balance: f64,
}
