pub mod definitions;
pub mod executor;
pub mod types;

pub use definitions::{tool_definitions, ToolDefinition};
pub use executor::{format_amount, ToolOutcome, TransactionToolExecutor};
pub use types::{
    AddTransactionArgs, DeleteTransactionArgs, GetTransactionArgs, TransactionSelector,
    UpdateTransactionArgs,
};

use crate::error::{ToolError, ToolResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    AddTransaction,
    GetTransaction,
    UpdateTransaction,
    DeleteTransaction,
}

impl ToolName {
    pub const ALL: [ToolName; 4] = [
        ToolName::AddTransaction,
        ToolName::GetTransaction,
        ToolName::UpdateTransaction,
        ToolName::DeleteTransaction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::AddTransaction => "add_transaction",
            ToolName::GetTransaction => "get_transaction",
            ToolName::UpdateTransaction => "update_transaction",
            ToolName::DeleteTransaction => "delete_transaction",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolName::AddTransaction => {
                "Record a new income or expense transaction for the user"
            }
            ToolName::GetTransaction => {
                "List the user's transactions, most recent first, optionally filtered by type, category, counterparty, date or amount"
            }
            ToolName::UpdateTransaction => {
                "Change the amount, category or counterparty of one existing transaction"
            }
            ToolName::DeleteTransaction => "Delete one existing transaction",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

/// A function call from the model, decoded into the arguments of one tool
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    Add(AddTransactionArgs),
    Get(GetTransactionArgs),
    Update(UpdateTransactionArgs),
    Delete(DeleteTransactionArgs),
}

impl ToolCall {
    pub fn name(&self) -> ToolName {
        match self {
            ToolCall::Add(_) => ToolName::AddTransaction,
            ToolCall::Get(_) => ToolName::GetTransaction,
            ToolCall::Update(_) => ToolName::UpdateTransaction,
            ToolCall::Delete(_) => ToolName::DeleteTransaction,
        }
    }

    pub fn from_function_call(name: &str, args: Value) -> ToolResult<Self> {
        let tool: ToolName = name.parse()?;
        let args = match args {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        Ok(match tool {
            ToolName::AddTransaction => ToolCall::Add(parse_args(tool, args)?),
            ToolName::GetTransaction => ToolCall::Get(parse_args(tool, args)?),
            ToolName::UpdateTransaction => ToolCall::Update(parse_args(tool, args)?),
            ToolName::DeleteTransaction => ToolCall::Delete(parse_args(tool, args)?),
        })
    }
}

fn parse_args<T: DeserializeOwned>(tool: ToolName, args: Value) -> ToolResult<T> {
    serde_json::from_value(args)
        .map_err(|e| ToolError::validation(format!("Invalid arguments for {}: {}", tool, e)))
}
