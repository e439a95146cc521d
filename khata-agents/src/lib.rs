pub mod agent;
pub mod error;
pub mod filters;
pub mod llm;
pub mod storage;
pub mod tools;

pub use agent::TransactionAgent;
pub use error::{ToolError, ToolResult};
pub use llm::{GeminiClient, LlmProvider, ScriptedProvider};
pub use storage::{SqliteTransactionStore, TransactionQuery, TransactionStore};
pub use tools::{ToolCall, ToolName, TransactionToolExecutor};
