//! Gateway to the language model that picks a tool for each message.

pub mod gemini;
pub mod prompt;
pub mod scripted;

pub use gemini::{GeminiClient, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
pub use prompt::build_system_prompt;
pub use scripted::ScriptedProvider;

use crate::error::ToolResult;
use crate::tools::ToolDefinition;
use async_trait::async_trait;
use serde_json::Value;

/// One classification request: instructions, the user's words and the tools on offer
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub system_prompt: String,
    pub message: String,
    pub tools: Vec<ToolDefinition>,
}

/// What the model decided to do with a message
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderReply {
    FunctionCall { name: String, args: Value },
    Text(String),
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier, for logs
    fn model(&self) -> &str;

    /// Fails with `UpstreamUnavailable` when the provider cannot be reached
    /// or answers with something that is neither a function call nor text
    async fn generate(&self, request: &GatewayRequest) -> ToolResult<ProviderReply>;
}
