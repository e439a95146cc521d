use crate::error::{ToolError, ToolResult};
use crate::llm::{build_system_prompt, GatewayRequest, LlmProvider, ProviderReply};
use crate::storage::TransactionQuery;
use crate::tools::{tool_definitions, ToolCall, ToolDefinition, ToolOutcome, TransactionToolExecutor};
use chrono::{DateTime, Local, TimeZone};
use khata_types::{ErrorKind, MessageResponse, ProcessMessageRequest, Scope};
use std::fmt::Display;
use std::sync::Arc;

pub const DEFAULT_RECENT_CONTEXT: usize = 5;

/// Turns one free-text message into at most one tool call and a response
pub struct TransactionAgent {
    provider: Arc<dyn LlmProvider>,
    executor: Arc<TransactionToolExecutor>,
    tools: Vec<ToolDefinition>,
    recent_context: usize,
}

impl TransactionAgent {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        executor: Arc<TransactionToolExecutor>,
    ) -> Self {
        Self {
            provider,
            executor,
            tools: tool_definitions(),
            recent_context: DEFAULT_RECENT_CONTEXT,
        }
    }

    pub fn with_recent_context(mut self, recent_context: usize) -> Self {
        self.recent_context = recent_context;
        self
    }

    pub fn executor(&self) -> &Arc<TransactionToolExecutor> {
        &self.executor
    }

    pub async fn process_message(&self, request: ProcessMessageRequest) -> MessageResponse {
        self.process_message_at(request, &Local::now()).await
    }

    /// Never fails: every error becomes a `success: false` response
    pub async fn process_message_at<Tz>(
        &self,
        request: ProcessMessageRequest,
        now: &DateTime<Tz>,
    ) -> MessageResponse
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let mut tool_called = None;
        let result = self.run(request, now, &mut tool_called).await;

        match result {
            Ok(Reply::Text(text)) => MessageResponse::success(text, None, None),
            Ok(Reply::Tool(outcome)) => {
                MessageResponse::success(outcome.message, Some(outcome.data), tool_called)
            }
            Err(err) => {
                let kind = err.kind();
                match kind {
                    ErrorKind::UpstreamUnavailable => {
                        tracing::error!("Message failed ({}): {}", kind, err)
                    }
                    _ => tracing::warn!("Message rejected ({}): {}", kind, err),
                }
                MessageResponse::failure(kind, err.to_string(), tool_called)
            }
        }
    }

    async fn run<Tz>(
        &self,
        request: ProcessMessageRequest,
        now: &DateTime<Tz>,
        tool_called: &mut Option<String>,
    ) -> ToolResult<Reply>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let user_id = required("user_id", &request.user_id)?;
        let client_id = required("client_id", &request.client_id)?;
        let message = required("message", &request.message)?;
        let scope = Scope::new(user_id, client_id);

        let recent = if self.recent_context > 0 {
            self.executor
                .store()
                .list(&scope, &TransactionQuery::recent(self.recent_context))
                .await?
        } else {
            Vec::new()
        };

        let gateway_request = GatewayRequest {
            system_prompt: build_system_prompt(now, self.executor.currency_symbol(), &recent),
            message: message.to_string(),
            tools: self.tools.clone(),
        };

        tracing::info!(
            "Processing message for {} with {} ({} recent transactions)",
            scope,
            self.provider.model(),
            recent.len()
        );

        match self.provider.generate(&gateway_request).await? {
            ProviderReply::Text(text) => {
                tracing::info!("Model replied without a tool for {}", scope);
                Ok(Reply::Text(text))
            }
            ProviderReply::FunctionCall { name, args } => {
                *tool_called = Some(name.clone());
                let call = ToolCall::from_function_call(&name, args)?;
                tracing::info!("Model chose {} for {}", call.name(), scope);

                let outcome = self.executor.dispatch_at(&scope, call, now).await?;
                Ok(Reply::Tool(outcome))
            }
        }
    }
}

enum Reply {
    Text(String),
    Tool(ToolOutcome),
}

fn required<'a>(field: &str, value: &'a str) -> ToolResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ToolError::validation(format!("{} is required", field)));
    }
    Ok(value)
}
