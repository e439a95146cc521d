use super::{GatewayRequest, LlmProvider, ProviderReply};
use crate::error::{ToolError, ToolResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Replays queued replies in order, for tests and offline demos.
///
/// Every request it receives is kept so callers can inspect the prompt and
/// tool declarations that would have gone to a real model.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ToolResult<ProviderReply>>>,
    requests: Mutex<Vec<GatewayRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_function_call(&self, name: &str, args: Value) -> &Self {
        self.push(Ok(ProviderReply::FunctionCall {
            name: name.to_string(),
            args,
        }))
    }

    pub fn push_text(&self, text: &str) -> &Self {
        self.push(Ok(ProviderReply::Text(text.to_string())))
    }

    pub fn push_error(&self, error: ToolError) -> &Self {
        self.push(Err(error))
    }

    pub fn requests(&self) -> Vec<GatewayRequest> {
        lock(&self.requests).clone()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }

    fn push(&self, reply: ToolResult<ProviderReply>) -> &Self {
        lock(&self.replies).push_back(reply);
        self
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GatewayRequest) -> ToolResult<ProviderReply> {
        lock(&self.requests).push(request.clone());
        lock(&self.replies).pop_front().unwrap_or_else(|| {
            Err(ToolError::UpstreamUnavailable(
                "Scripted provider has no replies left".to_string(),
            ))
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(message: &str) -> GatewayRequest {
        GatewayRequest {
            system_prompt: String::new(),
            message: message.to_string(),
            tools: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_replays_in_order_then_runs_dry() {
        let provider = ScriptedProvider::new();
        provider
            .push_text("hello")
            .push_function_call("get_transaction", json!({}));

        assert_eq!(
            provider.generate(&request("hi")).await.unwrap(),
            ProviderReply::Text("hello".to_string())
        );
        assert!(matches!(
            provider.generate(&request("list")).await.unwrap(),
            ProviderReply::FunctionCall { ref name, .. } if name == "get_transaction"
        ));

        let err = provider.generate(&request("again")).await.unwrap_err();
        assert!(matches!(err, ToolError::UpstreamUnavailable(_)));

        let seen: Vec<_> = provider.requests().into_iter().map(|r| r.message).collect();
        assert_eq!(seen, vec!["hi", "list", "again"]);
        assert_eq!(provider.remaining(), 0);
    }
}
