use super::{GatewayRequest, LlmProvider, ProviderReply};
use crate::error::{ToolError, ToolResult};
use crate::tools::ToolDefinition;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini `generateContent` with function calling
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            anyhow::bail!("Gemini API key is empty");
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for Gemini")?;

        Ok(Self {
            http,
            api_key,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GatewayRequest) -> ToolResult<ProviderReply> {
        let body = GenerateContentRequest::from_gateway(request);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!("Gemini returned {}: {}", status, text);
            return Err(ToolError::UpstreamUnavailable(format!(
                "LLM provider returned {}: {}",
                status,
                provider_error_message(&text)
            )));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            ToolError::UpstreamUnavailable(format!("Malformed response from LLM provider: {}", e))
        })?;

        parse_reply(parsed)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content,
    contents: Vec<Content>,
    tools: Vec<ToolDeclarations<'a>>,
    tool_config: ToolConfig,
    generation_config: GenerationConfig,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_gateway(request: &'a GatewayRequest) -> Self {
        Self {
            system_instruction: Content {
                role: None,
                parts: vec![Part::text(&request.system_prompt)],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(&request.message)],
            }],
            tools: vec![ToolDeclarations {
                function_declarations: &request.tools,
            }],
            tool_config: ToolConfig {
                function_calling_config: FunctionCallingConfig { mode: "AUTO" },
            },
            generation_config: GenerationConfig {
                temperature: 0.1,
                top_p: 0.8,
                top_k: 40,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolDeclarations<'a> {
    function_declarations: &'a [ToolDefinition],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolConfig {
    function_calling_config: FunctionCallingConfig,
}

#[derive(Debug, Serialize)]
struct FunctionCallingConfig {
    mode: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

fn parse_reply(response: GenerateContentResponse) -> ToolResult<ProviderReply> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(ToolError::UpstreamUnavailable(format!(
            "LLM provider returned no answer ({})",
            reason
        )));
    };

    let finish_reason = candidate.finish_reason.unwrap_or_default();
    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

    let mut texts = Vec::new();
    for part in parts {
        if let Some(call) = part.function_call {
            let args = match call.args {
                Value::Null => Value::Object(Default::default()),
                args => args,
            };
            return Ok(ProviderReply::FunctionCall {
                name: call.name,
                args,
            });
        }
        if let Some(text) = part.text {
            texts.push(text);
        }
    }

    let text = texts.join("").trim().to_string();
    if text.is_empty() {
        return Err(ToolError::UpstreamUnavailable(format!(
            "LLM provider returned neither a function call nor text (finish reason: {})",
            if finish_reason.is_empty() { "unknown" } else { finish_reason.as_str() }
        )));
    }

    Ok(ProviderReply::Text(text))
}

fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tool_definitions;
    use serde_json::json;

    fn reply(raw: Value) -> ToolResult<ProviderReply> {
        parse_reply(serde_json::from_value(raw).unwrap())
    }

    #[test]
    fn test_request_body_shape() {
        let request = GatewayRequest {
            system_prompt: "You keep accounts".to_string(),
            message: "I sold 10kg tomatoes for 1200 today".to_string(),
            tools: tool_definitions(),
        };

        let body = serde_json::to_value(GenerateContentRequest::from_gateway(&request)).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You keep accounts");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(
            body["contents"][0]["parts"][0]["text"],
            "I sold 10kg tomatoes for 1200 today"
        );
        assert_eq!(
            body["tools"][0]["functionDeclarations"].as_array().unwrap().len(),
            4
        );
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "add_transaction"
        );
        assert_eq!(body["toolConfig"]["functionCallingConfig"]["mode"], "AUTO");
        assert_eq!(body["generationConfig"]["topK"], 40);
    }

    #[test]
    fn test_function_call_reply() {
        let parsed = reply(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{
                        "functionCall": {
                            "name": "add_transaction",
                            "args": {"amount": 1200, "type": "income", "sub_type": "crop_sale"}
                        }
                    }]
                },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_eq!(
            parsed,
            ProviderReply::FunctionCall {
                name: "add_transaction".to_string(),
                args: json!({"amount": 1200, "type": "income", "sub_type": "crop_sale"}),
            }
        );
    }

    #[test]
    fn test_text_reply_and_missing_args() {
        let parsed = reply(json!({
            "candidates": [{
                "content": {"parts": [{"text": "Namaste! "}, {"text": "How can I help?"}]}
            }]
        }))
        .unwrap();
        assert_eq!(parsed, ProviderReply::Text("Namaste! How can I help?".to_string()));

        let parsed = reply(json!({
            "candidates": [{
                "content": {"parts": [{"functionCall": {"name": "get_transaction"}}]}
            }]
        }))
        .unwrap();
        assert_eq!(
            parsed,
            ProviderReply::FunctionCall {
                name: "get_transaction".to_string(),
                args: json!({}),
            }
        );
    }

    #[test]
    fn test_empty_replies_are_upstream_failures() {
        let err = reply(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap_err();
        assert!(matches!(err, ToolError::UpstreamUnavailable(ref m) if m.contains("SAFETY")));

        let err = reply(json!({
            "candidates": [{"content": {"parts": []}, "finishReason": "MAX_TOKENS"}]
        }))
        .unwrap_err();
        assert!(matches!(err, ToolError::UpstreamUnavailable(ref m) if m.contains("MAX_TOKENS")));
    }

    #[test]
    fn test_provider_error_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(provider_error_message(body), "API key not valid");
        assert_eq!(provider_error_message("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn test_client_requires_key() {
        assert!(GeminiClient::new("  ", Duration::from_secs(5)).is_err());

        let client = GeminiClient::new("key", Duration::from_secs(5))
            .unwrap()
            .with_model("gemini-2.5-flash")
            .with_base_url("http://localhost:8089/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:8089/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(client.model(), "gemini-2.5-flash");
    }
}
