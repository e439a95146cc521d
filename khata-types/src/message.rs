use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Natural language message sent by a user
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProcessMessageRequest {
    pub user_id: String,
    pub client_id: String,
    pub message: String,
}

/// Failure classes reported back to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    AmbiguousSelector,
    UnknownTool,
    UpstreamUnavailable,
    InvalidFilter,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::AmbiguousSelector => "AmbiguousSelector",
            ErrorKind::UnknownTool => "UnknownTool",
            ErrorKind::UpstreamUnavailable => "UpstreamUnavailable",
            ErrorKind::InvalidFilter => "InvalidFilter",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of processing one message
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
    #[ts(type = "any")]
    pub data: Option<serde_json::Value>,
    pub tool_called: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl MessageResponse {
    pub fn success(
        message: impl Into<String>,
        data: Option<serde_json::Value>,
        tool_called: Option<String>,
    ) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            tool_called,
            error_kind: None,
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>, tool_called: Option<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            tool_called,
            error_kind: Some(kind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Up,
    Down,
}

/// Response for the health endpoint
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct HealthResponse {
    pub status: String,
    pub database: DatabaseStatus,
}

/// Query for listing transactions without going through the assistant
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct TransactionFilterQuery {
    pub user_id: String,
    pub client_id: String,
    pub filter: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
}

/// Identifies the scope for direct transaction routes
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ScopeQuery {
    pub user_id: String,
    pub client_id: String,
}

/// Request to overwrite the amount of one transaction
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateAmountRequest {
    pub user_id: String,
    pub client_id: String,
    pub amount: f64,
}

/// Outcome of a direct update or delete
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ActionResponse {
    pub status: String,
    pub message: String,
}
