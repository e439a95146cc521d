use khata_types::ErrorKind;

pub type ToolResult<T> = Result<T, ToolError>;

/// Every way a message can fail between the gateway and the store
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Selector matches {count} transactions; name the transaction id or ask for the latest one")]
    AmbiguousSelector { count: usize },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("{0}")]
    UpstreamUnavailable(String),

    #[error("{0}")]
    InvalidFilter(String),

    #[error("Database error: {0}")]
    Storage(String),
}

impl ToolError {
    pub fn validation(message: impl Into<String>) -> Self {
        ToolError::Validation(message.into())
    }

    pub fn invalid_filter(message: impl Into<String>) -> Self {
        ToolError::InvalidFilter(message.into())
    }

    pub fn not_found() -> Self {
        ToolError::NotFound("Transaction not found".to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::Validation(_) => ErrorKind::ValidationError,
            ToolError::NotFound(_) => ErrorKind::NotFound,
            ToolError::AmbiguousSelector { .. } => ErrorKind::AmbiguousSelector,
            ToolError::UnknownTool(_) => ErrorKind::UnknownTool,
            ToolError::UpstreamUnavailable(_) | ToolError::Storage(_) => {
                ErrorKind::UpstreamUnavailable
            }
            ToolError::InvalidFilter(_) => ErrorKind::InvalidFilter,
        }
    }
}

impl From<rusqlite::Error> for ToolError {
    fn from(err: rusqlite::Error) -> Self {
        ToolError::Storage(err.to_string())
    }
}

impl From<r2d2::Error> for ToolError {
    fn from(err: r2d2::Error) -> Self {
        ToolError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        ToolError::UpstreamUnavailable(format!("LLM provider unreachable: {}", err))
    }
}
