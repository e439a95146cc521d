use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use khata_agents::ToolError;
use khata_types::{ErrorKind, MessageResponse};
use std::fmt;

/// Status code for each failure class
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::ValidationError | ErrorKind::InvalidFilter => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AmbiguousSelector => StatusCode::CONFLICT,
        ErrorKind::UnknownTool => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Error for every route; renders as a `success: false` message response
#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        status_for(self.kind)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(MessageResponse::failure(self.kind, self.message.clone(), None))
    }
}

impl From<ToolError> for ApiError {
    fn from(err: ToolError) -> Self {
        let kind = err.kind();
        if kind == ErrorKind::UpstreamUnavailable {
            tracing::error!("Request failed: {}", err);
        }
        Self::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::ValidationError), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::InvalidFilter), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::AmbiguousSelector), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::UnknownTool), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status_for(ErrorKind::UpstreamUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[actix_web::test]
    async fn test_error_body_is_structured() {
        let err = ApiError::from(ToolError::not_found());
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error_kind"], "NotFound");
        assert_eq!(json["message"], "Transaction not found");
        assert!(json["data"].is_null());
        assert!(json["tool_called"].is_null());
    }
}
