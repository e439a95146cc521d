use crate::error::status_for;
use crate::state::AppState;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use khata_types::ProcessMessageRequest;

/// Entry point for natural language messages
pub async fn process_message(
    state: web::Data<AppState>,
    request: web::Json<ProcessMessageRequest>,
) -> HttpResponse {
    let request = request.into_inner();
    tracing::info!(
        "Processing message for user {} / client {}",
        request.user_id,
        request.client_id
    );

    let response = state.agent.process_message(request).await;

    let status = match response.error_kind {
        Some(kind) if !response.success => status_for(kind),
        _ => StatusCode::OK,
    };
    tracing::info!("Response ({}): {}", status.as_u16(), response.message);

    HttpResponse::build(status).json(response)
}
