pub mod health;
pub mod messages;
pub mod transactions;

use crate::error::ApiError;
use actix_web::web;

/// Registers every route plus extractor error handlers that answer in the
/// same `success: false` shape as the message endpoint
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| ApiError::validation(err.to_string()).into()),
    )
    .route("/", web::get().to(health::index))
    .route("/health", web::get().to(health::health))
    .route(
        "/llm/transaction-message",
        web::post().to(messages::process_message),
    )
    .route(
        "/transactions_by_filter",
        web::get().to(transactions::list_by_filter),
    )
    .route("/balance", web::get().to(transactions::balance))
    .route(
        "/transaction/{id}",
        web::delete().to(transactions::delete_transaction),
    )
    .route(
        "/transaction/{id}",
        web::put().to(transactions::update_amount),
    );
}
