use crate::state::AppState;
use actix_web::{web, HttpResponse};
use khata_agents::TransactionStore;
use khata_types::{DatabaseStatus, HealthResponse};

pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Khata finance assistant API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    match state.executor().store().ping().await {
        Ok(()) => HttpResponse::Ok().json(HealthResponse {
            status: "healthy".to_string(),
            database: DatabaseStatus::Up,
        }),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: "unhealthy".to_string(),
                database: DatabaseStatus::Down,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{setup_failing_app, setup_test_app};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use khata_agents::ScriptedProvider;
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_index() {
        let app = test::init_service(setup_test_app(Arc::new(ScriptedProvider::new())).0).await;
        let req = test::TestRequest::get().uri("/").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "running");
    }

    #[actix_web::test]
    async fn test_health_up() {
        let app = test::init_service(setup_test_app(Arc::new(ScriptedProvider::new())).0).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "up");
    }

    #[actix_web::test]
    async fn test_health_down() {
        let app = test::init_service(setup_failing_app()).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["database"], "down");
    }
}
