use crate::error::ApiError;
use crate::state::AppState;
use actix_web::{web, HttpResponse, Result as ActixResult};
use chrono::Local;
use khata_agents::tools::{
    DeleteTransactionArgs, GetTransactionArgs, TransactionSelector, UpdateTransactionArgs,
};
use khata_agents::ToolError;
use khata_types::{
    ActionResponse, Scope, ScopeQuery, TransactionFilterQuery, TransactionType,
    UpdateAmountRequest,
};

fn scope_of(user_id: &str, client_id: &str) -> Result<Scope, ApiError> {
    if user_id.trim().is_empty() {
        return Err(ApiError::validation("user_id is required"));
    }
    if client_id.trim().is_empty() {
        return Err(ApiError::validation("client_id is required"));
    }
    Ok(Scope::new(user_id.trim(), client_id.trim()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn by_id(id: i64) -> TransactionSelector {
    TransactionSelector {
        transaction_id: Some(id),
        ..Default::default()
    }
}

/// GET /transactions_by_filter
pub async fn list_by_filter(
    state: web::Data<AppState>,
    query: web::Query<TransactionFilterQuery>,
) -> ActixResult<HttpResponse> {
    let query = query.into_inner();
    let scope = scope_of(&query.user_id, &query.client_id)?;

    let filter = non_blank(query.filter);
    let start_date = non_blank(query.start_date);
    let end_date = non_blank(query.end_date);
    if filter.is_none() && (start_date.is_none() || end_date.is_none()) {
        return Err(ApiError::from(ToolError::invalid_filter(
            "You must provide either a filter or both start_date and end_date",
        ))
        .into());
    }

    let transaction_type = query
        .transaction_type
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(str::parse::<TransactionType>)
        .transpose()
        .map_err(|e| ApiError::from(ToolError::invalid_filter(e.to_string())))?;

    let args = GetTransactionArgs {
        transaction_type,
        date_filter: filter,
        start_date,
        end_date,
        ..Default::default()
    };

    let transactions = state
        .executor()
        .list_at(&scope, &args, &Local::now())
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(transactions))
}

/// GET /balance
pub async fn balance(
    state: web::Data<AppState>,
    query: web::Query<ScopeQuery>,
) -> ActixResult<HttpResponse> {
    let scope = scope_of(&query.user_id, &query.client_id)?;

    let balance = state
        .executor()
        .monthly_balance_at(&scope, &Local::now())
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(balance))
}

/// DELETE /transaction/{id}
pub async fn delete_transaction(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<ScopeQuery>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    let scope = scope_of(&query.user_id, &query.client_id)?;

    let args = DeleteTransactionArgs { selector: by_id(id) };
    state
        .executor()
        .delete(&scope, args, &Local::now())
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(ActionResponse {
        status: "success".to_string(),
        message: "Transaction deleted successfully.".to_string(),
    }))
}

/// PUT /transaction/{id}
pub async fn update_amount(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    request: web::Json<UpdateAmountRequest>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    let request = request.into_inner();
    let scope = scope_of(&request.user_id, &request.client_id)?;

    let args = UpdateTransactionArgs {
        selector: by_id(id),
        amount: Some(request.amount),
        ..Default::default()
    };
    state
        .executor()
        .update(&scope, args, &Local::now())
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(ActionResponse {
        status: "success".to_string(),
        message: "Transaction updated successfully.".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::setup_test_app;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use chrono::{Duration, Utc};
    use khata_agents::storage::TransactionStore;
    use khata_agents::ScriptedProvider;
    use khata_types::{NewTransaction, Scope, TransactionType};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn expense(amount: f64, sub_type: &str) -> NewTransaction {
        NewTransaction {
            amount,
            transaction_type: TransactionType::Expense,
            sub_type: Some(sub_type.to_string()),
            whom_to_paid: None,
        }
    }

    #[actix_web::test]
    async fn test_list_by_filter() {
        let (app, store) = setup_test_app(Arc::new(ScriptedProvider::new()));
        let scope = Scope::new("u1", "farmer_app");
        let now = Utc::now();
        store.create(&scope, expense(500.0, "grocery"), now).await.unwrap();
        store
            .create(&scope, expense(90.0, "tea"), now - Duration::days(40))
            .await
            .unwrap();
        store
            .create(&Scope::new("u2", "farmer_app"), expense(10.0, "tea"), now)
            .await
            .unwrap();
        let app = test::init_service(app).await;

        let req = test::TestRequest::get()
            .uri("/transactions_by_filter?user_id=u1&client_id=farmer_app&filter=today&type=expense")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["sub_type"], "grocery");
        assert_eq!(rows[0]["type"], "expense");
    }

    #[actix_web::test]
    async fn test_list_requires_filter_or_range() {
        let (app, _store) = setup_test_app(Arc::new(ScriptedProvider::new()));
        let app = test::init_service(app).await;

        for uri in [
            "/transactions_by_filter?user_id=u1&client_id=farmer_app",
            "/transactions_by_filter?user_id=u1&client_id=farmer_app&start_date=2026-10-01",
            "/transactions_by_filter?user_id=u1&client_id=farmer_app&start_date=&end_date=",
            "/transactions_by_filter?user_id=u1&client_id=farmer_app&filter=%20&start_date=2026-10-01&end_date=%20",
            "/transactions_by_filter?user_id=u1&client_id=farmer_app&filter=someday",
            "/transactions_by_filter?user_id=u1&client_id=farmer_app&filter=today&type=loan",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);

            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error_kind"], "InvalidFilter", "{}", uri);
        }
    }

    #[actix_web::test]
    async fn test_list_with_custom_range() {
        let (app, store) = setup_test_app(Arc::new(ScriptedProvider::new()));
        let scope = Scope::new("u1", "farmer_app");
        let now = Utc::now();
        store.create(&scope, expense(40.0, "seeds"), now).await.unwrap();
        let app = test::init_service(app).await;

        let start = (now - Duration::days(2)).format("%Y-%m-%d");
        let end = (now + Duration::days(2)).format("%Y-%m-%d");
        let req = test::TestRequest::get()
            .uri(&format!(
                "/transactions_by_filter?user_id=u1&client_id=farmer_app&start_date={start}&end_date={end}"
            ))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_balance() {
        let (app, store) = setup_test_app(Arc::new(ScriptedProvider::new()));
        let scope = Scope::new("u1", "farmer_app");
        store
            .create(
                &scope,
                NewTransaction {
                    amount: 1200.0,
                    transaction_type: TransactionType::Income,
                    sub_type: Some("crop_sale".to_string()),
                    whom_to_paid: None,
                },
                Utc::now(),
            )
            .await
            .unwrap();
        store.create(&scope, expense(450.5, "fertilizer"), Utc::now()).await.unwrap();
        let app = test::init_service(app).await;

        let req = test::TestRequest::get()
            .uri("/balance?user_id=u1&client_id=farmer_app")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["income"], 1200.0);
        assert_eq!(body["expense"], 450.5);
        assert_eq!(body["net_balance"], 749.5);
        assert!(body["month"].as_str().unwrap().contains(' '));
    }

    #[actix_web::test]
    async fn test_update_amount() {
        let (app, store) = setup_test_app(Arc::new(ScriptedProvider::new()));
        let scope = Scope::new("u1", "farmer_app");
        let created = store.create(&scope, expense(500.0, "grocery"), Utc::now()).await.unwrap();
        let app = test::init_service(app).await;

        let req = test::TestRequest::put()
            .uri(&format!("/transaction/{}", created.id))
            .set_json(json!({"user_id": "u1", "client_id": "farmer_app", "amount": 600}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "Transaction updated successfully.");

        let updated = store.get(&scope, created.id).await.unwrap().unwrap();
        assert_eq!(updated.amount, 600.0);
        assert_eq!(updated.sub_type.as_deref(), Some("grocery"));

        let req = test::TestRequest::put()
            .uri(&format!("/transaction/{}", created.id))
            .set_json(json!({"user_id": "u1", "client_id": "farmer_app", "amount": -5}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_delete_then_not_found() {
        let (app, store) = setup_test_app(Arc::new(ScriptedProvider::new()));
        let scope = Scope::new("u1", "farmer_app");
        let created = store.create(&scope, expense(80.0, "tea"), Utc::now()).await.unwrap();
        let app = test::init_service(app).await;

        let uri = format!("/transaction/{}?user_id=u1&client_id=farmer_app", created.id);

        let req = test::TestRequest::delete()
            .uri(&format!("/transaction/{}?user_id=u2&client_id=farmer_app", created.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete().uri(&uri).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Transaction deleted successfully.");

        let req = test::TestRequest::delete().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(store.get(&scope, created.id).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn test_bad_path_and_missing_scope() {
        let (app, _store) = setup_test_app(Arc::new(ScriptedProvider::new()));
        let app = test::init_service(app).await;

        let req = test::TestRequest::delete()
            .uri("/transaction/abc?user_id=u1&client_id=farmer_app")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/balance?user_id=u1").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/balance?user_id=%20&client_id=farmer_app")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "user_id is required");
    }
}
