use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", get(list_purchases).post(create_purchase))
}

pub async fn create_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::PurchaseRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let input = match body.into_input(Utc::now()) {
        Ok(i) => i,
        Err(e) => return errors::domain_error_to_response(e),
    };

    // The store reports an unknown product through its referential check.
    match services.stock.record_purchase(input).await {
        Ok(purchase) => (StatusCode::CREATED, Json(purchase)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_purchases(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.stock.list_purchases().await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
