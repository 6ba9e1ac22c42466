use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;

use stockledger_core::DomainError;
use stockledger_infra::ServiceError;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", get(list_sales).post(create_sale))
}

pub async fn create_sale(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::SaleRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let input = match body.into_input(Utc::now()) {
        Ok(i) => i,
        Err(e) => return errors::domain_error_to_response(e),
    };

    // Unknown products would otherwise be rejected as out of stock.
    match services.stock.get_product(input.product).await {
        Ok(_) => {}
        Err(ServiceError::Domain(DomainError::NotFound)) => {
            return errors::domain_error_to_response(DomainError::unknown_reference(format!(
                "product {} does not exist",
                input.product
            )));
        }
        Err(e) => return errors::service_error_to_response(e),
    }

    match services.stock.check_and_admit(input).await {
        Ok(sale) => (StatusCode::CREATED, Json(sale)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_sales(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.stock.list_sales().await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
