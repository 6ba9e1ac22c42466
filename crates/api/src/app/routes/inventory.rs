use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(missing_product_id))
        .route("/:id", get(get_ledger))
}

pub async fn missing_product_id() -> axum::response::Response {
    errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "product id is required")
}

/// Chronological purchase/sale rows for one product (`[]` when unknown).
pub async fn get_ledger(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.stock.ledger(id).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
