use axum::{Router, routing::get};

pub mod auth;
pub mod inventory;
pub mod products;
pub mod purchases;
pub mod sales;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/products", products::router())
        .nest("/purchases", purchases::router())
        .nest("/sales", sales::router())
        .nest("/inventory", inventory::router())
}
