use axum::{Router, routing::get};

pub mod cart;
pub mod inventory;
pub mod orders;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/orders", orders::router())
        .nest("/inventory", inventory::router())
}

/// Router for endpoints that do not require a bearer token.
pub fn public_router() -> Router {
    Router::new().nest("/cart", cart::router())
}
