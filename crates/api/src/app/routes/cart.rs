use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use storefront_infra::{ServiceError, add_to_cart_now};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", get(get_cart).post(add_to_cart))
}

pub async fn get_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::CartQuery>,
) -> axum::response::Response {
    let Some(cart_key) = query.cart_key else {
        return errors::service_error_to_response(ServiceError::Validation(
            "cart_key is required".to_string(),
        ));
    };

    match services.carts.get_cart(&cart_key).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add_to_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::AddToCartRequest>,
) -> axum::response::Response {
    let key = match dto::parse_stock_key(&body.product_id, body.variant_id.as_deref()) {
        Ok(k) => k,
        Err(resp) => return resp,
    };

    let cmd = add_to_cart_now(body.cart_key, key.product_id, key.variant_id, body.quantity);
    match services.carts.add_item(cmd).await {
        Ok(addition) => (StatusCode::CREATED, Json(addition)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
