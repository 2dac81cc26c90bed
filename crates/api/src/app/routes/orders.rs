use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use storefront_auth::Permission;
use storefront_core::OrderId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(place_order))
        .route("/:id", get(get_order).put(update_order).delete(cancel_order))
}

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::PlaceOrderRequest>,
) -> axum::response::Response {
    let cmd = match body.into_command(principal.user_id()) {
        Ok(cmd) => cmd,
        Err(resp) => return resp,
    };

    match services.engine.place_order(cmd).await {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let access = authz::order_access(&principal, &Permission::ORDERS_READ_ANY);
    match services.engine.list_orders(access).await {
        Ok(orders) => Json(orders).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id: OrderId = match dto::parse_id(&id, "order id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let access = authz::order_access(&principal, &Permission::ORDERS_READ_ANY);
    match services.engine.get_order_details(order_id, access).await {
        Ok(details) => Json(details).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateOrderRequest>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&principal, &Permission::ORDERS_UPDATE) {
        return errors::forbidden(e);
    }

    let order_id: OrderId = match dto::parse_id(&id, "order id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let update = match body.into_update() {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    match services
        .engine
        .transition(order_id, &update, Some(principal.user_id()))
        .await
    {
        Ok(order) => Json(order).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<Json<dto::CancelOrderRequest>>,
) -> axum::response::Response {
    let order_id: OrderId = match dto::parse_id(&id, "order id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let reason = body.and_then(|Json(b)| b.reason);

    let access = authz::order_access(&principal, &Permission::ORDERS_CANCEL_ANY);
    match services
        .engine
        .cancel(order_id, access, Some(principal.user_id()), reason.as_deref())
        .await
    {
        Ok(order) => Json(order).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
