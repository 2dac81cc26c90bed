use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;

use storefront_auth::Permission;
use storefront_infra::{InventoryLedger, ServiceError};
use storefront_inventory::InventoryRecord;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/:product_id", get(get_stock).put(upsert_stock))
}

pub async fn upsert_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(product_id): Path<String>,
    Query(query): Query<dto::VariantQuery>,
    Json(body): Json<dto::UpsertInventoryRequest>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&principal, &Permission::INVENTORY_MANAGE) {
        return errors::forbidden(e);
    }

    let key = match dto::parse_stock_key(&product_id, query.variant_id.as_deref()) {
        Ok(k) => k,
        Err(resp) => return resp,
    };

    let record = match InventoryRecord::new(
        key,
        body.quantity,
        body.low_stock_threshold,
        body.track_inventory,
        body.allow_backorder,
        Utc::now(),
    ) {
        Ok(r) => r,
        Err(e) => return errors::service_error_to_response(e.into()),
    };

    match services.backends.ledger.upsert(record).await {
        Ok(saved) => {
            tracing::info!(key = %saved.key, quantity = saved.quantity, "inventory row upserted");
            Json(dto::inventory_to_json(saved)).into_response()
        }
        Err(e) => errors::service_error_to_response(e.into()),
    }
}

pub async fn get_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(product_id): Path<String>,
    Query(query): Query<dto::VariantQuery>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&principal, &Permission::INVENTORY_MANAGE) {
        return errors::forbidden(e);
    }

    let key = match dto::parse_stock_key(&product_id, query.variant_id.as_deref()) {
        Ok(k) => k,
        Err(resp) => return resp,
    };

    match services.backends.ledger.get(key).await {
        Ok(Some(record)) => Json(dto::inventory_to_json(record)).into_response(),
        Ok(None) => errors::service_error_to_response(ServiceError::NotFound),
        Err(e) => errors::service_error_to_response(e.into()),
    }
}
