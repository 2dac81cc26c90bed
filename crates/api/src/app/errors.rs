use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use storefront_auth::AuthzError;
use storefront_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        ServiceError::Forbidden => json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden"),
        ServiceError::InvalidTransition(msg) => {
            json_error(StatusCode::CONFLICT, "invalid_transition", msg)
        }
        ServiceError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        ServiceError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        ServiceError::OutOfStock => stock_error("OUT_OF_STOCK", "product is out of stock", 0),
        ServiceError::InsufficientStock {
            available,
            requested,
        } => stock_error(
            "INSUFFICIENT_STOCK",
            format!("only {available} left in stock ({requested} requested)"),
            available,
        ),
        ServiceError::Internal(msg) => {
            tracing::error!(error = %msg, "request failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error",
            )
        }
    }
}

pub fn forbidden(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Cart rejections carry the quantity the shopper could still take.
fn stock_error(
    code: &'static str,
    message: impl Into<String>,
    available_quantity: i64,
) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
            "available_quantity": available_quantity,
        })),
    )
        .into_response()
}
