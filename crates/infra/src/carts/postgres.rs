//! Postgres-backed cart store (`cart_items`).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use storefront_cart::CartLine;
use storefront_core::{CartLineId, ProductId, VariantId};

use super::r#trait::CartStore;
use crate::error::{StoreError, map_sqlx_error};

#[derive(Debug, Clone)]
pub struct PostgresCartStore {
    pool: Arc<PgPool>,
}

impl PostgresCartStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl CartStore for PostgresCartStore {
    #[instrument(skip(self), err)]
    async fn lines_for(&self, cart_key: &str) -> Result<Vec<CartLine>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, cart_key, product_id, variant_id, quantity, added_at, updated_at
            FROM cart_items
            WHERE cart_key = $1
            ORDER BY added_at ASC, id ASC
            "#,
        )
        .bind(cart_key)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_cart_items", e))?;

        rows.iter()
            .map(|row| {
                CartRow::from_row(row)
                    .map(CartLine::from)
                    .map_err(|e| map_sqlx_error("decode_cart_item", e))
            })
            .collect()
    }

    #[instrument(skip(self, line), fields(cart_key = %line.cart_key, product_id = %line.product_id), err)]
    async fn merge_line(&self, line: CartLine) -> Result<CartLine, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_key, product_id, variant_id, quantity, added_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (cart_key, product_id, (COALESCE(variant_id, '00000000-0000-0000-0000-000000000000'::uuid)))
            DO UPDATE SET
                quantity = cart_items.quantity + EXCLUDED.quantity,
                updated_at = EXCLUDED.updated_at
            RETURNING id, cart_key, product_id, variant_id, quantity, added_at, updated_at
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(&line.cart_key)
        .bind(line.product_id.as_uuid())
        .bind(line.variant_id.map(|v| *v.as_uuid()))
        .bind(line.quantity)
        .bind(line.added_at)
        .bind(line.updated_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("merge_cart_item", e))?;

        CartRow::from_row(&row)
            .map(CartLine::from)
            .map_err(|e| map_sqlx_error("decode_cart_item", e))
    }
}

#[derive(Debug)]
struct CartRow {
    id: uuid::Uuid,
    cart_key: String,
    product_id: uuid::Uuid,
    variant_id: Option<uuid::Uuid>,
    quantity: i64,
    added_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for CartRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(CartRow {
            id: row.try_get("id")?,
            cart_key: row.try_get("cart_key")?,
            product_id: row.try_get("product_id")?,
            variant_id: row.try_get("variant_id")?,
            quantity: row.try_get("quantity")?,
            added_at: row.try_get("added_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<CartRow> for CartLine {
    fn from(row: CartRow) -> Self {
        CartLine {
            id: CartLineId::from_uuid(row.id),
            cart_key: row.cart_key,
            product_id: ProductId::from_uuid(row.product_id),
            variant_id: row.variant_id.map(VariantId::from_uuid),
            quantity: row.quantity,
            added_at: row.added_at,
            updated_at: row.updated_at,
        }
    }
}
