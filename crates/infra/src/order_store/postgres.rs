//! Postgres-backed order store (`orders` + `order_items`).
//!
//! `update` is a compare-and-set on `orders.version` inside one transaction
//! together with the item fulfillment statuses; a lost race surfaces as
//! `StoreError::Conflict` and nothing is written.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};

use storefront_core::{ExpectedVersion, OrderId, OrderItemId, ProductId, UserId, VariantId};
use storefront_orders::{Order, OrderItem, ShippingAddress, Totals};

use super::r#trait::{OrderFilter, OrderStore};
use crate::error::{StoreError, map_sqlx_error};

#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: Arc<PgPool>,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn load_items(
        &self,
        order_ids: &[uuid::Uuid],
    ) -> Result<HashMap<uuid::Uuid, Vec<OrderItem>>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, variant_id, product_name,
                   quantity, unit_price, fulfillment_status
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_order_items", e))?;

        let mut items: HashMap<uuid::Uuid, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let item = ItemRow::from_row(&row)
                .map_err(|e| map_sqlx_error("decode_order_item", e))?;
            let order_id = item.order_id;
            items.entry(order_id).or_default().push(item.try_into()?);
        }
        Ok(items)
    }
}

#[async_trait::async_trait]
impl OrderStore for PostgresOrderStore {
    #[instrument(skip(self, order), fields(order_id = %order.id), err)]
    async fn insert(&self, mut order: Order) -> Result<Order, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let address = serde_json::to_value(&order.shipping_address)
            .map_err(|e| StoreError::Corrupt(format!("failed to encode shipping address: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, customer_id, customer_name, customer_email,
                status, payment_status, fulfillment_status, currency,
                subtotal, tax, shipping, discount, total,
                shipping_address, tracking_number, shipping_date, delivery_date,
                cancellation_reason, created_at, updated_at, version
            )
            VALUES (
                $1, $2, $3, $4, $5,
                $6, $7, $8, $9,
                $10, $11, $12, $13, $14,
                $15, $16, $17, $18,
                $19, $20, $21, 1
            )
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.order_number)
        .bind(order.customer_id.as_uuid())
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.fulfillment_status.as_str())
        .bind(&order.currency)
        .bind(to_db_amount(order.totals.subtotal)?)
        .bind(to_db_amount(order.totals.tax)?)
        .bind(to_db_amount(order.totals.shipping)?)
        .bind(to_db_amount(order.totals.discount)?)
        .bind(to_db_amount(order.totals.total)?)
        .bind(&address)
        .bind(&order.tracking_number)
        .bind(order.shipping_date)
        .bind(order.delivery_date)
        .bind(&order.cancellation_reason)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, position, product_id, variant_id,
                    product_name, quantity, unit_price, fulfillment_status
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(order.id.as_uuid())
            .bind(position as i32)
            .bind(item.product_id.as_uuid())
            .bind(item.variant_id.map(|v| *v.as_uuid()))
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(to_db_amount(item.unit_price)?)
            .bind(item.fulfillment_status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_item", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        order.version = 1;
        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(SELECT_ORDER_BY_ID_SQL)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let order_row = OrderRow::from_row(&row).map_err(|e| map_sqlx_error("decode_order", e))?;
        let mut items = self.load_items(&[order_row.id]).await?;
        let items = items.remove(&order_row.id).unwrap_or_default();
        Ok(Some(order_row.into_order(items)?))
    }

    #[instrument(
        skip(self),
        fields(customer_id = ?filter.customer_id, order_count = tracing::field::Empty),
        err
    )]
    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(SELECT_ORDERS_SQL)
            .bind(filter.customer_id.map(|c| *c.as_uuid()))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;

        let order_rows = rows
            .iter()
            .map(OrderRow::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_order", e))?;

        let ids: Vec<uuid::Uuid> = order_rows.iter().map(|r| r.id).collect();
        let mut items = self.load_items(&ids).await?;

        let span = Span::current();
        span.record("order_count", order_rows.len());

        order_rows
            .into_iter()
            .map(|r| {
                let order_items = items.remove(&r.id).unwrap_or_default();
                r.into_order(order_items)
            })
            .collect()
    }

    #[instrument(skip(self, order), fields(order_id = %order.id, expected = ?expected), err)]
    async fn update(&self, mut order: Order, expected: ExpectedVersion) -> Result<Order, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let expected_version = match expected {
            ExpectedVersion::Exact(v) => Some(v as i64),
            ExpectedVersion::Any => None,
        };

        let row = sqlx::query(
            r#"
            UPDATE orders
            SET
                status = $3,
                payment_status = $4,
                fulfillment_status = $5,
                tracking_number = $6,
                shipping_date = $7,
                delivery_date = $8,
                cancellation_reason = $9,
                updated_at = $10,
                version = version + 1
            WHERE id = $1 AND ($2::bigint IS NULL OR version = $2)
            RETURNING version
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(expected_version)
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.fulfillment_status.as_str())
        .bind(&order.tracking_number)
        .bind(order.shipping_date)
        .bind(order.delivery_date)
        .bind(&order.cancellation_reason)
        .bind(order.updated_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_order", e))?;

        let Some(row) = row else {
            rollback(tx).await?;
            return Err(StoreError::Conflict(format!(
                "order {}: expected {expected:?}, but the stored version differs or the order is gone",
                order.id
            )));
        };
        let version: i64 = row
            .try_get("version")
            .map_err(|e| map_sqlx_error("update_order", e))?;

        for item in &order.items {
            sqlx::query(
                r#"
                UPDATE order_items
                SET fulfillment_status = $3
                WHERE id = $1 AND order_id = $2
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(order.id.as_uuid())
            .bind(item.fulfillment_status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_order_item", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        order.version = version as u64;
        Ok(order)
    }
}

async fn rollback(tx: Transaction<'_, Postgres>) -> Result<(), StoreError> {
    tx.rollback()
        .await
        .map_err(|e| map_sqlx_error("rollback", e))
}

const SELECT_ORDER_BY_ID_SQL: &str = r#"
    SELECT id, order_number, customer_id, customer_name, customer_email,
           status, payment_status, fulfillment_status, currency,
           subtotal, tax, shipping, discount, total,
           shipping_address, tracking_number, shipping_date, delivery_date,
           cancellation_reason, created_at, updated_at, version
    FROM orders
    WHERE id = $1
"#;

const SELECT_ORDERS_SQL: &str = r#"
    SELECT id, order_number, customer_id, customer_name, customer_email,
           status, payment_status, fulfillment_status, currency,
           subtotal, tax, shipping, discount, total,
           shipping_address, tracking_number, shipping_date, delivery_date,
           cancellation_reason, created_at, updated_at, version
    FROM orders
    WHERE ($1::uuid IS NULL OR customer_id = $1)
    ORDER BY created_at DESC, id DESC
"#;

fn to_db_amount(amount: u64) -> Result<i64, StoreError> {
    i64::try_from(amount)
        .map_err(|_| StoreError::Corrupt(format!("amount {amount} exceeds the storable range")))
}

fn from_db_amount(field: &str, amount: i64) -> Result<u64, StoreError> {
    u64::try_from(amount)
        .map_err(|_| StoreError::Corrupt(format!("negative {field} stored: {amount}")))
}

fn parse_status<T>(field: &str, value: &str) -> Result<T, StoreError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    value
        .parse()
        .map_err(|e| StoreError::Corrupt(format!("{field}: {e}")))
}

// SQLx row types

#[derive(Debug)]
struct OrderRow {
    id: uuid::Uuid,
    order_number: String,
    customer_id: uuid::Uuid,
    customer_name: String,
    customer_email: String,
    status: String,
    payment_status: String,
    fulfillment_status: String,
    currency: String,
    subtotal: i64,
    tax: i64,
    shipping: i64,
    discount: i64,
    total: i64,
    shipping_address: serde_json::Value,
    tracking_number: Option<String>,
    shipping_date: Option<DateTime<Utc>>,
    delivery_date: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for OrderRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            order_number: row.try_get("order_number")?,
            customer_id: row.try_get("customer_id")?,
            customer_name: row.try_get("customer_name")?,
            customer_email: row.try_get("customer_email")?,
            status: row.try_get("status")?,
            payment_status: row.try_get("payment_status")?,
            fulfillment_status: row.try_get("fulfillment_status")?,
            currency: row.try_get("currency")?,
            subtotal: row.try_get("subtotal")?,
            tax: row.try_get("tax")?,
            shipping: row.try_get("shipping")?,
            discount: row.try_get("discount")?,
            total: row.try_get("total")?,
            shipping_address: row.try_get("shipping_address")?,
            tracking_number: row.try_get("tracking_number")?,
            shipping_date: row.try_get("shipping_date")?,
            delivery_date: row.try_get("delivery_date")?,
            cancellation_reason: row.try_get("cancellation_reason")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: row.try_get("version")?,
        })
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, StoreError> {
        let shipping_address: ShippingAddress = serde_json::from_value(self.shipping_address)
            .map_err(|e| StoreError::Corrupt(format!("shipping_address: {e}")))?;

        Ok(Order {
            id: OrderId::from_uuid(self.id),
            order_number: self.order_number,
            customer_id: UserId::from_uuid(self.customer_id),
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            status: parse_status("status", &self.status)?,
            payment_status: parse_status("payment_status", &self.payment_status)?,
            fulfillment_status: parse_status("fulfillment_status", &self.fulfillment_status)?,
            currency: self.currency,
            totals: Totals {
                subtotal: from_db_amount("subtotal", self.subtotal)?,
                tax: from_db_amount("tax", self.tax)?,
                shipping: from_db_amount("shipping", self.shipping)?,
                discount: from_db_amount("discount", self.discount)?,
                total: from_db_amount("total", self.total)?,
            },
            shipping_address,
            tracking_number: self.tracking_number,
            shipping_date: self.shipping_date,
            delivery_date: self.delivery_date,
            cancellation_reason: self.cancellation_reason,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version.max(0) as u64,
        })
    }
}

#[derive(Debug)]
struct ItemRow {
    id: uuid::Uuid,
    order_id: uuid::Uuid,
    product_id: uuid::Uuid,
    variant_id: Option<uuid::Uuid>,
    product_name: String,
    quantity: i64,
    unit_price: i64,
    fulfillment_status: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ItemRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            product_id: row.try_get("product_id")?,
            variant_id: row.try_get("variant_id")?,
            product_name: row.try_get("product_name")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
            fulfillment_status: row.try_get("fulfillment_status")?,
        })
    }
}

impl TryFrom<ItemRow> for OrderItem {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(OrderItem {
            id: OrderItemId::from_uuid(row.id),
            order_id: OrderId::from_uuid(row.order_id),
            product_id: ProductId::from_uuid(row.product_id),
            variant_id: row.variant_id.map(VariantId::from_uuid),
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: from_db_amount("unit_price", row.unit_price)?,
            fulfillment_status: parse_status("fulfillment_status", &row.fulfillment_status)?,
        })
    }
}
