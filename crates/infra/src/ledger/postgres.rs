//! Postgres-backed inventory ledger.
//!
//! Rows live in the `inventory` table, unique on
//! `(product_id, COALESCE(variant_id, nil uuid))`. Deduct and restore are each
//! one `UPDATE ... FROM (SELECT ... FOR UPDATE) RETURNING` statement, so the
//! read of the previous quantity and the write of the new one cannot be
//! interleaved with another writer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;

use storefront_core::{ProductId, VariantId};
use storefront_inventory::{InventoryRecord, MovementKind, StockKey, StockMovement};

use super::r#trait::InventoryLedger;
use crate::error::{StoreError, map_sqlx_error};

#[derive(Debug, Clone)]
pub struct PostgresInventoryLedger {
    pool: Arc<PgPool>,
}

impl PostgresInventoryLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn apply(
        &self,
        key: StockKey,
        quantity: i64,
        kind: MovementKind,
    ) -> Result<Option<StockMovement>, StoreError> {
        let (sql, operation) = match kind {
            MovementKind::Deduct => (DEDUCT_SQL, "deduct_inventory"),
            MovementKind::Restore => (RESTORE_SQL, "restore_inventory"),
        };

        let row = sqlx::query(sql)
            .bind(key.product_id.as_uuid())
            .bind(key.variant_id.map(|v| *v.as_uuid()))
            .bind(quantity.max(0))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let previous: i64 = row
            .try_get("previous")
            .map_err(|e| map_sqlx_error(operation, e))?;
        let current: i64 = row
            .try_get("current")
            .map_err(|e| map_sqlx_error(operation, e))?;
        let tracked: bool = row
            .try_get("track_inventory")
            .map_err(|e| map_sqlx_error(operation, e))?;

        Ok(Some(StockMovement {
            key,
            kind,
            requested: quantity,
            previous,
            current,
            tracked,
        }))
    }
}

const DEDUCT_SQL: &str = r#"
    UPDATE inventory AS i
    SET
        quantity = CASE WHEN c.track_inventory THEN GREATEST(c.quantity - $3, 0) ELSE c.quantity END,
        updated_at = CASE WHEN c.track_inventory THEN NOW() ELSE c.updated_at END
    FROM (
        SELECT product_id, variant_id, quantity, track_inventory, updated_at
        FROM inventory
        WHERE product_id = $1 AND variant_id IS NOT DISTINCT FROM $2::uuid
        FOR UPDATE
    ) AS c
    WHERE i.product_id = c.product_id
        AND i.variant_id IS NOT DISTINCT FROM c.variant_id
    RETURNING c.quantity AS previous, i.quantity AS current, i.track_inventory
"#;

const RESTORE_SQL: &str = r#"
    UPDATE inventory AS i
    SET
        quantity = CASE WHEN c.track_inventory THEN c.quantity + $3 ELSE c.quantity END,
        updated_at = CASE WHEN c.track_inventory THEN NOW() ELSE c.updated_at END
    FROM (
        SELECT product_id, variant_id, quantity, track_inventory, updated_at
        FROM inventory
        WHERE product_id = $1 AND variant_id IS NOT DISTINCT FROM $2::uuid
        FOR UPDATE
    ) AS c
    WHERE i.product_id = c.product_id
        AND i.variant_id IS NOT DISTINCT FROM c.variant_id
    RETURNING c.quantity AS previous, i.quantity AS current, i.track_inventory
"#;

#[async_trait::async_trait]
impl InventoryLedger for PostgresInventoryLedger {
    #[instrument(skip(self), fields(key = %key), err)]
    async fn get(&self, key: StockKey) -> Result<Option<InventoryRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT product_id, variant_id, quantity, low_stock_threshold,
                   track_inventory, allow_backorder, updated_at
            FROM inventory
            WHERE product_id = $1 AND variant_id IS NOT DISTINCT FROM $2::uuid
            "#,
        )
        .bind(key.product_id.as_uuid())
        .bind(key.variant_id.map(|v| *v.as_uuid()))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_inventory", e))?;

        row.map(|r| record_from_row(&r)).transpose()
    }

    #[instrument(skip(self, record), fields(key = %record.key), err)]
    async fn upsert(&self, record: InventoryRecord) -> Result<InventoryRecord, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO inventory (
                product_id,
                variant_id,
                quantity,
                low_stock_threshold,
                track_inventory,
                allow_backorder,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (product_id, (COALESCE(variant_id, '00000000-0000-0000-0000-000000000000'::uuid)))
            DO UPDATE SET
                quantity = EXCLUDED.quantity,
                low_stock_threshold = EXCLUDED.low_stock_threshold,
                track_inventory = EXCLUDED.track_inventory,
                allow_backorder = EXCLUDED.allow_backorder,
                updated_at = EXCLUDED.updated_at
            RETURNING product_id, variant_id, quantity, low_stock_threshold,
                      track_inventory, allow_backorder, updated_at
            "#,
        )
        .bind(record.key.product_id.as_uuid())
        .bind(record.key.variant_id.map(|v| *v.as_uuid()))
        .bind(record.quantity)
        .bind(record.low_stock_threshold)
        .bind(record.track_inventory)
        .bind(record.allow_backorder)
        .bind(record.updated_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_inventory", e))?;

        record_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, variant_id, quantity, low_stock_threshold,
                   track_inventory, allow_backorder, updated_at
            FROM inventory
            ORDER BY product_id, variant_id NULLS FIRST
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_inventory", e))?;

        rows.iter().map(record_from_row).collect()
    }

    #[instrument(skip(self), fields(key = %key), err)]
    async fn deduct(
        &self,
        key: StockKey,
        quantity: i64,
    ) -> Result<Option<StockMovement>, StoreError> {
        self.apply(key, quantity, MovementKind::Deduct).await
    }

    #[instrument(skip(self), fields(key = %key), err)]
    async fn restore(
        &self,
        key: StockKey,
        quantity: i64,
    ) -> Result<Option<StockMovement>, StoreError> {
        self.apply(key, quantity, MovementKind::Restore).await
    }
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> Result<InventoryRecord, StoreError> {
    let decode = |e| map_sqlx_error("decode_inventory", e);

    let product_id: uuid::Uuid = row.try_get("product_id").map_err(decode)?;
    let variant_id: Option<uuid::Uuid> = row.try_get("variant_id").map_err(decode)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(decode)?;

    Ok(InventoryRecord {
        key: StockKey::new(
            ProductId::from_uuid(product_id),
            variant_id.map(VariantId::from_uuid),
        ),
        quantity: row.try_get("quantity").map_err(decode)?,
        low_stock_threshold: row.try_get("low_stock_threshold").map_err(decode)?,
        track_inventory: row.try_get("track_inventory").map_err(decode)?,
        allow_backorder: row.try_get("allow_backorder").map_err(decode)?,
        updated_at,
    })
}
