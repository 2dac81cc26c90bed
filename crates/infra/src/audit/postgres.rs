//! Postgres-backed audit trail (`order_status_history`).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use storefront_core::{HistoryEntryId, OrderId, UserId};
use storefront_orders::{OrderStatus, PaymentStatus, StatusChange, StatusHistoryEntry};

use super::r#trait::AuditTrail;
use crate::error::{StoreError, map_sqlx_error};

#[derive(Debug, Clone)]
pub struct PostgresAuditTrail {
    pool: Arc<PgPool>,
}

impl PostgresAuditTrail {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl AuditTrail for PostgresAuditTrail {
    #[instrument(skip(self, entry), fields(order_id = %entry.order_id, kind = entry.change.kind()), err)]
    async fn append(&self, entry: StatusHistoryEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO order_status_history (
                id, order_id, change_kind, from_status, to_status, note, actor_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.order_id.as_uuid())
        .bind(entry.change.kind())
        .bind(entry.change.from_label())
        .bind(entry.change.to_label())
        .bind(&entry.note)
        .bind(entry.actor.map(|a| *a.as_uuid()))
        .bind(entry.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_status_history", e))?;

        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %order_id), err)]
    async fn list_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, change_kind, from_status, to_status, note, actor_id, created_at
            FROM order_status_history
            WHERE order_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_status_history", e))?;

        rows.iter()
            .map(|row| -> Result<StatusHistoryEntry, StoreError> {
                HistoryRow::from_row(row)
                    .map_err(|e| map_sqlx_error("decode_status_history", e))?
                    .try_into()
            })
            .collect()
    }
}

#[derive(Debug)]
struct HistoryRow {
    id: uuid::Uuid,
    order_id: uuid::Uuid,
    change_kind: String,
    from_status: String,
    to_status: String,
    note: Option<String>,
    actor_id: Option<uuid::Uuid>,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for HistoryRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(HistoryRow {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            change_kind: row.try_get("change_kind")?,
            from_status: row.try_get("from_status")?,
            to_status: row.try_get("to_status")?,
            note: row.try_get("note")?,
            actor_id: row.try_get("actor_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<HistoryRow> for StatusHistoryEntry {
    type Error = StoreError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let corrupt = |e: storefront_core::DomainError| {
            StoreError::Corrupt(format!("status history {}: {e}", row.id))
        };

        let change = match row.change_kind.as_str() {
            "order" => StatusChange::Order {
                from: row.from_status.parse::<OrderStatus>().map_err(corrupt)?,
                to: row.to_status.parse::<OrderStatus>().map_err(corrupt)?,
            },
            "payment" => StatusChange::Payment {
                from: row.from_status.parse::<PaymentStatus>().map_err(corrupt)?,
                to: row.to_status.parse::<PaymentStatus>().map_err(corrupt)?,
            },
            other => {
                return Err(StoreError::Corrupt(format!(
                    "status history {}: unknown change kind '{other}'",
                    row.id
                )));
            }
        };

        Ok(StatusHistoryEntry {
            id: HistoryEntryId::from_uuid(row.id),
            order_id: OrderId::from_uuid(row.order_id),
            change,
            note: row.note,
            actor: row.actor_id.map(UserId::from_uuid),
            created_at: row.created_at,
        })
    }
}
