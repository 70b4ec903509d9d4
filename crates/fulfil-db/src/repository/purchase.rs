//! # Purchase Request Repository
//!
//! Replenishment requests for raw materials. `open` → `received` credits
//! stock (done by the caller in the same transaction); `open` → `cancelled`
//! does not.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{parse_decimal, DbError, DbResult};
use fulfil_core::{PurchaseRequest, PurchaseRequestStatus};

#[derive(Debug, FromRow)]
struct PurchaseRequestRow {
    id: i64,
    request_number: String,
    raw_material_id: i64,
    quantity: String,
    status: PurchaseRequestStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PurchaseRequestRow> for PurchaseRequest {
    type Error = DbError;

    fn try_from(row: PurchaseRequestRow) -> DbResult<Self> {
        Ok(PurchaseRequest {
            id: row.id,
            request_number: row.request_number,
            raw_material_id: row.raw_material_id,
            quantity: parse_decimal("purchase_requests.quantity", &row.quantity)?,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const REQUEST_COLUMNS: &str =
    "id, request_number, raw_material_id, quantity, status, created_at, updated_at";

pub async fn insert_request(
    conn: &mut SqliteConnection,
    request_number: &str,
    raw_material_id: i64,
    quantity: Decimal,
) -> DbResult<i64> {
    let id = sqlx::query(
        "INSERT INTO purchase_requests (request_number, raw_material_id, quantity, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
    )
    .bind(request_number)
    .bind(raw_material_id)
    .bind(quantity.to_string())
    .bind(PurchaseRequestStatus::Open)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    debug!(id, request_number, raw_material_id, %quantity, "Inserted purchase request");
    Ok(id)
}

/// `open` → `to`. `Conflict` if the request is no longer open.
pub async fn close_request(
    conn: &mut SqliteConnection,
    id: i64,
    to: PurchaseRequestStatus,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE purchase_requests SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status = ?4",
    )
    .bind(id)
    .bind(to)
    .bind(Utc::now())
    .bind(PurchaseRequestStatus::Open)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::stale("PurchaseRequest", id));
    }
    Ok(())
}

pub async fn get_request(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<PurchaseRequest>> {
    let row: Option<PurchaseRequestRow> = sqlx::query_as(&format!(
        "SELECT {REQUEST_COLUMNS} FROM purchase_requests WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(PurchaseRequest::try_from).transpose()
}

pub async fn list_open(conn: &mut SqliteConnection) -> DbResult<Vec<PurchaseRequest>> {
    let rows: Vec<PurchaseRequestRow> = sqlx::query_as(&format!(
        "SELECT {REQUEST_COLUMNS} FROM purchase_requests WHERE status = ?1 ORDER BY created_at, id"
    ))
    .bind(PurchaseRequestStatus::Open)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(PurchaseRequest::try_from).collect()
}

/// Purchase request reads outside a ledger transaction.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<PurchaseRequest>> {
        let mut conn = self.pool.acquire().await?;
        get_request(&mut conn, id).await
    }

    pub async fn list_open(&self) -> DbResult<Vec<PurchaseRequest>> {
        let mut conn = self.pool.acquire().await?;
        list_open(&mut conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::catalog::{insert_raw_material, NewRawMaterial};
    use crate::{Database, DbConfig};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_request_closes_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin().await.unwrap();
        let sugar = insert_raw_material(
            &mut tx,
            &NewRawMaterial {
                name: "Sugar".to_string(),
                unit: "kg".to_string(),
                stock_quantity: dec!(4),
                reorder_level: dec!(10),
            },
        )
        .await
        .unwrap();

        let id = insert_request(&mut tx, "PR-2024-25/1", sugar.id, dec!(25.5))
            .await
            .unwrap();
        assert_eq!(list_open(&mut tx).await.unwrap().len(), 1);

        close_request(&mut tx, id, PurchaseRequestStatus::Received)
            .await
            .unwrap();
        let request = get_request(&mut tx, id).await.unwrap().unwrap();
        assert_eq!(request.status, PurchaseRequestStatus::Received);
        assert_eq!(request.quantity, dec!(25.5));

        let err = close_request(&mut tx, id, PurchaseRequestStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
        assert!(list_open(&mut tx).await.unwrap().is_empty());
    }
}
