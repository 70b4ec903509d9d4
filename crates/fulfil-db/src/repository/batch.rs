//! # Batch Repository
//!
//! Product batches and the only two ways their stock moves.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  decrement(batch, n)                                                    │
//! │    UPDATE … SET remaining = remaining - n,                              │
//! │                 status = depleted when it hits 0                        │
//! │    WHERE id = batch AND remaining >= n          ← guard                 │
//! │                                                                         │
//! │  restore(batch, n)                                                      │
//! │    UPDATE … SET remaining = remaining + n, status = available           │
//! │    WHERE id = batch AND remaining + n <= produced   ← guard             │
//! │                                                                         │
//! │  0 rows affected ⇒ DbError::Conflict, the transaction rolls back.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use fulfil_core::allocation::BatchStock;
use fulfil_core::{BatchStatus, ProductBatch};

#[derive(Debug, FromRow)]
struct BatchRow {
    id: i64,
    product_id: i64,
    batch_number: String,
    production_date: NaiveDate,
    quantity_produced: i64,
    quantity_remaining: i64,
    status: BatchStatus,
    production_order_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<BatchRow> for ProductBatch {
    fn from(row: BatchRow) -> Self {
        ProductBatch {
            id: row.id,
            product_id: row.product_id,
            batch_number: row.batch_number,
            production_date: row.production_date,
            quantity_produced: row.quantity_produced,
            quantity_remaining: row.quantity_remaining,
            status: row.status,
            production_order_id: row.production_order_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StockRow {
    id: i64,
    production_date: NaiveDate,
    quantity_remaining: i64,
}

const BATCH_COLUMNS: &str = "id, product_id, batch_number, production_date, quantity_produced, \
     quantity_remaining, status, production_order_id, created_at";

/// Fields of a freshly minted batch.
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub product_id: i64,
    pub batch_number: String,
    pub production_date: NaiveDate,
    pub quantity: i64,
    pub production_order_id: Option<i64>,
}

pub async fn insert_batch(conn: &mut SqliteConnection, new: &NewBatch) -> DbResult<i64> {
    let id = sqlx::query(
        "INSERT INTO product_batches (
            product_id, batch_number, production_date, quantity_produced,
            quantity_remaining, status, production_order_id, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, ?7)",
    )
    .bind(new.product_id)
    .bind(&new.batch_number)
    .bind(new.production_date)
    .bind(new.quantity)
    .bind(BatchStatus::Available)
    .bind(new.production_order_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => DbError::duplicate(field, new.batch_number.clone()),
        other => other,
    })?
    .last_insert_rowid();

    debug!(id, batch_number = %new.batch_number, quantity = new.quantity, "Inserted batch");
    Ok(id)
}

/// Batches of a product already produced on `date`.
pub async fn count_for_day(
    conn: &mut SqliteConnection,
    product_id: i64,
    date: NaiveDate,
) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM product_batches WHERE product_id = ?1 AND production_date = ?2",
    )
    .bind(product_id)
    .bind(date)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

/// Every batch of a product as seen by the FIFO planner, oldest first.
///
/// Depleted batches are included so the planner can tell a product with
/// no stock left from one that was never batch-tracked.
pub async fn stock_for_product(
    conn: &mut SqliteConnection,
    product_id: i64,
) -> DbResult<Vec<BatchStock>> {
    let rows: Vec<StockRow> = sqlx::query_as(
        "SELECT id, production_date, quantity_remaining FROM product_batches
         WHERE product_id = ?1
         ORDER BY production_date ASC, id ASC",
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| BatchStock {
            batch_id: r.id,
            production_date: r.production_date,
            quantity_remaining: r.quantity_remaining,
        })
        .collect())
}

/// Takes `quantity` units from a batch.
pub async fn decrement(conn: &mut SqliteConnection, batch_id: i64, quantity: i64) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE product_batches SET
            quantity_remaining = quantity_remaining - ?2,
            status = CASE WHEN quantity_remaining - ?2 = 0 THEN ?3 ELSE ?4 END
         WHERE id = ?1 AND quantity_remaining >= ?2",
    )
    .bind(batch_id)
    .bind(quantity)
    .bind(BatchStatus::Depleted)
    .bind(BatchStatus::Available)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::stale("ProductBatch", batch_id));
    }
    Ok(())
}

/// Returns `quantity` units to a batch.
pub async fn restore(conn: &mut SqliteConnection, batch_id: i64, quantity: i64) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE product_batches SET
            quantity_remaining = quantity_remaining + ?2,
            status = ?3
         WHERE id = ?1 AND quantity_remaining + ?2 <= quantity_produced",
    )
    .bind(batch_id)
    .bind(quantity)
    .bind(BatchStatus::Available)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::stale("ProductBatch", batch_id));
    }
    Ok(())
}

pub async fn get_batch(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<ProductBatch>> {
    let row: Option<BatchRow> =
        sqlx::query_as(&format!("SELECT {BATCH_COLUMNS} FROM product_batches WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(row.map(ProductBatch::from))
}

pub async fn list_for_product(
    conn: &mut SqliteConnection,
    product_id: i64,
) -> DbResult<Vec<ProductBatch>> {
    let rows: Vec<BatchRow> = sqlx::query_as(&format!(
        "SELECT {BATCH_COLUMNS} FROM product_batches WHERE product_id = ?1
         ORDER BY production_date ASC, id ASC"
    ))
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(ProductBatch::from).collect())
}

/// Units of a batch currently held by dispatch allocations.
pub async fn allocated_total(conn: &mut SqliteConnection, batch_id: i64) -> DbResult<i64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(quantity), 0) FROM dispatch_batches WHERE batch_id = ?1",
    )
    .bind(batch_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(total)
}

/// Batch reads outside a ledger transaction.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<ProductBatch>> {
        let mut conn = self.pool.acquire().await?;
        get_batch(&mut conn, id).await
    }

    pub async fn list_for_product(&self, product_id: i64) -> DbResult<Vec<ProductBatch>> {
        let mut conn = self.pool.acquire().await?;
        list_for_product(&mut conn, product_id).await
    }

    pub async fn allocated_total(&self, batch_id: i64) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        allocated_total(&mut conn, batch_id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
