//! # Dispatch Repository
//!
//! Dispatches, their lines, batch allocations, and combined dispatches.
//!
//! ## Tables
//! ```text
//! dispatches ──┬── dispatch_items    (what was asked for)
//!              ├── dispatch_batches  (which batch supplied it; audit)
//!              └── combined_dispatch_id ──► combined_dispatches
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{parse_priority, DbError, DbResult};
use fulfil_core::{CombinedDispatch, Dispatch, DispatchBatch, DispatchItem, DispatchStatus};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct DispatchRow {
    id: i64,
    invoice_id: i64,
    status: DispatchStatus,
    priority: i64,
    is_small_order: bool,
    combined_dispatch_id: Option<i64>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DispatchRow> for Dispatch {
    type Error = DbError;

    fn try_from(row: DispatchRow) -> DbResult<Self> {
        Ok(Dispatch {
            id: row.id,
            invoice_id: row.invoice_id,
            status: row.status,
            priority: parse_priority(row.priority)?,
            is_small_order: row.is_small_order,
            combined_dispatch_id: row.combined_dispatch_id,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CombinedRow {
    id: i64,
    status: DispatchStatus,
    priority: i64,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CombinedRow> for CombinedDispatch {
    type Error = DbError;

    fn try_from(row: CombinedRow) -> DbResult<Self> {
        Ok(CombinedDispatch {
            id: row.id,
            status: row.status,
            priority: parse_priority(row.priority)?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: i64,
    dispatch_id: i64,
    product_id: i64,
    quantity: i64,
}

#[derive(Debug, FromRow)]
struct AllocationRow {
    id: i64,
    dispatch_id: i64,
    batch_id: i64,
    product_id: i64,
    quantity: i64,
}

const DISPATCH_COLUMNS: &str = "id, invoice_id, status, priority, is_small_order, \
     combined_dispatch_id, notes, created_at, updated_at";

// =============================================================================
// Dispatches
// =============================================================================

/// Fields of a new dispatch.
#[derive(Debug, Clone)]
pub struct NewDispatch {
    pub invoice_id: i64,
    pub priority: u8,
    pub is_small_order: bool,
    pub notes: Option<String>,
}

pub async fn insert_dispatch(conn: &mut SqliteConnection, new: &NewDispatch) -> DbResult<i64> {
    let id = sqlx::query(
        "INSERT INTO dispatches (invoice_id, status, priority, is_small_order, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
    )
    .bind(new.invoice_id)
    .bind(DispatchStatus::Pending)
    .bind(i64::from(new.priority))
    .bind(new.is_small_order)
    .bind(&new.notes)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    debug!(id, invoice_id = new.invoice_id, priority = new.priority, "Inserted dispatch");
    Ok(id)
}

pub async fn insert_item(
    conn: &mut SqliteConnection,
    dispatch_id: i64,
    product_id: i64,
    quantity: i64,
) -> DbResult<i64> {
    let id = sqlx::query(
        "INSERT INTO dispatch_items (dispatch_id, product_id, quantity) VALUES (?1, ?2, ?3)",
    )
    .bind(dispatch_id)
    .bind(product_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    Ok(id)
}

/// Records that `quantity` units of `batch_id` went to `dispatch_id`.
pub async fn insert_allocation(
    conn: &mut SqliteConnection,
    dispatch_id: i64,
    batch_id: i64,
    product_id: i64,
    quantity: i64,
) -> DbResult<i64> {
    let id = sqlx::query(
        "INSERT INTO dispatch_batches (dispatch_id, batch_id, product_id, quantity)
         VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(dispatch_id)
    .bind(batch_id)
    .bind(product_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    Ok(id)
}

pub async fn delete_allocations(conn: &mut SqliteConnection, dispatch_id: i64) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM dispatch_batches WHERE dispatch_id = ?1")
        .bind(dispatch_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Moves a dispatch from `from` to `to`. `Conflict` if it is no longer in
/// `from`.
pub async fn transition_status(
    conn: &mut SqliteConnection,
    id: i64,
    from: DispatchStatus,
    to: DispatchStatus,
) -> DbResult<()> {
    let result =
        sqlx::query("UPDATE dispatches SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2")
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::stale("Dispatch", id));
    }
    Ok(())
}

pub async fn get_dispatch(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Dispatch>> {
    let row: Option<DispatchRow> =
        sqlx::query_as(&format!("SELECT {DISPATCH_COLUMNS} FROM dispatches WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    row.map(Dispatch::try_from).transpose()
}

/// Reads several dispatches in one statement.
pub async fn get_many(conn: &mut SqliteConnection, ids: &[i64]) -> DbResult<Vec<Dispatch>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {DISPATCH_COLUMNS} FROM dispatches WHERE id IN ("));
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY id");

    let rows: Vec<DispatchRow> = qb.build_query_as().fetch_all(&mut *conn).await?;
    rows.into_iter().map(Dispatch::try_from).collect()
}

pub async fn list_for_invoice(conn: &mut SqliteConnection, invoice_id: i64) -> DbResult<Vec<Dispatch>> {
    let rows: Vec<DispatchRow> = sqlx::query_as(&format!(
        "SELECT {DISPATCH_COLUMNS} FROM dispatches WHERE invoice_id = ?1 ORDER BY id"
    ))
    .bind(invoice_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(Dispatch::try_from).collect()
}

pub async fn get_items(conn: &mut SqliteConnection, dispatch_id: i64) -> DbResult<Vec<DispatchItem>> {
    let rows: Vec<ItemRow> = sqlx::query_as(
        "SELECT id, dispatch_id, product_id, quantity FROM dispatch_items
         WHERE dispatch_id = ?1 ORDER BY id",
    )
    .bind(dispatch_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| DispatchItem {
            id: r.id,
            dispatch_id: r.dispatch_id,
            product_id: r.product_id,
            quantity: r.quantity,
        })
        .collect())
}

pub async fn get_allocations(
    conn: &mut SqliteConnection,
    dispatch_id: i64,
) -> DbResult<Vec<DispatchBatch>> {
    let rows: Vec<AllocationRow> = sqlx::query_as(
        "SELECT id, dispatch_id, batch_id, product_id, quantity FROM dispatch_batches
         WHERE dispatch_id = ?1 ORDER BY id",
    )
    .bind(dispatch_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| DispatchBatch {
            id: r.id,
            dispatch_id: r.dispatch_id,
            batch_id: r.batch_id,
            product_id: r.product_id,
            quantity: r.quantity,
        })
        .collect())
}

// =============================================================================
// Combined Dispatches
// =============================================================================

pub async fn insert_combined(
    conn: &mut SqliteConnection,
    priority: u8,
    notes: Option<&str>,
) -> DbResult<i64> {
    let id = sqlx::query(
        "INSERT INTO combined_dispatches (status, priority, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
    )
    .bind(DispatchStatus::Pending)
    .bind(i64::from(priority))
    .bind(notes)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    debug!(id, priority, "Inserted combined dispatch");
    Ok(id)
}

/// Moves pending small dispatches into a combined dispatch.
///
/// Every id must still be pending and small; otherwise `Conflict`.
pub async fn attach_to_combined(
    conn: &mut SqliteConnection,
    combined_id: i64,
    ids: &[i64],
) -> DbResult<()> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE dispatches SET status = ");
    qb.push_bind(DispatchStatus::Combined)
        .push(", combined_dispatch_id = ")
        .push_bind(combined_id)
        .push(", updated_at = ")
        .push_bind(Utc::now())
        .push(" WHERE status = ")
        .push_bind(DispatchStatus::Pending)
        .push(" AND is_small_order = 1 AND id IN (");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let result = qb.build().execute(&mut *conn).await?;

    if result.rows_affected() != ids.len() as u64 {
        return Err(DbError::stale("CombinedDispatch", combined_id));
    }
    Ok(())
}

pub async fn get_combined(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<CombinedDispatch>> {
    let row: Option<CombinedRow> = sqlx::query_as(
        "SELECT id, status, priority, notes, created_at, updated_at FROM combined_dispatches WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(CombinedDispatch::try_from).transpose()
}

pub async fn transition_combined(
    conn: &mut SqliteConnection,
    id: i64,
    from: DispatchStatus,
    to: DispatchStatus,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE combined_dispatches SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::stale("CombinedDispatch", id));
    }
    Ok(())
}

pub async fn list_members(conn: &mut SqliteConnection, combined_id: i64) -> DbResult<Vec<Dispatch>> {
    let rows: Vec<DispatchRow> = sqlx::query_as(&format!(
        "SELECT {DISPATCH_COLUMNS} FROM dispatches WHERE combined_dispatch_id = ?1 ORDER BY id"
    ))
    .bind(combined_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(Dispatch::try_from).collect()
}

/// Marks every member `delivered`, keeping the link.
pub async fn deliver_members(conn: &mut SqliteConnection, combined_id: i64) -> DbResult<u64> {
    let result = sqlx::query(
        "UPDATE dispatches SET status = ?2, updated_at = ?3
         WHERE combined_dispatch_id = ?1 AND status = ?4",
    )
    .bind(combined_id)
    .bind(DispatchStatus::Delivered)
    .bind(Utc::now())
    .bind(DispatchStatus::Combined)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// Returns every member to `pending` and clears the link.
pub async fn release_members(conn: &mut SqliteConnection, combined_id: i64) -> DbResult<u64> {
    let result = sqlx::query(
        "UPDATE dispatches SET status = ?2, combined_dispatch_id = NULL, updated_at = ?3
         WHERE combined_dispatch_id = ?1 AND status = ?4",
    )
    .bind(combined_id)
    .bind(DispatchStatus::Pending)
    .bind(Utc::now())
    .bind(DispatchStatus::Combined)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

// =============================================================================
// Pool-backed Repository
// =============================================================================

/// Dispatch reads outside a ledger transaction.
#[derive(Debug, Clone)]
pub struct DispatchRepository {
    pool: SqlitePool,
}

impl DispatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DispatchRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Dispatch>> {
        let mut conn = self.pool.acquire().await?;
        get_dispatch(&mut conn, id).await
    }

    pub async fn get_items(&self, dispatch_id: i64) -> DbResult<Vec<DispatchItem>> {
        let mut conn = self.pool.acquire().await?;
        get_items(&mut conn, dispatch_id).await
    }

    pub async fn get_allocations(&self, dispatch_id: i64) -> DbResult<Vec<DispatchBatch>> {
        let mut conn = self.pool.acquire().await?;
        get_allocations(&mut conn, dispatch_id).await
    }

    pub async fn list_for_invoice(&self, invoice_id: i64) -> DbResult<Vec<Dispatch>> {
        let mut conn = self.pool.acquire().await?;
        list_for_invoice(&mut conn, invoice_id).await
    }

    pub async fn get_combined(&self, id: i64) -> DbResult<Option<CombinedDispatch>> {
        let mut conn = self.pool.acquire().await?;
        get_combined(&mut conn, id).await
    }

    pub async fn list_members(&self, combined_id: i64) -> DbResult<Vec<Dispatch>> {
        let mut conn = self.pool.acquire().await?;
        list_members(&mut conn, combined_id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
