//! # Production Repository
//!
//! Production orders and their planned materials. Status changes are
//! guarded on the status the caller read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{parse_decimal, DbError, DbResult};
use fulfil_core::{ProductionMaterial, ProductionOrder, ProductionStatus};

#[derive(Debug, FromRow)]
struct ProductionOrderRow {
    id: i64,
    order_number: String,
    product_id: i64,
    quantity_to_produce: i64,
    quantity_produced: Option<i64>,
    status: ProductionStatus,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<ProductionOrderRow> for ProductionOrder {
    fn from(row: ProductionOrderRow) -> Self {
        ProductionOrder {
            id: row.id,
            order_number: row.order_number,
            product_id: row.product_id,
            quantity_to_produce: row.quantity_to_produce,
            quantity_produced: row.quantity_produced,
            status: row.status,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MaterialRow {
    id: i64,
    production_order_id: i64,
    raw_material_id: i64,
    quantity_required: String,
    quantity_used: Option<String>,
}

impl TryFrom<MaterialRow> for ProductionMaterial {
    type Error = DbError;

    fn try_from(row: MaterialRow) -> DbResult<Self> {
        Ok(ProductionMaterial {
            id: row.id,
            production_order_id: row.production_order_id,
            raw_material_id: row.raw_material_id,
            quantity_required: parse_decimal(
                "production_materials.quantity_required",
                &row.quantity_required,
            )?,
            quantity_used: row
                .quantity_used
                .as_deref()
                .map(|u| parse_decimal("production_materials.quantity_used", u))
                .transpose()?,
        })
    }
}

const ORDER_COLUMNS: &str = "id, order_number, product_id, quantity_to_produce, quantity_produced, \
     status, created_at, started_at, completed_at";

// =============================================================================
// Writes
// =============================================================================

pub async fn insert_order(
    conn: &mut SqliteConnection,
    order_number: &str,
    product_id: i64,
    quantity_to_produce: i64,
) -> DbResult<i64> {
    let id = sqlx::query(
        "INSERT INTO production_orders (order_number, product_id, quantity_to_produce, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(order_number)
    .bind(product_id)
    .bind(quantity_to_produce)
    .bind(ProductionStatus::Pending)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    debug!(id, order_number, product_id, quantity_to_produce, "Inserted production order");
    Ok(id)
}

pub async fn insert_material(
    conn: &mut SqliteConnection,
    production_order_id: i64,
    raw_material_id: i64,
    quantity_required: Decimal,
) -> DbResult<i64> {
    let id = sqlx::query(
        "INSERT INTO production_materials (production_order_id, raw_material_id, quantity_required)
         VALUES (?1, ?2, ?3)",
    )
    .bind(production_order_id)
    .bind(raw_material_id)
    .bind(quantity_required.to_string())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    Ok(id)
}

pub async fn set_material_used(
    conn: &mut SqliteConnection,
    material_id: i64,
    quantity_used: Decimal,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE production_materials SET quantity_used = ?2 WHERE id = ?1")
        .bind(material_id)
        .bind(quantity_used.to_string())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("ProductionMaterial", material_id));
    }
    Ok(())
}

/// pending → in_progress.
pub async fn mark_started(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE production_orders SET status = ?2, started_at = ?3 WHERE id = ?1 AND status = ?4",
    )
    .bind(id)
    .bind(ProductionStatus::InProgress)
    .bind(Utc::now())
    .bind(ProductionStatus::Pending)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::stale("ProductionOrder", id));
    }
    Ok(())
}

/// `from` → completed, recording the yield.
pub async fn mark_completed(
    conn: &mut SqliteConnection,
    id: i64,
    from: ProductionStatus,
    quantity_produced: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE production_orders SET status = ?2, quantity_produced = ?3, completed_at = ?4
         WHERE id = ?1 AND status = ?5",
    )
    .bind(id)
    .bind(ProductionStatus::Completed)
    .bind(quantity_produced)
    .bind(Utc::now())
    .bind(from)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::stale("ProductionOrder", id));
    }
    Ok(())
}

/// `from` → cancelled.
pub async fn mark_cancelled(
    conn: &mut SqliteConnection,
    id: i64,
    from: ProductionStatus,
) -> DbResult<()> {
    let result =
        sqlx::query("UPDATE production_orders SET status = ?2 WHERE id = ?1 AND status = ?3")
            .bind(id)
            .bind(ProductionStatus::Cancelled)
            .bind(from)
            .execute(&mut *conn)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::stale("ProductionOrder", id));
    }
    Ok(())
}

// =============================================================================
// Reads
// =============================================================================

pub async fn get_order(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<ProductionOrder>> {
    let row: Option<ProductionOrderRow> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM production_orders WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(ProductionOrder::from))
}

pub async fn get_materials(
    conn: &mut SqliteConnection,
    production_order_id: i64,
) -> DbResult<Vec<ProductionMaterial>> {
    let rows: Vec<MaterialRow> = sqlx::query_as(
        "SELECT id, production_order_id, raw_material_id, quantity_required, quantity_used
         FROM production_materials WHERE production_order_id = ?1 ORDER BY id",
    )
    .bind(production_order_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(ProductionMaterial::try_from).collect()
}

/// Production reads outside a ledger transaction.
#[derive(Debug, Clone)]
pub struct ProductionRepository {
    pool: SqlitePool,
}

impl ProductionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductionRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<ProductionOrder>> {
        let mut conn = self.pool.acquire().await?;
        get_order(&mut conn, id).await
    }

    pub async fn get_materials(&self, production_order_id: i64) -> DbResult<Vec<ProductionMaterial>> {
        let mut conn = self.pool.acquire().await?;
        get_materials(&mut conn, production_order_id).await
    }
}
