//! # Order Repository
//!
//! Sales orders placed by stores. An order is invoiced at most once.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use fulfil_core::{Order, OrderItem, OrderStatus};

#[derive(Debug, FromRow)]
struct OrderRow {
    id: i64,
    order_number: String,
    store_id: i64,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            order_number: row.order_number,
            store_id: row.store_id,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: i64,
    quantity: i64,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
        }
    }
}

pub async fn insert_order(
    conn: &mut SqliteConnection,
    order_number: &str,
    store_id: i64,
) -> DbResult<i64> {
    let now = Utc::now();
    let id = sqlx::query(
        "INSERT INTO orders (order_number, store_id, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
    )
    .bind(order_number)
    .bind(store_id)
    .bind(OrderStatus::Pending)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    debug!(id, order_number, store_id, "Inserted order");
    Ok(id)
}

pub async fn insert_item(
    conn: &mut SqliteConnection,
    order_id: i64,
    product_id: i64,
    quantity: i64,
) -> DbResult<i64> {
    let id = sqlx::query("INSERT INTO order_items (order_id, product_id, quantity) VALUES (?1, ?2, ?3)")
        .bind(order_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
    Ok(id)
}

pub async fn get_order(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(
        "SELECT id, order_number, store_id, status, created_at, updated_at FROM orders WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(Order::from))
}

pub async fn get_items(conn: &mut SqliteConnection, order_id: i64) -> DbResult<Vec<OrderItem>> {
    let rows: Vec<OrderItemRow> = sqlx::query_as(
        "SELECT id, order_id, product_id, quantity FROM order_items WHERE order_id = ?1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(OrderItem::from).collect())
}

/// Moves an order from `from` to `to`. `Conflict` if it is no longer in
/// `from`.
pub async fn transition_status(
    conn: &mut SqliteConnection,
    id: i64,
    from: OrderStatus,
    to: OrderStatus,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE orders SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2")
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::stale("Order", id));
    }
    Ok(())
}

/// Order reads outside a ledger transaction.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        get_order(&mut conn, id).await
    }

    pub async fn get_items(&self, order_id: i64) -> DbResult<Vec<OrderItem>> {
        let mut conn = self.pool.acquire().await?;
        get_items(&mut conn, order_id).await
    }
}
