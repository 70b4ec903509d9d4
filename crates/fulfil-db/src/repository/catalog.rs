//! # Catalog Repository
//!
//! Stores, products, per-store margins and raw materials. The directories
//! themselves are plain CRUD; the ledger needs lookups plus the two stock
//! counters it maintains.
//!
//! ## Stock Counters
//! ```text
//! products.stock_quantity        INTEGER  ± via adjust_product_stock
//! raw_materials.stock_quantity   TEXT     ± via adjust_raw_material_stock
//!                                         (guarded on the value read)
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{parse_decimal, DbError, DbResult};
use fulfil_core::{GstRate, Money, Product, RawMaterial, Store, StoreProductMargin};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct StoreRow {
    id: i64,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Store {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: i64,
    sku: String,
    name: String,
    mrp: String,
    cost: String,
    gst_rate: String,
    stock_quantity: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        Ok(Product {
            id: row.id,
            sku: row.sku,
            name: row.name,
            mrp: Money::from_rupees(parse_decimal("products.mrp", &row.mrp)?),
            cost: Money::from_rupees(parse_decimal("products.cost", &row.cost)?),
            gst_rate: GstRate::new(parse_decimal("products.gst_rate", &row.gst_rate)?),
            stock_quantity: row.stock_quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MarginRow {
    store_id: i64,
    product_id: i64,
    margin_percentage: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MarginRow> for StoreProductMargin {
    type Error = DbError;

    fn try_from(row: MarginRow) -> DbResult<Self> {
        Ok(StoreProductMargin {
            store_id: row.store_id,
            product_id: row.product_id,
            margin_percentage: parse_decimal(
                "store_product_margins.margin_percentage",
                &row.margin_percentage,
            )?,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RawMaterialRow {
    id: i64,
    name: String,
    unit: String,
    stock_quantity: String,
    reorder_level: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RawMaterialRow> for RawMaterial {
    type Error = DbError;

    fn try_from(row: RawMaterialRow) -> DbResult<Self> {
        Ok(RawMaterial {
            id: row.id,
            name: row.name,
            unit: row.unit,
            stock_quantity: parse_decimal("raw_materials.stock_quantity", &row.stock_quantity)?,
            reorder_level: parse_decimal("raw_materials.reorder_level", &row.reorder_level)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PRODUCT_COLUMNS: &str =
    "id, sku, name, mrp, cost, gst_rate, stock_quantity, created_at, updated_at";

const RAW_MATERIAL_COLUMNS: &str =
    "id, name, unit, stock_quantity, reorder_level, created_at, updated_at";

// =============================================================================
// Inputs
// =============================================================================

/// Fields for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub mrp: Money,
    pub cost: Money,
    pub gst_rate: GstRate,
    pub stock_quantity: i64,
}

/// Fields for a new raw material.
#[derive(Debug, Clone)]
pub struct NewRawMaterial {
    pub name: String,
    pub unit: String,
    pub stock_quantity: Decimal,
    pub reorder_level: Decimal,
}

// =============================================================================
// Stores
// =============================================================================

pub async fn insert_store(conn: &mut SqliteConnection, name: &str) -> DbResult<Store> {
    let now = Utc::now();
    let id = sqlx::query("INSERT INTO stores (name, created_at) VALUES (?1, ?2)")
        .bind(name)
        .bind(now)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

    debug!(id, name, "Inserted store");
    Ok(Store {
        id,
        name: name.to_string(),
        created_at: now,
    })
}

pub async fn get_store(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Store>> {
    let row: Option<StoreRow> =
        sqlx::query_as("SELECT id, name, created_at FROM stores WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(row.map(Store::from))
}

// =============================================================================
// Products
// =============================================================================

pub async fn insert_product(conn: &mut SqliteConnection, new: &NewProduct) -> DbResult<Product> {
    let now = Utc::now();
    let id = sqlx::query(
        "INSERT INTO products (sku, name, mrp, cost, gst_rate, stock_quantity, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
    )
    .bind(&new.sku)
    .bind(&new.name)
    .bind(new.mrp.amount().to_string())
    .bind(new.cost.amount().to_string())
    .bind(new.gst_rate.percentage().to_string())
    .bind(new.stock_quantity)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => DbError::duplicate(field, new.sku.clone()),
        other => other,
    })?
    .last_insert_rowid();

    debug!(id, sku = %new.sku, "Inserted product");
    Ok(Product {
        id,
        sku: new.sku.clone(),
        name: new.name.clone(),
        mrp: new.mrp,
        cost: new.cost,
        gst_rate: new.gst_rate,
        stock_quantity: new.stock_quantity,
        created_at: now,
        updated_at: now,
    })
}

pub async fn get_product(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Product>> {
    let row: Option<ProductRow> =
        sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    row.map(Product::try_from).transpose()
}

/// Adds `delta` (may be negative) to a product's aggregate stock.
pub async fn adjust_product_stock(
    conn: &mut SqliteConnection,
    product_id: i64,
    delta: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE products SET stock_quantity = stock_quantity + ?2, updated_at = ?3 WHERE id = ?1",
    )
    .bind(product_id)
    .bind(delta)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", product_id));
    }

    debug!(product_id, delta, "Adjusted product stock");
    Ok(())
}

// =============================================================================
// Store Margins
// =============================================================================

pub async fn get_margin(
    conn: &mut SqliteConnection,
    store_id: i64,
    product_id: i64,
) -> DbResult<Option<Decimal>> {
    let stored: Option<String> = sqlx::query_scalar(
        "SELECT margin_percentage FROM store_product_margins WHERE store_id = ?1 AND product_id = ?2",
    )
    .bind(store_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    stored
        .map(|m| parse_decimal("store_product_margins.margin_percentage", &m))
        .transpose()
}

/// Sets a margin, replacing any stored value.
pub async fn set_margin(
    conn: &mut SqliteConnection,
    store_id: i64,
    product_id: i64,
    margin_percentage: Decimal,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO store_product_margins (store_id, product_id, margin_percentage, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (store_id, product_id)
         DO UPDATE SET margin_percentage = excluded.margin_percentage, updated_at = excluded.updated_at",
    )
    .bind(store_id)
    .bind(product_id)
    .bind(margin_percentage.to_string())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Stores a margin only if none exists yet. Returns whether it was stored.
pub async fn insert_margin_if_absent(
    conn: &mut SqliteConnection,
    store_id: i64,
    product_id: i64,
    margin_percentage: Decimal,
) -> DbResult<bool> {
    let result = sqlx::query(
        "INSERT INTO store_product_margins (store_id, product_id, margin_percentage, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (store_id, product_id) DO NOTHING",
    )
    .bind(store_id)
    .bind(product_id)
    .bind(margin_percentage.to_string())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn list_margins(
    conn: &mut SqliteConnection,
    store_id: i64,
) -> DbResult<Vec<StoreProductMargin>> {
    let rows: Vec<MarginRow> = sqlx::query_as(
        "SELECT store_id, product_id, margin_percentage, updated_at
         FROM store_product_margins WHERE store_id = ?1 ORDER BY product_id",
    )
    .bind(store_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(StoreProductMargin::try_from).collect()
}

// =============================================================================
// Raw Materials
// =============================================================================

pub async fn insert_raw_material(
    conn: &mut SqliteConnection,
    new: &NewRawMaterial,
) -> DbResult<RawMaterial> {
    let now = Utc::now();
    let id = sqlx::query(
        "INSERT INTO raw_materials (name, unit, stock_quantity, reorder_level, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
    )
    .bind(&new.name)
    .bind(&new.unit)
    .bind(new.stock_quantity.to_string())
    .bind(new.reorder_level.to_string())
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => DbError::duplicate(field, new.name.clone()),
        other => other,
    })?
    .last_insert_rowid();

    debug!(id, name = %new.name, "Inserted raw material");
    Ok(RawMaterial {
        id,
        name: new.name.clone(),
        unit: new.unit.clone(),
        stock_quantity: new.stock_quantity,
        reorder_level: new.reorder_level,
        created_at: now,
        updated_at: now,
    })
}

pub async fn get_raw_material(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<RawMaterial>> {
    let row: Option<RawMaterialRow> = sqlx::query_as(&format!(
        "SELECT {RAW_MATERIAL_COLUMNS} FROM raw_materials WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(RawMaterial::try_from).transpose()
}

pub async fn list_raw_materials(conn: &mut SqliteConnection) -> DbResult<Vec<RawMaterial>> {
    let rows: Vec<RawMaterialRow> = sqlx::query_as(&format!(
        "SELECT {RAW_MATERIAL_COLUMNS} FROM raw_materials ORDER BY name"
    ))
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(RawMaterial::try_from).collect()
}

/// Adds `delta` (may be negative) to a raw material's stock and returns the
/// new level.
///
/// The decimal is read, adjusted in Rust and written back only if the
/// stored text is still what was read; otherwise `Conflict`.
pub async fn adjust_raw_material_stock(
    conn: &mut SqliteConnection,
    raw_material_id: i64,
    delta: Decimal,
) -> DbResult<Decimal> {
    let current: Option<String> =
        sqlx::query_scalar("SELECT stock_quantity FROM raw_materials WHERE id = ?1")
            .bind(raw_material_id)
            .fetch_optional(&mut *conn)
            .await?;

    let current = current.ok_or_else(|| DbError::not_found("RawMaterial", raw_material_id))?;
    let updated = parse_decimal("raw_materials.stock_quantity", &current)? + delta;

    let result = sqlx::query(
        "UPDATE raw_materials SET stock_quantity = ?2, updated_at = ?3
         WHERE id = ?1 AND stock_quantity = ?4",
    )
    .bind(raw_material_id)
    .bind(updated.to_string())
    .bind(Utc::now())
    .bind(&current)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::stale("RawMaterial", raw_material_id));
    }

    debug!(raw_material_id, %delta, stock = %updated, "Adjusted raw material stock");
    Ok(updated)
}

// =============================================================================
// Pool-backed Repository
// =============================================================================

/// Catalog reads and inserts outside a ledger transaction.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    pub async fn insert_store(&self, name: &str) -> DbResult<Store> {
        let mut conn = self.pool.acquire().await?;
        insert_store(&mut conn, name).await
    }

    pub async fn get_store(&self, id: i64) -> DbResult<Option<Store>> {
        let mut conn = self.pool.acquire().await?;
        get_store(&mut conn, id).await
    }

    pub async fn insert_product(&self, new: &NewProduct) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        insert_product(&mut conn, new).await
    }

    pub async fn get_product(&self, id: i64) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        get_product(&mut conn, id).await
    }

    pub async fn get_margin(&self, store_id: i64, product_id: i64) -> DbResult<Option<Decimal>> {
        let mut conn = self.pool.acquire().await?;
        get_margin(&mut conn, store_id, product_id).await
    }

    pub async fn set_margin(
        &self,
        store_id: i64,
        product_id: i64,
        margin_percentage: Decimal,
    ) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        set_margin(&mut conn, store_id, product_id, margin_percentage).await
    }

    pub async fn list_margins(&self, store_id: i64) -> DbResult<Vec<StoreProductMargin>> {
        let mut conn = self.pool.acquire().await?;
        list_margins(&mut conn, store_id).await
    }

    pub async fn insert_raw_material(&self, new: &NewRawMaterial) -> DbResult<RawMaterial> {
        let mut conn = self.pool.acquire().await?;
        insert_raw_material(&mut conn, new).await
    }

    pub async fn get_raw_material(&self, id: i64) -> DbResult<Option<RawMaterial>> {
        let mut conn = self.pool.acquire().await?;
        get_raw_material(&mut conn, id).await
    }

    pub async fn list_raw_materials(&self) -> DbResult<Vec<RawMaterial>> {
        let mut conn = self.pool.acquire().await?;
        list_raw_materials(&mut conn).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
