//! # Invoice Repository
//!
//! Invoices, their priced lines, and the denormalized payment summary.
//!
//! ## Invoice Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  insert_invoice + insert_item × N      status pending, paid 0          │
//! │       │                                                                 │
//! │       ├── payments ──► update_payment_summary (recomputed, never +=)   │
//! │       │                                                                 │
//! │       ├── transition_status(pending → completed)                       │
//! │       │                                                                 │
//! │       └── transition_status(pending → cancelled) ──► delete_invoice    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{parse_decimal, DbError, DbResult};
use fulfil_core::payment::PaymentSummary;
use fulfil_core::pricing::{InvoiceTotals, PricedLine};
use fulfil_core::{GstRate, Invoice, InvoiceItem, InvoiceStatus, Money, PaymentStatus};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: i64,
    invoice_number: String,
    order_id: Option<i64>,
    store_id: i64,
    is_igst: bool,
    subtotal: String,
    cgst: String,
    sgst: String,
    igst: String,
    round_off: String,
    total_amount: String,
    total_paid: String,
    payment_status: PaymentStatus,
    status: InvoiceStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn money(field: &str, value: &str) -> DbResult<Money> {
    parse_decimal(field, value).map(Money::from_rupees)
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DbError;

    fn try_from(row: InvoiceRow) -> DbResult<Self> {
        Ok(Invoice {
            id: row.id,
            invoice_number: row.invoice_number,
            order_id: row.order_id,
            store_id: row.store_id,
            is_igst: row.is_igst,
            subtotal: money("invoices.subtotal", &row.subtotal)?,
            cgst: money("invoices.cgst", &row.cgst)?,
            sgst: money("invoices.sgst", &row.sgst)?,
            igst: money("invoices.igst", &row.igst)?,
            round_off: money("invoices.round_off", &row.round_off)?,
            total_amount: money("invoices.total_amount", &row.total_amount)?,
            total_paid: money("invoices.total_paid", &row.total_paid)?,
            payment_status: row.payment_status,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct InvoiceItemRow {
    id: i64,
    invoice_id: i64,
    product_id: i64,
    quantity: i64,
    quantity_shipped: i64,
    unit_price: String,
    cost_price: String,
    margin_percentage: String,
    gst_rate: String,
    total: String,
}

impl TryFrom<InvoiceItemRow> for InvoiceItem {
    type Error = DbError;

    fn try_from(row: InvoiceItemRow) -> DbResult<Self> {
        Ok(InvoiceItem {
            id: row.id,
            invoice_id: row.invoice_id,
            product_id: row.product_id,
            quantity: row.quantity,
            quantity_shipped: row.quantity_shipped,
            unit_price: money("invoice_items.unit_price", &row.unit_price)?,
            cost_price: money("invoice_items.cost_price", &row.cost_price)?,
            margin_percentage: parse_decimal(
                "invoice_items.margin_percentage",
                &row.margin_percentage,
            )?,
            gst_rate: GstRate::new(parse_decimal("invoice_items.gst_rate", &row.gst_rate)?),
            total: money("invoice_items.total", &row.total)?,
        })
    }
}

const INVOICE_COLUMNS: &str = "id, invoice_number, order_id, store_id, is_igst, subtotal, cgst, \
     sgst, igst, round_off, total_amount, total_paid, payment_status, status, created_at, updated_at";

// =============================================================================
// Writes
// =============================================================================

/// Header fields of a new invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub order_id: Option<i64>,
    pub store_id: i64,
    pub is_igst: bool,
    pub totals: InvoiceTotals,
}

pub async fn insert_invoice(conn: &mut SqliteConnection, new: &NewInvoice) -> DbResult<i64> {
    let now = Utc::now();
    let t = &new.totals;

    let id = sqlx::query(
        "INSERT INTO invoices (
            invoice_number, order_id, store_id, is_igst,
            subtotal, cgst, sgst, igst, round_off, total_amount,
            total_paid, payment_status, status, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, '0', ?11, ?12, ?13, ?13)",
    )
    .bind(&new.invoice_number)
    .bind(new.order_id)
    .bind(new.store_id)
    .bind(new.is_igst)
    .bind(t.subtotal.amount().to_string())
    .bind(t.cgst.amount().to_string())
    .bind(t.sgst.amount().to_string())
    .bind(t.igst.amount().to_string())
    .bind(t.round_off.amount().to_string())
    .bind(t.total_amount.amount().to_string())
    .bind(PaymentStatus::Pending)
    .bind(InvoiceStatus::Pending)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    debug!(
        id,
        invoice_number = %new.invoice_number,
        total = %t.total_amount,
        "Inserted invoice"
    );
    Ok(id)
}

/// Inserts a priced line; `quantity_shipped` starts equal to `quantity`.
pub async fn insert_item(
    conn: &mut SqliteConnection,
    invoice_id: i64,
    line: &PricedLine,
) -> DbResult<i64> {
    let id = sqlx::query(
        "INSERT INTO invoice_items (
            invoice_id, product_id, quantity, quantity_shipped,
            unit_price, cost_price, margin_percentage, gst_rate, total
         ) VALUES (?1, ?2, ?3, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(invoice_id)
    .bind(line.product_id)
    .bind(line.quantity)
    .bind(line.unit_price.amount().to_string())
    .bind(line.cost_price.amount().to_string())
    .bind(line.margin_percentage.to_string())
    .bind(line.gst_rate.percentage().to_string())
    .bind(line.total.amount().to_string())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    Ok(id)
}

/// Writes a recomputed payment summary.
pub async fn update_payment_summary(
    conn: &mut SqliteConnection,
    invoice_id: i64,
    summary: &PaymentSummary,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE invoices SET total_paid = ?2, payment_status = ?3, updated_at = ?4 WHERE id = ?1",
    )
    .bind(invoice_id)
    .bind(summary.total_paid.amount().to_string())
    .bind(summary.payment_status)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Invoice", invoice_id));
    }
    Ok(())
}

/// Moves an invoice from `from` to `to`. `Conflict` if it is no longer in
/// `from`.
pub async fn transition_status(
    conn: &mut SqliteConnection,
    id: i64,
    from: InvoiceStatus,
    to: InvoiceStatus,
) -> DbResult<()> {
    let result =
        sqlx::query("UPDATE invoices SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2")
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::stale("Invoice", id));
    }
    Ok(())
}

/// Deletes a cancelled invoice with its items, payments and dispatches.
pub async fn delete_cancelled(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
    let result = sqlx::query("DELETE FROM invoices WHERE id = ?1 AND status = ?2")
        .bind(id)
        .bind(InvoiceStatus::Cancelled)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::stale("Invoice", id));
    }
    debug!(id, "Deleted invoice");
    Ok(())
}

// =============================================================================
// Reads
// =============================================================================

pub async fn get_invoice(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Invoice>> {
    let row: Option<InvoiceRow> =
        sqlx::query_as(&format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    row.map(Invoice::try_from).transpose()
}

pub async fn get_items(conn: &mut SqliteConnection, invoice_id: i64) -> DbResult<Vec<InvoiceItem>> {
    let rows: Vec<InvoiceItemRow> = sqlx::query_as(
        "SELECT id, invoice_id, product_id, quantity, quantity_shipped,
                unit_price, cost_price, margin_percentage, gst_rate, total
         FROM invoice_items WHERE invoice_id = ?1 ORDER BY id",
    )
    .bind(invoice_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(InvoiceItem::try_from).collect()
}

/// Invoice reads outside a ledger transaction.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        get_invoice(&mut conn, id).await
    }

    pub async fn get_items(&self, invoice_id: i64) -> DbResult<Vec<InvoiceItem>> {
        let mut conn = self.pool.acquire().await?;
        get_items(&mut conn, invoice_id).await
    }
}
