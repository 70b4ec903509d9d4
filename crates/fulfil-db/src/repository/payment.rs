//! # Payment Repository
//!
//! Invoice payment rows. Rows are inserted or deleted, never updated; the
//! invoice summary is recomputed from [`amounts_for_invoice`] after each.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{parse_decimal, DbError, DbResult};
use fulfil_core::{InvoicePayment, Money, PaymentMethod};

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: i64,
    invoice_id: i64,
    amount: String,
    payment_date: NaiveDate,
    method: PaymentMethod,
    collected_by: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for InvoicePayment {
    type Error = DbError;

    fn try_from(row: PaymentRow) -> DbResult<Self> {
        Ok(InvoicePayment {
            id: row.id,
            invoice_id: row.invoice_id,
            amount: Money::from_rupees(parse_decimal("invoice_payments.amount", &row.amount)?),
            payment_date: row.payment_date,
            method: row.method,
            collected_by: row.collected_by,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

const PAYMENT_COLUMNS: &str =
    "id, invoice_id, amount, payment_date, method, collected_by, notes, created_at";

/// Fields of a new payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub invoice_id: i64,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    pub collected_by: Option<String>,
    pub notes: Option<String>,
}

pub async fn insert_payment(conn: &mut SqliteConnection, new: &NewPayment) -> DbResult<i64> {
    let id = sqlx::query(
        "INSERT INTO invoice_payments (
            invoice_id, amount, payment_date, method, collected_by, notes, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(new.invoice_id)
    .bind(new.amount.amount().to_string())
    .bind(new.payment_date)
    .bind(new.method)
    .bind(&new.collected_by)
    .bind(&new.notes)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    debug!(id, invoice_id = new.invoice_id, amount = %new.amount, "Inserted payment");
    Ok(id)
}

pub async fn get_payment(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<InvoicePayment>> {
    let row: Option<PaymentRow> = sqlx::query_as(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM invoice_payments WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(InvoicePayment::try_from).transpose()
}

pub async fn delete_payment(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
    let result = sqlx::query("DELETE FROM invoice_payments WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("InvoicePayment", id));
    }
    debug!(id, "Deleted payment");
    Ok(())
}

/// Every payment amount recorded against an invoice.
pub async fn amounts_for_invoice(conn: &mut SqliteConnection, invoice_id: i64) -> DbResult<Vec<Money>> {
    let amounts: Vec<String> =
        sqlx::query_scalar("SELECT amount FROM invoice_payments WHERE invoice_id = ?1")
            .bind(invoice_id)
            .fetch_all(&mut *conn)
            .await?;

    amounts
        .iter()
        .map(|a| parse_decimal("invoice_payments.amount", a).map(Money::from_rupees))
        .collect()
}

pub async fn list_for_invoice(
    conn: &mut SqliteConnection,
    invoice_id: i64,
) -> DbResult<Vec<InvoicePayment>> {
    let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM invoice_payments WHERE invoice_id = ?1 ORDER BY payment_date, id"
    ))
    .bind(invoice_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(InvoicePayment::try_from).collect()
}

/// Payment reads outside a ledger transaction.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<InvoicePayment>> {
        let mut conn = self.pool.acquire().await?;
        get_payment(&mut conn, id).await
    }

    pub async fn list_for_invoice(&self, invoice_id: i64) -> DbResult<Vec<InvoicePayment>> {
        let mut conn = self.pool.acquire().await?;
        list_for_invoice(&mut conn, invoice_id).await
    }
}
