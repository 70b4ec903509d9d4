//! # Payment Operations
//!
//! Collections against invoices. The invoice's paid amount, payment status
//! and balance are derived from the full set of payment rows after every
//! insert or delete, inside the same transaction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::Ledger;
use crate::error::LedgerResult;
use fulfil_core::payment::{ensure_payable, summarize, PaymentSummary};
use fulfil_core::{CoreError, Money, PaymentMethod};
use fulfil_db::repository::payment::{self, NewPayment};
use fulfil_db::repository::invoice;
use sqlx::SqliteConnection;

/// A payment to record. Date defaults to today, method to cash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Money,
    pub payment_date: Option<NaiveDate>,
    pub method: Option<PaymentMethod>,
    pub collected_by: Option<String>,
    pub notes: Option<String>,
}

impl PaymentRequest {
    pub fn new(amount: Money) -> Self {
        PaymentRequest {
            amount,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecorded {
    pub payment_id: i64,
    pub summary: PaymentSummary,
}

/// Re-reads every payment of the invoice and stores the derived summary.
async fn recompute(
    conn: &mut SqliteConnection,
    invoice_id: i64,
    total_amount: Money,
) -> LedgerResult<PaymentSummary> {
    let amounts = payment::amounts_for_invoice(conn, invoice_id).await?;
    let summary = summarize(total_amount, amounts);
    invoice::update_payment_summary(conn, invoice_id, &summary).await?;
    Ok(summary)
}

impl Ledger {
    /// Records a payment and recomputes the invoice's payment state.
    ///
    /// ## Errors
    /// - `Validation` for a non-positive amount
    /// - `NotFound` for an unknown invoice
    /// - `StateConflict` for a cancelled invoice
    /// - `Overpayment` when the amount exceeds the balance by more than a paisa
    pub async fn record_payment(
        &self,
        invoice_id: i64,
        request: &PaymentRequest,
    ) -> LedgerResult<PaymentRecorded> {
        let today = self.today()?;

        let mut tx = self.db.begin().await?;

        let target = invoice::get_invoice(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Invoice", invoice_id))?;
        let paid = summarize(
            target.total_amount,
            payment::amounts_for_invoice(&mut tx, invoice_id).await?,
        );
        ensure_payable(&target, paid.total_paid, request.amount)?;

        let payment_id = payment::insert_payment(
            &mut tx,
            &NewPayment {
                invoice_id,
                amount: request.amount,
                payment_date: request.payment_date.unwrap_or(today),
                method: request.method.unwrap_or_default(),
                collected_by: request.collected_by.clone(),
                notes: request.notes.clone(),
            },
        )
        .await?;

        let summary = recompute(&mut tx, invoice_id, target.total_amount).await?;
        tx.commit().await?;

        info!(
            payment_id,
            invoice_id,
            amount = %request.amount,
            total_paid = %summary.total_paid,
            balance = %summary.remaining_balance,
            "Payment recorded"
        );
        Ok(PaymentRecorded {
            payment_id,
            summary,
        })
    }

    /// Removes a payment and recomputes the invoice's payment state.
    pub async fn delete_payment(&self, payment_id: i64) -> LedgerResult<PaymentSummary> {
        let mut tx = self.db.begin().await?;

        let existing = payment::get_payment(&mut tx, payment_id)
            .await?
            .ok_or_else(|| CoreError::not_found("InvoicePayment", payment_id))?;
        let target = invoice::get_invoice(&mut tx, existing.invoice_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Invoice", existing.invoice_id))?;

        payment::delete_payment(&mut tx, payment_id).await?;
        let summary = recompute(&mut tx, target.id, target.total_amount).await?;
        tx.commit().await?;

        info!(
            payment_id,
            invoice_id = target.id,
            amount = %existing.amount,
            total_paid = %summary.total_paid,
            "Payment deleted"
        );
        Ok(summary)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::service::{fixtures, LineItem};
    use fulfil_core::PaymentStatus;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn rupees(v: Decimal) -> Money {
        Money::from_rupees(v)
    }

    /// A ₹1000 invoice: 10 units at ₹100, no tax.
    async fn thousand_rupee_invoice(ledger: &Ledger) -> i64 {
        let store = fixtures::store(ledger).await;
        let atta = fixtures::product(ledger, "ATTA-5KG", dec!(100), dec!(0)).await;
        let created = fixtures::invoice(ledger, store.id, &[LineItem::new(atta.id, 10)]).await;
        assert_eq!(created.total_amount, rupees(dec!(1000)));
        created.invoice_id
    }

    #[tokio::test]
    async fn test_recompute_after_delete() {
        let ledger = fixtures::ledger().await;
        let invoice_id = thousand_rupee_invoice(&ledger).await;

        let first = ledger
            .record_payment(invoice_id, &PaymentRequest::new(rupees(dec!(300))))
            .await
            .unwrap();
        let second = ledger
            .record_payment(
                invoice_id,
                &PaymentRequest {
                    amount: rupees(dec!(200)),
                    payment_date: Some(fixtures::date(2024, 6, 1)),
                    method: Some(PaymentMethod::Upi),
                    collected_by: Some("Ravi".to_string()),
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(second.summary.total_paid, rupees(dec!(500)));
        assert_eq!(second.summary.payment_status, PaymentStatus::Partial);
        assert_eq!(second.summary.remaining_balance, rupees(dec!(500)));

        let summary = ledger.delete_payment(first.payment_id).await.unwrap();
        assert_eq!(summary.total_paid, rupees(dec!(200)));
        assert_eq!(summary.payment_status, PaymentStatus::Partial);
        assert_eq!(summary.remaining_balance, rupees(dec!(800)));

        let inv = ledger.db().invoices().get_by_id(invoice_id).await.unwrap().unwrap();
        assert_eq!(inv.total_paid, rupees(dec!(200)));
        assert_eq!(inv.payment_status, PaymentStatus::Partial);

        let rows = ledger.db().payments().list_for_invoice(invoice_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].method, PaymentMethod::Upi);

        let summary = ledger.delete_payment(second.payment_id).await.unwrap();
        assert!(summary.total_paid.is_zero());
        assert_eq!(summary.payment_status, PaymentStatus::Pending);

        let err = ledger.delete_payment(second.payment_id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_overpayment_rejected_without_mutation() {
        let ledger = fixtures::ledger().await;
        let invoice_id = thousand_rupee_invoice(&ledger).await;

        ledger
            .record_payment(invoice_id, &PaymentRequest::new(rupees(dec!(900))))
            .await
            .unwrap();
        let err = ledger
            .record_payment(invoice_id, &PaymentRequest::new(rupees(dec!(100.02))))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Overpayment);

        let inv = ledger.db().invoices().get_by_id(invoice_id).await.unwrap().unwrap();
        assert_eq!(inv.total_paid, rupees(dec!(900)));

        // One paisa of slack is accepted.
        let paid = ledger
            .record_payment(invoice_id, &PaymentRequest::new(rupees(dec!(100.01))))
            .await
            .unwrap();
        assert_eq!(paid.summary.payment_status, PaymentStatus::Paid);
        assert!(paid.summary.remaining_balance.is_zero());
    }

    #[tokio::test]
    async fn test_balance_comes_from_payment_rows() {
        let ledger = fixtures::ledger().await;
        let invoice_id = thousand_rupee_invoice(&ledger).await;

        ledger
            .record_payment(invoice_id, &PaymentRequest::new(rupees(dec!(900))))
            .await
            .unwrap();
        // Drift the cached total behind the ledger's back.
        sqlx::query("UPDATE invoices SET total_paid = '0' WHERE id = ?1")
            .bind(invoice_id)
            .execute(ledger.db().pool())
            .await
            .unwrap();

        let err = ledger
            .record_payment(invoice_id, &PaymentRequest::new(rupees(dec!(200))))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Overpayment);

        let rows = ledger.db().payments().list_for_invoice(invoice_id).await.unwrap();
        assert_eq!(rows.len(), 1);

        let paid = ledger
            .record_payment(invoice_id, &PaymentRequest::new(rupees(dec!(100))))
            .await
            .unwrap();
        assert_eq!(paid.summary.total_paid, rupees(dec!(1000)));
        assert_eq!(paid.summary.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_payments_keep_totals_consistent() {
        let dir = TempDir::new().unwrap();
        let ledger = fixtures::file_ledger(&dir).await;
        let invoice_id = thousand_rupee_invoice(&ledger).await;

        // 8 x 100 cannot overpay 1000, so every rejection is a lost race.
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .record_payment(invoice_id, &PaymentRequest::new(rupees(dec!(100))))
                    .await
            }));
        }

        let mut recorded = 0i64;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => recorded += 1,
                Err(err) => {
                    assert_eq!(err.code(), ErrorCode::Conflict, "{err}");
                    assert!(err.is_retryable());
                }
            }
        }
        assert!(recorded >= 1);

        let rows = ledger.db().payments().list_for_invoice(invoice_id).await.unwrap();
        assert_eq!(rows.len() as i64, recorded);
        let row_sum: Money = rows.iter().map(|p| p.amount).sum();

        let inv = ledger.db().invoices().get_by_id(invoice_id).await.unwrap().unwrap();
        assert_eq!(inv.total_paid, row_sum);
        assert_eq!(inv.total_paid, rupees(Decimal::from(100 * recorded)));
        assert!(inv.total_paid <= inv.total_amount + fulfil_core::payment::PAYMENT_TOLERANCE);
    }

    #[tokio::test]
    async fn test_payment_guards() {
        let ledger = fixtures::ledger().await;
        let invoice_id = thousand_rupee_invoice(&ledger).await;

        let err = ledger
            .record_payment(invoice_id, &PaymentRequest::new(Money::zero()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = ledger
            .record_payment(404, &PaymentRequest::new(rupees(dec!(10))))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        ledger.cancel_invoice(invoice_id).await.unwrap();
        let err = ledger
            .record_payment(invoice_id, &PaymentRequest::new(rupees(dec!(10))))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StateConflict);
    }

    #[tokio::test]
    async fn test_paid_invoice_cannot_be_cancelled() {
        let ledger = fixtures::ledger().await;
        let invoice_id = thousand_rupee_invoice(&ledger).await;

        ledger
            .record_payment(invoice_id, &PaymentRequest::new(rupees(dec!(1000))))
            .await
            .unwrap();
        let err = ledger.cancel_invoice(invoice_id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::StateConflict);
    }
}
