//! # Payment Ledger Rules
//!
//! `total_paid` is never incremented. Every insert or delete re-reads all
//! payment rows of the invoice and derives paid amount, status and balance
//! from them.
//!
//! ```text
//! invoice 1000 ── pay 300 ──► paid 300  partial
//!              ── pay 200 ──► paid 500  partial
//!              ── delete 300 ► paid 200 partial   (Σ of remaining rows)
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Invoice, InvoiceStatus, PaymentStatus};
use crate::validation::validate_payment_amount;

/// Slack allowed over the outstanding balance (one paisa).
pub const PAYMENT_TOLERANCE: Money = Money::from_rupees(Decimal::from_parts(1, 0, 0, false, 2));

/// Derived payment state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub total_paid: Money,
    pub payment_status: PaymentStatus,
    pub remaining_balance: Money,
}

/// Checks a new payment against the invoice.
///
/// `total_paid` is the sum of the invoice's payment rows. The cached
/// `invoice.total_paid` is not consulted.
///
/// ## Errors
/// - `Validation` for non-positive amounts
/// - `StateConflict` for cancelled invoices
/// - `Overpayment` when `amount > total_amount - total_paid + 0.01`
pub fn ensure_payable(invoice: &Invoice, total_paid: Money, amount: Money) -> CoreResult<()> {
    validate_payment_amount(amount)?;

    if invoice.status == InvoiceStatus::Cancelled {
        return Err(CoreError::conflict(
            "Invoice",
            &invoice.invoice_number,
            "cannot record payments on a cancelled invoice",
        ));
    }

    let balance = invoice.total_amount - total_paid;
    if amount > balance + PAYMENT_TOLERANCE {
        return Err(CoreError::Overpayment { amount, balance });
    }

    Ok(())
}

/// Status implied by a paid amount.
pub fn derive_payment_status(total_paid: Money, total_amount: Money) -> PaymentStatus {
    if total_paid >= total_amount {
        PaymentStatus::Paid
    } else if total_paid.is_positive() {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Pending
    }
}

/// Recomputes the summary from every payment row of the invoice.
pub fn summarize<I>(total_amount: Money, payments: I) -> PaymentSummary
where
    I: IntoIterator<Item = Money>,
{
    let total_paid: Money = payments.into_iter().sum();
    let balance = total_amount - total_paid;

    PaymentSummary {
        total_paid,
        payment_status: derive_payment_status(total_paid, total_amount),
        remaining_balance: if balance.is_negative() {
            Money::zero()
        } else {
            balance
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
