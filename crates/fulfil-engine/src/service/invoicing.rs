//! # Invoicing Operations
//!
//! Sales orders, invoices priced from them, and invoice cancellation.
//!
//! ## Invoice From Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  one transaction                                                        │
//! │                                                                         │
//! │  order (pending) ──► per line: product, stored margin                  │
//! │                          │  resolve_margin(explicit, stored)           │
//! │                          │  explicit and nothing stored ⇒ remember it  │
//! │                          ▼                                              │
//! │                      price_invoice ──► totals, one terminal rounding   │
//! │                          │                                              │
//! │                          ▼                                              │
//! │  sequence::next_number(invoice) ──► invoices + invoice_items           │
//! │                          │                                              │
//! │                          ▼                                              │
//! │  order → invoiced,  dispatch assembled at priority_for_total(total)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::dispatch::{assemble, release_allocations};
use super::{as_pairs, Ledger, LineItem};
use crate::error::LedgerResult;
use fulfil_core::allocation::Shortfall;
use fulfil_core::dispatch::priority_for_total;
use fulfil_core::pricing::{price_invoice, resolve_margin, LineInput};
use fulfil_core::sequence::DocumentKind;
use fulfil_core::validation::{validate_lines, validate_margin};
use fulfil_core::{CoreError, DispatchStatus, InvoiceStatus, Money, OrderStatus};
use fulfil_db::repository::invoice::{self, NewInvoice};
use fulfil_db::repository::{catalog, dispatch, order, payment, sequence};

// =============================================================================
// Requests and Results
// =============================================================================

/// An invoice line. Without a margin the store's stored margin applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub product_id: i64,
    pub quantity: i64,
    pub margin_percentage: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: i64,
    pub order_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCreated {
    pub invoice_id: i64,
    pub invoice_number: String,
    pub total_amount: Money,

    /// The dispatch created with the invoice.
    pub dispatch_id: i64,

    /// Allocation shortfalls of that dispatch.
    pub shortfalls: Vec<Shortfall>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCancelled {
    pub invoice_id: i64,
    pub cancelled_dispatches: Vec<i64>,

    /// Units returned to batches.
    pub released_units: i64,
}

// =============================================================================
// Operations
// =============================================================================

impl Ledger {
    /// Places a sales order numbered `ORD-YYYY-YY/N`.
    pub async fn create_order(&self, store_id: i64, items: &[LineItem]) -> LedgerResult<OrderCreated> {
        let lines = as_pairs(items);
        validate_lines(&lines)?;
        let today = self.today()?;

        let mut tx = self.db.begin().await?;

        catalog::get_store(&mut tx, store_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Store", store_id))?;
        for &(product_id, _) in &lines {
            catalog::get_product(&mut tx, product_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Product", product_id))?;
        }

        let order_number = sequence::next_number(&mut tx, DocumentKind::Order, today).await?;
        let order_id = order::insert_order(&mut tx, &order_number, store_id).await?;
        for &(product_id, quantity) in &lines {
            order::insert_item(&mut tx, order_id, product_id, quantity).await?;
        }
        tx.commit().await?;

        info!(order_id, %order_number, store_id, lines = lines.len(), "Order created");
        Ok(OrderCreated {
            order_id,
            order_number,
        })
    }

    /// Cancels a pending order.
    pub async fn cancel_order(&self, order_id: i64) -> LedgerResult<()> {
        let mut tx = self.db.begin().await?;

        let current = order::get_order(&mut tx, order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;
        if current.status != OrderStatus::Pending {
            return Err(
                CoreError::conflict("Order", &current.order_number, "only pending orders can be cancelled")
                    .into(),
            );
        }

        order::transition_status(&mut tx, order_id, OrderStatus::Pending, OrderStatus::Cancelled)
            .await?;
        tx.commit().await?;

        info!(order_id, "Order cancelled");
        Ok(())
    }

    /// Prices and invoices a pending order, then dispatches it.
    ///
    /// ## Errors
    /// - `Validation` for empty or malformed lines or an out-of-range margin
    /// - `NotFound` for an unknown order or product
    /// - `StateConflict` if the order is not pending
    pub async fn create_invoice_from_order(
        &self,
        order_id: i64,
        items: &[InvoiceLine],
        is_igst: bool,
    ) -> LedgerResult<InvoiceCreated> {
        let pairs: Vec<(i64, i64)> = items.iter().map(|i| (i.product_id, i.quantity)).collect();
        validate_lines(&pairs)?;
        for margin in items.iter().filter_map(|i| i.margin_percentage) {
            validate_margin(margin)?;
        }
        let today = self.today()?;

        let mut tx = self.db.begin().await?;

        let source = order::get_order(&mut tx, order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;
        if source.status != OrderStatus::Pending {
            return Err(
                CoreError::conflict("Order", &source.order_number, "order is not pending").into(),
            );
        }

        let mut inputs = Vec::with_capacity(items.len());
        for item in items {
            let product = catalog::get_product(&mut tx, item.product_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Product", item.product_id))?;

            let stored = catalog::get_margin(&mut tx, source.store_id, product.id).await?;
            let margin = resolve_margin(item.margin_percentage, stored);
            if margin.persist {
                catalog::insert_margin_if_absent(
                    &mut tx,
                    source.store_id,
                    product.id,
                    margin.margin_percentage,
                )
                .await?;
            }

            inputs.push(LineInput {
                product_id: product.id,
                quantity: item.quantity,
                base_price: product.base_price(),
                margin_percentage: margin.margin_percentage,
                gst_rate: product.gst_rate,
            });
        }

        let (priced, totals) = price_invoice(&inputs, is_igst)?;

        let invoice_number = sequence::next_number(&mut tx, DocumentKind::Invoice, today).await?;
        let invoice_id = invoice::insert_invoice(
            &mut tx,
            &NewInvoice {
                invoice_number: invoice_number.clone(),
                order_id: Some(source.id),
                store_id: source.store_id,
                is_igst,
                totals,
            },
        )
        .await?;
        for line in &priced {
            invoice::insert_item(&mut tx, invoice_id, line).await?;
        }

        order::transition_status(&mut tx, order_id, OrderStatus::Pending, OrderStatus::Invoiced)
            .await?;

        // New invoice lines ship in full, so quantity_shipped == quantity.
        let dispatch_lines: Vec<(i64, i64)> = priced.iter().map(|l| (l.product_id, l.quantity)).collect();
        let dispatched = assemble(
            &mut tx,
            invoice_id,
            &dispatch_lines,
            priority_for_total(totals.total_amount),
            None,
        )
        .await?;

        tx.commit().await?;

        info!(
            invoice_id,
            %invoice_number,
            order_id,
            total = %totals.total_amount,
            dispatch_id = dispatched.dispatch_id,
            "Invoice created from order"
        );
        Ok(InvoiceCreated {
            invoice_id,
            invoice_number,
            total_amount: totals.total_amount,
            dispatch_id: dispatched.dispatch_id,
            shortfalls: dispatched.shortfalls,
        })
    }

    /// Cancels a pending invoice that has no payments.
    ///
    /// Its pending and ready dispatches are cancelled with their
    /// allocations released, and the source order returns to pending.
    /// Fails if any dispatch has already left, been delivered, or been
    /// combined.
    pub async fn cancel_invoice(&self, invoice_id: i64) -> LedgerResult<InvoiceCancelled> {
        let mut tx = self.db.begin().await?;

        let current = invoice::get_invoice(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Invoice", invoice_id))?;
        if current.status != InvoiceStatus::Pending {
            return Err(CoreError::conflict(
                "Invoice",
                &current.invoice_number,
                format!("invoice is {}", current.status.as_str()),
            )
            .into());
        }
        if !payment::amounts_for_invoice(&mut tx, invoice_id).await?.is_empty() {
            return Err(CoreError::conflict(
                "Invoice",
                &current.invoice_number,
                "payments are recorded against it",
            )
            .into());
        }

        let dispatches = dispatch::list_for_invoice(&mut tx, invoice_id).await?;
        if let Some(blocking) = dispatches.iter().find(|d| {
            matches!(
                d.status,
                DispatchStatus::InTransit | DispatchStatus::Delivered | DispatchStatus::Combined
            )
        }) {
            return Err(CoreError::conflict(
                "Invoice",
                &current.invoice_number,
                format!("dispatch {} is {}", blocking.id, blocking.status.as_str()),
            )
            .into());
        }

        let mut cancelled_dispatches = Vec::new();
        let mut released_units = 0;
        for d in dispatches.iter().filter(|d| d.status != DispatchStatus::Cancelled) {
            released_units += release_allocations(&mut tx, d.id).await?;
            dispatch::transition_status(&mut tx, d.id, d.status, DispatchStatus::Cancelled).await?;
            cancelled_dispatches.push(d.id);
        }

        invoice::transition_status(&mut tx, invoice_id, InvoiceStatus::Pending, InvoiceStatus::Cancelled)
            .await?;
        if let Some(order_id) = current.order_id {
            order::transition_status(&mut tx, order_id, OrderStatus::Invoiced, OrderStatus::Pending)
                .await?;
        }
        tx.commit().await?;

        info!(
            invoice_id,
            dispatches = cancelled_dispatches.len(),
            released_units,
            "Invoice cancelled"
        );
        Ok(InvoiceCancelled {
            invoice_id,
            cancelled_dispatches,
            released_units,
        })
    }

    /// Deletes a cancelled invoice with its items and dispatches.
    pub async fn delete_invoice(&self, invoice_id: i64) -> LedgerResult<()> {
        let mut tx = self.db.begin().await?;

        let current = invoice::get_invoice(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Invoice", invoice_id))?;
        if current.status != InvoiceStatus::Cancelled {
            return Err(CoreError::conflict(
                "Invoice",
                &current.invoice_number,
                "only cancelled invoices can be deleted",
            )
            .into());
        }

        invoice::delete_cancelled(&mut tx, invoice_id).await?;
        tx.commit().await?;

        info!(invoice_id, invoice_number = %current.invoice_number, "Invoice deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
