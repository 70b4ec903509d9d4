//! # Dispatch Operations
//!
//! Builds dispatches from invoices, allocates their units from product
//! batches oldest first, and drives the dispatch state machines.
//!
//! ## Allocation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  for each line (product, qty):                                         │
//! │       │                                                                 │
//! │       ├── batch::stock_for_product      every batch, FIFO order        │
//! │       ├── plan_fifo                     Untracked | Allocated          │
//! │       │                                                                 │
//! │       ├── for each planned take:                                       │
//! │       │     batch::decrement            guarded: remaining >= take     │
//! │       │     dispatch::insert_allocation audit row                      │
//! │       │                                                                 │
//! │       ├── products.stock_quantity -= allocated                         │
//! │       └── shortfall > 0 ──► warn!, reported to the caller              │
//! │                                                                         │
//! │  Cancelling a dispatch walks the audit rows backwards:                 │
//! │  batch::restore, stock += qty, allocations deleted.                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## State Machine
//! ```text
//! pending ──► ready ──► in_transit ──► delivered
//!    │          │
//!    └──────────┴──► cancelled
//!
//! pending + small ──► combined     (combine_small_orders only)
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use super::{as_pairs, Ledger, LineItem};
use crate::error::LedgerResult;
use fulfil_core::allocation::{plan_fifo, AllocationPlan, Shortfall};
use fulfil_core::dispatch::{
    ensure_combinable, ensure_transition, is_small_order, member_status_for, DEFAULT_PRIORITY,
};
use fulfil_core::validation::{validate_lines, validate_priority};
use fulfil_core::{CoreError, DispatchStatus, InvoiceStatus};
use fulfil_db::repository::{batch, catalog, dispatch, invoice};

// =============================================================================
// Results
// =============================================================================

/// Units of one product taken from one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAllocation {
    pub product_id: i64,
    pub batch_id: i64,
    pub quantity: i64,
}

/// Outcome of creating a dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchCreated {
    pub dispatch_id: i64,
    pub is_small_order: bool,
    pub priority: u8,
    pub batch_allocations: Vec<LineAllocation>,

    /// Lines that batches could not fully cover. The dispatch exists anyway.
    pub shortfalls: Vec<Shortfall>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedDispatchCreated {
    pub combined_dispatch_id: i64,
    pub priority: u8,
}

/// Conservation check for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchAudit {
    pub batch_id: i64,
    pub quantity_produced: i64,
    pub quantity_remaining: i64,
    pub allocated: i64,

    /// `remaining + allocated == produced`.
    pub balanced: bool,
}

// =============================================================================
// Transaction Steps
// =============================================================================

/// Inserts a dispatch for `lines` and allocates each line FIFO.
pub(crate) async fn assemble(
    conn: &mut SqliteConnection,
    invoice_id: i64,
    lines: &[(i64, i64)],
    priority: u8,
    notes: Option<&str>,
) -> LedgerResult<DispatchCreated> {
    let small = is_small_order(lines);

    let dispatch_id = dispatch::insert_dispatch(
        conn,
        &dispatch::NewDispatch {
            invoice_id,
            priority,
            is_small_order: small,
            notes: notes.map(str::to_string),
        },
    )
    .await?;

    let mut batch_allocations = Vec::new();
    let mut shortfalls = Vec::new();

    for &(product_id, quantity) in lines {
        dispatch::insert_item(conn, dispatch_id, product_id, quantity).await?;

        let stock = batch::stock_for_product(conn, product_id).await?;
        let plan = plan_fifo(&stock, quantity);

        if let AllocationPlan::Untracked = plan {
            debug!(dispatch_id, product_id, "Product has no batches; allocation skipped");
            continue;
        }

        for take in plan.allocations() {
            batch::decrement(conn, take.batch_id, take.quantity).await?;
            dispatch::insert_allocation(conn, dispatch_id, take.batch_id, product_id, take.quantity)
                .await?;
            batch_allocations.push(LineAllocation {
                product_id,
                batch_id: take.batch_id,
                quantity: take.quantity,
            });
        }

        let allocated = plan.allocated();
        if allocated > 0 {
            catalog::adjust_product_stock(conn, product_id, -allocated).await?;
        }

        if plan.shortfall() > 0 {
            warn!(
                dispatch_id,
                product_id,
                requested = quantity,
                allocated,
                "Batch stock short for dispatch line"
            );
            shortfalls.push(Shortfall {
                product_id,
                requested: quantity,
                allocated,
            });
        }
    }

    Ok(DispatchCreated {
        dispatch_id,
        is_small_order: small,
        priority,
        batch_allocations,
        shortfalls,
    })
}

/// Returns every unit a dispatch holds to its batches and product stock.
pub(crate) async fn release_allocations(
    conn: &mut SqliteConnection,
    dispatch_id: i64,
) -> LedgerResult<i64> {
    let allocations = dispatch::get_allocations(conn, dispatch_id).await?;

    let mut per_product: BTreeMap<i64, i64> = BTreeMap::new();
    for allocation in &allocations {
        batch::restore(conn, allocation.batch_id, allocation.quantity).await?;
        *per_product.entry(allocation.product_id).or_default() += allocation.quantity;
    }
    for (product_id, quantity) in &per_product {
        catalog::adjust_product_stock(conn, *product_id, *quantity).await?;
    }
    dispatch::delete_allocations(conn, dispatch_id).await?;

    let released: i64 = per_product.values().sum();
    debug!(dispatch_id, released, "Released dispatch allocations");
    Ok(released)
}

// =============================================================================
// Operations
// =============================================================================

impl Ledger {
    /// Creates a dispatch against an invoice, allocating batch stock FIFO.
    ///
    /// Succeeds on partial or absent allocation; see
    /// [`DispatchCreated::shortfalls`].
    ///
    /// ## Errors
    /// - `Validation` for empty or malformed lines, or a priority outside 1..=10
    /// - `NotFound` for an unknown invoice or product
    /// - `StateConflict` if the invoice is cancelled
    pub async fn create_dispatch(
        &self,
        invoice_id: i64,
        items: &[LineItem],
        priority: Option<i64>,
        notes: Option<&str>,
    ) -> LedgerResult<DispatchCreated> {
        let lines = as_pairs(items);
        validate_lines(&lines)?;
        let priority = priority
            .map(validate_priority)
            .transpose()?
            .unwrap_or(DEFAULT_PRIORITY);

        let mut tx = self.db.begin().await?;

        let inv = invoice::get_invoice(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Invoice", invoice_id))?;
        if inv.status == InvoiceStatus::Cancelled {
            return Err(CoreError::conflict(
                "Invoice",
                &inv.invoice_number,
                "cannot dispatch a cancelled invoice",
            )
            .into());
        }
        for &(product_id, _) in &lines {
            catalog::get_product(&mut tx, product_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Product", product_id))?;
        }

        let created = assemble(&mut tx, invoice_id, &lines, priority, notes).await?;
        tx.commit().await?;

        info!(
            dispatch_id = created.dispatch_id,
            invoice_id,
            small = created.is_small_order,
            allocations = created.batch_allocations.len(),
            shortfalls = created.shortfalls.len(),
            "Dispatch created"
        );
        Ok(created)
    }

    /// Moves a dispatch along its state machine.
    ///
    /// Cancelling releases the dispatch's batch allocations.
    pub async fn update_dispatch_status(&self, dispatch_id: i64, next: DispatchStatus) -> LedgerResult<()> {
        let mut tx = self.db.begin().await?;

        let current = dispatch::get_dispatch(&mut tx, dispatch_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Dispatch", dispatch_id))?;
        ensure_transition("Dispatch", dispatch_id, current.status, next)?;

        let released = if next == DispatchStatus::Cancelled {
            release_allocations(&mut tx, dispatch_id).await?
        } else {
            0
        };
        dispatch::transition_status(&mut tx, dispatch_id, current.status, next).await?;
        tx.commit().await?;

        info!(
            dispatch_id,
            from = current.status.as_str(),
            to = next.as_str(),
            released,
            "Dispatch status updated"
        );
        Ok(())
    }

    /// Groups pending small dispatches into one combined dispatch.
    ///
    /// Every id is read in the same transaction; if any is missing, not
    /// pending or not small, nothing changes. Without an explicit priority
    /// the combined dispatch takes the highest member priority.
    pub async fn combine_small_orders(
        &self,
        dispatch_ids: &[i64],
        priority: Option<i64>,
        notes: Option<&str>,
    ) -> LedgerResult<CombinedDispatchCreated> {
        let priority = priority.map(validate_priority).transpose()?;

        let mut tx = self.db.begin().await?;

        let found = dispatch::get_many(&mut tx, dispatch_ids).await?;
        ensure_combinable(dispatch_ids, &found)?;

        let priority = priority.unwrap_or_else(|| {
            found
                .iter()
                .map(|d| d.priority)
                .max()
                .unwrap_or(DEFAULT_PRIORITY)
        });

        let combined_dispatch_id = dispatch::insert_combined(&mut tx, priority, notes).await?;
        dispatch::attach_to_combined(&mut tx, combined_dispatch_id, dispatch_ids).await?;
        tx.commit().await?;

        info!(
            combined_dispatch_id,
            members = dispatch_ids.len(),
            priority,
            "Small orders combined"
        );
        Ok(CombinedDispatchCreated {
            combined_dispatch_id,
            priority,
        })
    }

    /// Moves a combined dispatch along the dispatch state machine.
    ///
    /// Delivered carries members to delivered; cancelled returns them to
    /// pending and unlinks them. Other states leave members combined.
    pub async fn update_combined_status(
        &self,
        combined_dispatch_id: i64,
        next: DispatchStatus,
    ) -> LedgerResult<()> {
        let mut tx = self.db.begin().await?;

        let current = dispatch::get_combined(&mut tx, combined_dispatch_id)
            .await?
            .ok_or_else(|| CoreError::not_found("CombinedDispatch", combined_dispatch_id))?;
        ensure_transition("CombinedDispatch", combined_dispatch_id, current.status, next)?;

        dispatch::transition_combined(&mut tx, combined_dispatch_id, current.status, next).await?;

        let members = match member_status_for(next) {
            Some(DispatchStatus::Delivered) => {
                dispatch::deliver_members(&mut tx, combined_dispatch_id).await?
            }
            Some(_) => dispatch::release_members(&mut tx, combined_dispatch_id).await?,
            None => 0,
        };
        tx.commit().await?;

        info!(
            combined_dispatch_id,
            to = next.as_str(),
            members,
            "Combined dispatch status updated"
        );
        Ok(())
    }

    /// Checks `remaining + allocated == produced` for a batch.
    pub async fn batch_audit(&self, batch_id: i64) -> LedgerResult<BatchAudit> {
        let batches = self.db.batches();
        let found = batches
            .get_by_id(batch_id)
            .await?
            .ok_or_else(|| CoreError::not_found("ProductBatch", batch_id))?;
        let allocated = batches.allocated_total(batch_id).await?;

        Ok(BatchAudit {
            batch_id,
            quantity_produced: found.quantity_produced,
            quantity_remaining: found.quantity_remaining,
            allocated,
            balanced: found.quantity_remaining + allocated == found.quantity_produced,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::service::fixtures::{self, date};
    use fulfil_core::BatchStatus;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fifo_takes_oldest_batch_first() {
        let ledger = fixtures::ledger().await;
        let store = fixtures::store(&ledger).await;
        let ghee = fixtures::product(&ledger, "GHEE-500", dec!(320), dec!(12)).await;

        // No batches yet, so the invoice's own dispatch allocates nothing.
        let inv = fixtures::invoice(&ledger, store.id, &[LineItem::new(ghee.id, 8)]).await;

        let b2 = fixtures::batch(&ledger, ghee.id, date(2024, 1, 3), 10).await;
        let b1 = fixtures::batch(&ledger, ghee.id, date(2024, 1, 1), 5).await;

        let created = ledger
            .create_dispatch(inv.invoice_id, &[LineItem::new(ghee.id, 8)], None, None)
            .await
            .unwrap();

        assert_eq!(
            created.batch_allocations,
            vec![
                LineAllocation { product_id: ghee.id, batch_id: b1, quantity: 5 },
                LineAllocation { product_id: ghee.id, batch_id: b2, quantity: 3 },
            ]
        );
        assert!(created.shortfalls.is_empty());

        let first = ledger.db().batches().get_by_id(b1).await.unwrap().unwrap();
        assert_eq!(first.status, BatchStatus::Depleted);
        let second = ledger.db().batches().get_by_id(b2).await.unwrap().unwrap();
        assert_eq!(second.quantity_remaining, 7);

        let product = ledger.db().catalog().get_product(ghee.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 7);
    }

    #[tokio::test]
    async fn test_shortfall_is_reported_not_fatal() {
        let ledger = fixtures::ledger().await;
        let store = fixtures::store(&ledger).await;
        let ghee = fixtures::product(&ledger, "GHEE-500", dec!(320), dec!(12)).await;
        let inv = fixtures::invoice(&ledger, store.id, &[LineItem::new(ghee.id, 1)]).await;
        let b1 = fixtures::batch(&ledger, ghee.id, date(2024, 2, 1), 4).await;

        let created = ledger
            .create_dispatch(inv.invoice_id, &[LineItem::new(ghee.id, 10)], Some(4), None)
            .await
            .unwrap();

        assert_eq!(created.priority, 4);
        assert_eq!(created.batch_allocations.len(), 1);
        assert_eq!(created.shortfalls.len(), 1);
        assert_eq!(created.shortfalls[0].missing(), 6);

        let audit = ledger.batch_audit(b1).await.unwrap();
        assert_eq!(audit.quantity_remaining, 0);
        assert_eq!(audit.allocated, 4);
        assert!(audit.balanced);
    }

    #[tokio::test]
    async fn test_untracked_product_skips_allocation() {
        let ledger = fixtures::ledger().await;
        let store = fixtures::store(&ledger).await;
        let ghee = fixtures::product(&ledger, "GHEE-500", dec!(320), dec!(12)).await;

        let inv = fixtures::invoice(&ledger, store.id, &[LineItem::new(ghee.id, 3)]).await;
        let allocations = ledger
            .db()
            .dispatches()
            .get_allocations(inv.dispatch_id)
            .await
            .unwrap();
        assert!(allocations.is_empty());
        assert!(inv.shortfalls.is_empty());
    }

    #[tokio::test]
    async fn test_priority_out_of_range_rejected() {
        let ledger = fixtures::ledger().await;
        let store = fixtures::store(&ledger).await;
        let ghee = fixtures::product(&ledger, "GHEE-500", dec!(320), dec!(12)).await;
        let inv = fixtures::invoice(&ledger, store.id, &[LineItem::new(ghee.id, 1)]).await;

        let err = ledger
            .create_dispatch(inv.invoice_id, &[LineItem::new(ghee.id, 1)], Some(11), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_repeated_product_line_rejected() {
        let ledger = fixtures::ledger().await;
        let store = fixtures::store(&ledger).await;
        let ghee = fixtures::product(&ledger, "GHEE-500", dec!(320), dec!(12)).await;
        let inv = fixtures::invoice(&ledger, store.id, &[LineItem::new(ghee.id, 2)]).await;
        let b1 = fixtures::batch(&ledger, ghee.id, date(2024, 2, 1), 10).await;

        let err = ledger
            .create_dispatch(
                inv.invoice_id,
                &[LineItem::new(ghee.id, 1), LineItem::new(ghee.id, 1)],
                None,
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let audit = ledger.batch_audit(b1).await.unwrap();
        assert_eq!(audit.quantity_remaining, 10);
        assert_eq!(audit.allocated, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_dispatches_never_oversell_a_batch() {
        let dir = TempDir::new().unwrap();
        let ledger = fixtures::file_ledger(&dir).await;
        let store = fixtures::store(&ledger).await;
        let ghee = fixtures::product(&ledger, "GHEE-500", dec!(320), dec!(12)).await;
        let inv = fixtures::invoice(&ledger, store.id, &[LineItem::new(ghee.id, 18)]).await;
        // Created after the invoice so its own dispatch allocates nothing.
        let b1 = fixtures::batch(&ledger, ghee.id, date(2024, 2, 1), 20).await;

        let mut handles = Vec::new();
        for _ in 0..6 {
            let ledger = ledger.clone();
            let invoice_id = inv.invoice_id;
            let product_id = ghee.id;
            handles.push(tokio::spawn(async move {
                ledger
                    .create_dispatch(invoice_id, &[LineItem::new(product_id, 3)], None, None)
                    .await
            }));
        }

        let mut created = 0i64;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(dispatch) => {
                    assert!(dispatch.shortfalls.is_empty());
                    created += 1;
                }
                Err(err) => {
                    assert_eq!(err.code(), ErrorCode::Conflict, "{err}");
                    assert!(err.is_retryable());
                }
            }
        }
        assert!(created >= 1);

        let audit = ledger.batch_audit(b1).await.unwrap();
        assert!(audit.balanced);
        assert_eq!(audit.allocated, 3 * created);
        assert_eq!(audit.quantity_remaining, 20 - 3 * created);

        let product = ledger.db().catalog().get_product(ghee.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 20 - 3 * created);
    }

    #[tokio::test]
    async fn test_small_order_classification() {
        let ledger = fixtures::ledger().await;
        let store = fixtures::store(&ledger).await;
        let mut products = Vec::new();
        for sku in ["GHEE-500", "GHEE-1L", "PANEER-200", "CURD-400"] {
            products.push(fixtures::product(&ledger, sku, dec!(100), dec!(5)).await);
        }

        // Four products but only four units: small.
        let few_units: Vec<LineItem> = products.iter().map(|p| LineItem::new(p.id, 1)).collect();
        let inv = fixtures::invoice(&ledger, store.id, &few_units).await;
        let created = ledger
            .create_dispatch(inv.invoice_id, &few_units, None, None)
            .await
            .unwrap();
        assert!(created.is_small_order);

        // Four products and ten units: not small.
        let many_units: Vec<LineItem> = products.iter().map(|p| LineItem::new(p.id, 3)).collect();
        let created = ledger
            .create_dispatch(inv.invoice_id, &many_units, None, None)
            .await
            .unwrap();
        assert!(!created.is_small_order);

        // Three products of any size: small.
        let created = ledger
            .create_dispatch(inv.invoice_id, &many_units[..3], None, None)
            .await
            .unwrap();
        assert!(created.is_small_order);
    }

    #[tokio::test]
    async fn test_cancel_releases_allocations() {
        let ledger = fixtures::ledger().await;
        let store = fixtures::store(&ledger).await;
        let ghee = fixtures::product(&ledger, "GHEE-500", dec!(320), dec!(12)).await;
        let b1 = fixtures::batch(&ledger, ghee.id, date(2024, 3, 1), 6).await;

        let inv = fixtures::invoice(&ledger, store.id, &[LineItem::new(ghee.id, 6)]).await;
        assert_eq!(ledger.batch_audit(b1).await.unwrap().quantity_remaining, 0);

        ledger
            .update_dispatch_status(inv.dispatch_id, DispatchStatus::Cancelled)
            .await
            .unwrap();

        let audit = ledger.batch_audit(b1).await.unwrap();
        assert_eq!(audit.quantity_remaining, 6);
        assert_eq!(audit.allocated, 0);
        assert!(audit.balanced);
        let batch = ledger.db().batches().get_by_id(b1).await.unwrap().unwrap();
        assert_eq!(batch.status, BatchStatus::Available);
        let product = ledger.db().catalog().get_product(ghee.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 6);
    }

    #[tokio::test]
    async fn test_illegal_transition_is_state_conflict() {
        let ledger = fixtures::ledger().await;
        let store = fixtures::store(&ledger).await;
        let ghee = fixtures::product(&ledger, "GHEE-500", dec!(320), dec!(12)).await;
        let inv = fixtures::invoice(&ledger, store.id, &[LineItem::new(ghee.id, 1)]).await;

        let err = ledger
            .update_dispatch_status(inv.dispatch_id, DispatchStatus::Delivered)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StateConflict);

        for next in [DispatchStatus::Ready, DispatchStatus::InTransit, DispatchStatus::Delivered] {
            ledger.update_dispatch_status(inv.dispatch_id, next).await.unwrap();
        }
        let err = ledger
            .update_dispatch_status(inv.dispatch_id, DispatchStatus::Cancelled)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StateConflict);
    }

    #[tokio::test]
    async fn test_combine_is_all_or_nothing() {
        let ledger = fixtures::ledger().await;
        let store = fixtures::store(&ledger).await;
        let ghee = fixtures::product(&ledger, "GHEE-500", dec!(320), dec!(12)).await;
        let a = fixtures::invoice(&ledger, store.id, &[LineItem::new(ghee.id, 1)]).await;
        let b = fixtures::invoice(&ledger, store.id, &[LineItem::new(ghee.id, 2)]).await;

        ledger
            .update_dispatch_status(b.dispatch_id, DispatchStatus::Ready)
            .await
            .unwrap();

        let err = ledger
            .combine_small_orders(&[a.dispatch_id, b.dispatch_id], None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StateConflict);

        let unchanged = ledger
            .db()
            .dispatches()
            .get_by_id(a.dispatch_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.status, DispatchStatus::Pending);
        assert_eq!(unchanged.combined_dispatch_id, None);

        let err = ledger
            .combine_small_orders(&[a.dispatch_id], None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_combined_lifecycle_moves_members() {
        let ledger = fixtures::ledger().await;
        let store = fixtures::store(&ledger).await;
        let ghee = fixtures::product(&ledger, "GHEE-500", dec!(320), dec!(12)).await;
        let a = fixtures::invoice(&ledger, store.id, &[LineItem::new(ghee.id, 1)]).await;
        let b = fixtures::invoice(&ledger, store.id, &[LineItem::new(ghee.id, 2)]).await;
        let c = fixtures::invoice(&ledger, store.id, &[LineItem::new(ghee.id, 3)]).await;

        let combined = ledger
            .combine_small_orders(&[a.dispatch_id, b.dispatch_id], None, Some("north route"))
            .await
            .unwrap();
        assert_eq!(combined.priority, 1);

        ledger
            .update_combined_status(combined.combined_dispatch_id, DispatchStatus::Cancelled)
            .await
            .unwrap();
        let member = ledger
            .db()
            .dispatches()
            .get_by_id(a.dispatch_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(member.status, DispatchStatus::Pending);
        assert_eq!(member.combined_dispatch_id, None);

        let combined = ledger
            .combine_small_orders(&[b.dispatch_id, c.dispatch_id], Some(5), None)
            .await
            .unwrap();
        for next in [DispatchStatus::Ready, DispatchStatus::InTransit] {
            ledger
                .update_combined_status(combined.combined_dispatch_id, next)
                .await
                .unwrap();
        }
        let members = ledger
            .db()
            .dispatches()
            .list_members(combined.combined_dispatch_id)
            .await
            .unwrap();
        assert!(members.iter().all(|d| d.status == DispatchStatus::Combined));

        ledger
            .update_combined_status(combined.combined_dispatch_id, DispatchStatus::Delivered)
            .await
            .unwrap();
        let members = ledger
            .db()
            .dispatches()
            .list_members(combined.combined_dispatch_id)
            .await
            .unwrap();
        assert_eq!(members.len(), 2);
        assert!(members.iter().all(|d| d.status == DispatchStatus::Delivered));
    }
}
