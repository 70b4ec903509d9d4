//! # Production Operations
//!
//! Production orders from planning to completion. Completion is where raw
//! materials turn into a new product batch.
//!
//! ## Completion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  one transaction                                                        │
//! │                                                                         │
//! │  ratio = produced / planned                                             │
//! │                                                                         │
//! │  for each planned material:                                             │
//! │      used = required × ratio                                            │
//! │      raw_materials.stock_quantity -= used     (may go negative)         │
//! │      production_materials.quantity_used = used                          │
//! │                                                                         │
//! │  products.stock_quantity += produced                                    │
//! │  product_batches ← BATCH-YYYYMMDD-NNN, quantity_remaining = produced   │
//! │  production_orders.status = completed                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::Ledger;
use crate::error::LedgerResult;
use fulfil_core::production::{
    actual_usage, batch_number, ensure_cancellable, ensure_completable, ensure_material_available,
    ensure_startable, usage_ratio,
};
use fulfil_core::sequence::DocumentKind;
use fulfil_core::validation::{validate_decimal_quantity, validate_distinct_ids, validate_quantity};
use fulfil_core::CoreError;
use fulfil_db::repository::batch::{self, NewBatch};
use fulfil_db::repository::{catalog, production, sequence};

/// Planned consumption of one raw material for the full order quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRequirement {
    pub raw_material_id: i64,
    pub quantity_required: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionOrderCreated {
    pub production_order_id: i64,
    pub order_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionCompleted {
    pub batch_id: i64,
    pub batch_number: String,
    pub quantity_produced: i64,
}

impl Ledger {
    /// Plans a production order numbered `PROD-YYYY-YY/N`.
    ///
    /// Every material must have at least the required quantity in stock.
    ///
    /// ## Errors
    /// - `Validation` for a non-positive quantity or duplicate materials
    /// - `NotFound` for an unknown product or raw material
    /// - `InsufficientMaterial` when stock is below a requirement
    pub async fn create_production_order(
        &self,
        product_id: i64,
        quantity_to_produce: i64,
        materials: &[MaterialRequirement],
    ) -> LedgerResult<ProductionOrderCreated> {
        validate_quantity(quantity_to_produce)?;
        for m in materials {
            validate_decimal_quantity("quantity_required", m.quantity_required)?;
        }
        let material_ids: Vec<i64> = materials.iter().map(|m| m.raw_material_id).collect();
        validate_distinct_ids("raw_material_id", &material_ids)?;
        let today = self.today()?;

        let mut tx = self.db.begin().await?;

        catalog::get_product(&mut tx, product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;

        for m in materials {
            let material = catalog::get_raw_material(&mut tx, m.raw_material_id)
                .await?
                .ok_or_else(|| CoreError::not_found("RawMaterial", m.raw_material_id))?;
            ensure_material_available(&material.name, material.stock_quantity, m.quantity_required)?;
        }

        let order_number = sequence::next_number(&mut tx, DocumentKind::Production, today).await?;
        let production_order_id =
            production::insert_order(&mut tx, &order_number, product_id, quantity_to_produce).await?;
        for m in materials {
            production::insert_material(
                &mut tx,
                production_order_id,
                m.raw_material_id,
                m.quantity_required,
            )
            .await?;
        }
        tx.commit().await?;

        info!(
            production_order_id,
            %order_number,
            product_id,
            quantity_to_produce,
            materials = materials.len(),
            "Production order created"
        );
        Ok(ProductionOrderCreated {
            production_order_id,
            order_number,
        })
    }

    pub async fn start_production(&self, production_order_id: i64) -> LedgerResult<()> {
        let mut tx = self.db.begin().await?;

        let order = production::get_order(&mut tx, production_order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("ProductionOrder", production_order_id))?;
        ensure_startable(&order)?;
        production::mark_started(&mut tx, production_order_id).await?;
        tx.commit().await?;

        info!(production_order_id, "Production started");
        Ok(())
    }

    /// Cancels a pending or in-progress order. No stock moves.
    pub async fn cancel_production(&self, production_order_id: i64) -> LedgerResult<()> {
        let mut tx = self.db.begin().await?;

        let order = production::get_order(&mut tx, production_order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("ProductionOrder", production_order_id))?;
        ensure_cancellable(&order)?;
        production::mark_cancelled(&mut tx, production_order_id, order.status).await?;
        tx.commit().await?;

        info!(production_order_id, from = order.status.as_str(), "Production cancelled");
        Ok(())
    }

    /// Completes an order, consuming materials in proportion to the yield
    /// and minting a batch dated today.
    ///
    /// `quantity_produced` defaults to the planned quantity.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown order
    /// - `StateConflict` if the order is already completed or cancelled
    /// - `Validation` for a non-positive yield
    pub async fn complete_production(
        &self,
        production_order_id: i64,
        quantity_produced: Option<i64>,
    ) -> LedgerResult<ProductionCompleted> {
        let today = self.today()?;

        let mut tx = self.db.begin().await?;

        let order = production::get_order(&mut tx, production_order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("ProductionOrder", production_order_id))?;
        let produced = ensure_completable(&order, quantity_produced)?;
        let ratio = usage_ratio(produced, order.quantity_to_produce)?;

        for material in production::get_materials(&mut tx, production_order_id).await? {
            let used = actual_usage(material.quantity_required, ratio);
            let remaining =
                catalog::adjust_raw_material_stock(&mut tx, material.raw_material_id, -used).await?;
            if remaining < Decimal::ZERO {
                warn!(
                    production_order_id,
                    raw_material_id = material.raw_material_id,
                    %used,
                    stock = %remaining,
                    "Raw material stock went negative"
                );
            }
            production::set_material_used(&mut tx, material.id, used).await?;
        }

        catalog::adjust_product_stock(&mut tx, order.product_id, produced).await?;

        let minted_today = batch::count_for_day(&mut tx, order.product_id, today).await?;
        let number = batch_number(today, minted_today);
        let batch_id = batch::insert_batch(
            &mut tx,
            &NewBatch {
                product_id: order.product_id,
                batch_number: number.clone(),
                production_date: today,
                quantity: produced,
                production_order_id: Some(production_order_id),
            },
        )
        .await?;

        production::mark_completed(&mut tx, production_order_id, order.status, produced).await?;
        tx.commit().await?;

        info!(
            production_order_id,
            product_id = order.product_id,
            produced,
            planned = order.quantity_to_produce,
            batch_id,
            batch_number = %number,
            "Production completed"
        );
        Ok(ProductionCompleted {
            batch_id,
            batch_number: number,
            quantity_produced: produced,
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
    use crate::service::fixtures;
    use fulfil_core::sequence::FiscalYear;
    use fulfil_core::{BatchStatus, ProductionStatus};
    use rust_decimal_macros::dec;

    fn needs(raw_material_id: i64, quantity_required: Decimal) -> MaterialRequirement {
        MaterialRequirement {
            raw_material_id,
            quantity_required,
        }
    }

    #[tokio::test]
    async fn test_usage_follows_yield() {
        let ledger = fixtures::ledger().await;
        let ghee = fixtures::product(&ledger, "GHEE-500", dec!(320), dec!(12)).await;
        let butter = fixtures::raw_material(&ledger, "Butter", dec!(10)).await;

        let planned = ledger
            .create_production_order(ghee.id, 100, &[needs(butter.id, dec!(2))])
            .await
            .unwrap();
        let label = FiscalYear::from_date(ledger.today().unwrap()).label();
        assert_eq!(planned.order_number, format!("PROD-{label}/1"));

        ledger.start_production(planned.production_order_id).await.unwrap();
        let done = ledger
            .complete_production(planned.production_order_id, Some(80))
            .await
            .unwrap();
        assert_eq!(done.quantity_produced, 80);

        let materials = ledger
            .db()
            .production()
            .get_materials(planned.production_order_id)
            .await
            .unwrap();
        assert_eq!(materials[0].quantity_used, Some(dec!(1.6)));

        let butter = ledger.db().catalog().get_raw_material(butter.id).await.unwrap().unwrap();
        assert_eq!(butter.stock_quantity, dec!(8.4));

        let ghee = ledger.db().catalog().get_product(ghee.id).await.unwrap().unwrap();
        assert_eq!(ghee.stock_quantity, 80);

        let batch = ledger.db().batches().get_by_id(done.batch_id).await.unwrap().unwrap();
        assert_eq!(batch.quantity_produced, 80);
        assert_eq!(batch.quantity_remaining, 80);
        assert_eq!(batch.status, BatchStatus::Available);
        assert_eq!(batch.production_order_id, Some(planned.production_order_id));

        let order = ledger
            .db()
            .production()
            .get_by_id(planned.production_order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, ProductionStatus::Completed);
        assert_eq!(order.quantity_produced, Some(80));
        assert!(order.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_complete_defaults_to_plan_and_only_once() {
        let ledger = fixtures::ledger().await;
        let ghee = fixtures::product(&ledger, "GHEE-500", dec!(320), dec!(12)).await;

        let planned = ledger.create_production_order(ghee.id, 50, &[]).await.unwrap();
        let done = ledger
            .complete_production(planned.production_order_id, None)
            .await
            .unwrap();
        assert_eq!(done.quantity_produced, 50);

        let err = ledger
            .complete_production(planned.production_order_id, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StateConflict);

        let ghee = ledger.db().catalog().get_product(ghee.id).await.unwrap().unwrap();
        assert_eq!(ghee.stock_quantity, 50);
    }

    #[tokio::test]
    async fn test_batches_numbered_per_product_per_day() {
        let ledger = fixtures::ledger().await;
        let ghee = fixtures::product(&ledger, "GHEE-500", dec!(320), dec!(12)).await;
        let oil = fixtures::product(&ledger, "OIL-1L", dec!(180), dec!(5)).await;
        let day = ledger.today().unwrap().format("%Y%m%d").to_string();

        let mut numbers = Vec::new();
        for product_id in [ghee.id, ghee.id, oil.id] {
            let planned = ledger.create_production_order(product_id, 10, &[]).await.unwrap();
            let done = ledger
                .complete_production(planned.production_order_id, None)
                .await
                .unwrap();
            numbers.push(done.batch_number);
        }

        assert_eq!(
            numbers,
            vec![
                format!("BATCH-{day}-001"),
                format!("BATCH-{day}-002"),
                format!("BATCH-{day}-001"),
            ]
        );
    }

    #[tokio::test]
    async fn test_overconsumption_goes_negative() {
        let ledger = fixtures::ledger().await;
        let ghee = fixtures::product(&ledger, "GHEE-500", dec!(320), dec!(12)).await;
        let butter = fixtures::raw_material(&ledger, "Butter", dec!(2)).await;

        let planned = ledger
            .create_production_order(ghee.id, 10, &[needs(butter.id, dec!(2))])
            .await
            .unwrap();
        ledger
            .complete_production(planned.production_order_id, Some(15))
            .await
            .unwrap();

        let butter = ledger.db().catalog().get_raw_material(butter.id).await.unwrap().unwrap();
        assert_eq!(butter.stock_quantity, dec!(-1));
    }

    #[tokio::test]
    async fn test_create_requires_material_stock() {
        let ledger = fixtures::ledger().await;
        let ghee = fixtures::product(&ledger, "GHEE-500", dec!(320), dec!(12)).await;
        let butter = fixtures::raw_material(&ledger, "Butter", dec!(1.5)).await;

        let err = ledger
            .create_production_order(ghee.id, 100, &[needs(butter.id, dec!(2))])
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InsufficientMaterial);

        let err = ledger
            .create_production_order(ghee.id, 100, &[needs(77, dec!(1))])
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err = ledger
            .create_production_order(ghee.id, 100, &[needs(butter.id, dec!(1)), needs(butter.id, dec!(0.5))])
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = ledger.create_production_order(ghee.id, 0, &[]).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_lifecycle_guards() {
        let ledger = fixtures::ledger().await;
        let ghee = fixtures::product(&ledger, "GHEE-500", dec!(320), dec!(12)).await;
        let butter = fixtures::raw_material(&ledger, "Butter", dec!(10)).await;

        let planned = ledger
            .create_production_order(ghee.id, 10, &[needs(butter.id, dec!(4))])
            .await
            .unwrap();
        let id = planned.production_order_id;

        ledger.start_production(id).await.unwrap();
        let err = ledger.start_production(id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::StateConflict);

        let err = ledger.complete_production(id, Some(0)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        let err = ledger
            .complete_production(id, Some(fulfil_core::MAX_LINE_QUANTITY + 1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(ledger.db().batches().list_for_product(ghee.id).await.unwrap().is_empty());

        ledger.cancel_production(id).await.unwrap();
        let err = ledger.complete_production(id, None).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::StateConflict);
        let err = ledger.cancel_production(id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::StateConflict);

        let butter = ledger.db().catalog().get_raw_material(butter.id).await.unwrap().unwrap();
        assert_eq!(butter.stock_quantity, dec!(10));
    }
}
