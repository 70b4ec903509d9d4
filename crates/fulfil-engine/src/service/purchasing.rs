//! Raw-material replenishment.
//!
//! ```text
//! open ──► received    credits raw_materials.stock_quantity
//!   │
//!   └───► cancelled    no stock movement
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::Ledger;
use crate::error::LedgerResult;
use fulfil_core::sequence::DocumentKind;
use fulfil_core::validation::validate_decimal_quantity;
use fulfil_core::{CoreError, PurchaseRequest, PurchaseRequestStatus, RawMaterial};
use fulfil_db::repository::{catalog, purchase, sequence};
use sqlx::SqliteConnection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequestRaised {
    pub purchase_request_id: i64,
    pub request_number: String,
}

async fn open_request(conn: &mut SqliteConnection, id: i64) -> LedgerResult<PurchaseRequest> {
    let request = purchase::get_request(conn, id)
        .await?
        .ok_or_else(|| CoreError::not_found("PurchaseRequest", id))?;
    if request.status != PurchaseRequestStatus::Open {
        return Err(
            CoreError::conflict("PurchaseRequest", &request.request_number, "request is not open")
                .into(),
        );
    }
    Ok(request)
}

impl Ledger {
    /// Raises a request numbered `PR-YYYY-YY/N`.
    pub async fn raise_purchase_request(
        &self,
        raw_material_id: i64,
        quantity: Decimal,
    ) -> LedgerResult<PurchaseRequestRaised> {
        validate_decimal_quantity("quantity", quantity)?;
        let today = self.today()?;

        let mut tx = self.db.begin().await?;

        catalog::get_raw_material(&mut tx, raw_material_id)
            .await?
            .ok_or_else(|| CoreError::not_found("RawMaterial", raw_material_id))?;

        let request_number =
            sequence::next_number(&mut tx, DocumentKind::PurchaseRequest, today).await?;
        let purchase_request_id =
            purchase::insert_request(&mut tx, &request_number, raw_material_id, quantity).await?;
        tx.commit().await?;

        info!(purchase_request_id, %request_number, raw_material_id, %quantity, "Purchase request raised");
        Ok(PurchaseRequestRaised {
            purchase_request_id,
            request_number,
        })
    }

    /// Marks an open request received and credits the material's stock.
    /// Returns the new stock level.
    pub async fn receive_purchase_request(&self, purchase_request_id: i64) -> LedgerResult<Decimal> {
        let mut tx = self.db.begin().await?;

        let request = open_request(&mut tx, purchase_request_id).await?;
        purchase::close_request(&mut tx, purchase_request_id, PurchaseRequestStatus::Received)
            .await?;
        let stock =
            catalog::adjust_raw_material_stock(&mut tx, request.raw_material_id, request.quantity)
                .await?;
        tx.commit().await?;

        info!(
            purchase_request_id,
            raw_material_id = request.raw_material_id,
            quantity = %request.quantity,
            %stock,
            "Purchase request received"
        );
        Ok(stock)
    }

    pub async fn cancel_purchase_request(&self, purchase_request_id: i64) -> LedgerResult<()> {
        let mut tx = self.db.begin().await?;

        open_request(&mut tx, purchase_request_id).await?;
        purchase::close_request(&mut tx, purchase_request_id, PurchaseRequestStatus::Cancelled)
            .await?;
        tx.commit().await?;

        info!(purchase_request_id, "Purchase request cancelled");
        Ok(())
    }

    /// Raw materials at or below their reorder level.
    pub async fn materials_below_reorder_level(&self) -> LedgerResult<Vec<RawMaterial>> {
        let materials = self.db.catalog().list_raw_materials().await?;
        Ok(materials.into_iter().filter(RawMaterial::needs_reorder).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::service::fixtures;
    use fulfil_core::sequence::FiscalYear;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_receive_credits_stock_once() {
        let ledger = fixtures::ledger().await;
        let butter = fixtures::raw_material(&ledger, "Butter", dec!(3)).await;

        let raised = ledger.raise_purchase_request(butter.id, dec!(20.5)).await.unwrap();
        let label = FiscalYear::from_date(ledger.today().unwrap()).label();
        assert_eq!(raised.request_number, format!("PR-{label}/1"));

        let stock = ledger
            .receive_purchase_request(raised.purchase_request_id)
            .await
            .unwrap();
        assert_eq!(stock, dec!(23.5));

        let err = ledger
            .receive_purchase_request(raised.purchase_request_id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StateConflict);

        let request = ledger
            .db()
            .purchases()
            .get_by_id(raised.purchase_request_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.status, PurchaseRequestStatus::Received);
    }

    #[tokio::test]
    async fn test_cancelled_request_moves_no_stock() {
        let ledger = fixtures::ledger().await;
        let butter = fixtures::raw_material(&ledger, "Butter", dec!(3)).await;

        let raised = ledger.raise_purchase_request(butter.id, dec!(10)).await.unwrap();
        ledger
            .cancel_purchase_request(raised.purchase_request_id)
            .await
            .unwrap();

        let err = ledger
            .receive_purchase_request(raised.purchase_request_id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StateConflict);

        let butter = ledger.db().catalog().get_raw_material(butter.id).await.unwrap().unwrap();
        assert_eq!(butter.stock_quantity, dec!(3));
        assert!(ledger.db().purchases().list_open().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_raise_validates() {
        let ledger = fixtures::ledger().await;

        let err = ledger.raise_purchase_request(1, dec!(0)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = ledger.raise_purchase_request(1, dec!(5)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_materials_below_reorder_level() {
        let ledger = fixtures::ledger().await;
        // Fixture reorder level is 5.
        let butter = fixtures::raw_material(&ledger, "Butter", dec!(3)).await;
        fixtures::raw_material(&ledger, "Sugar", dec!(40)).await;
        let salt = fixtures::raw_material(&ledger, "Salt", dec!(5)).await;

        let low: Vec<i64> = ledger
            .materials_below_reorder_level()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(low, vec![butter.id, salt.id]);
    }
}
