//! Catalog operations: the directory entries the ledger prices and stocks.

use rust_decimal::Decimal;
use tracing::info;

use super::Ledger;
use crate::error::LedgerResult;
use fulfil_core::validation::{
    validate_gst_rate, validate_margin, validate_name, validate_price, validate_sku,
};
use fulfil_core::{CoreError, Product, RawMaterial, Store, ValidationError};
use fulfil_db::repository::catalog::{self, NewProduct, NewRawMaterial};

fn validate_stock(field: &str, stock: Decimal) -> Result<(), ValidationError> {
    if stock < Decimal::ZERO {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "cannot be negative".to_string(),
        });
    }
    Ok(())
}

impl Ledger {
    pub async fn add_store(&self, name: &str) -> LedgerResult<Store> {
        validate_name("name", name)?;
        let store = self.db.catalog().insert_store(name.trim()).await?;
        info!(store_id = store.id, name = %store.name, "Store added");
        Ok(store)
    }

    pub async fn add_product(&self, new: &NewProduct) -> LedgerResult<Product> {
        validate_sku(&new.sku)?;
        validate_name("name", &new.name)?;
        validate_price("mrp", new.mrp)?;
        validate_price("cost", new.cost)?;
        validate_gst_rate(new.gst_rate.percentage())?;
        validate_stock("stock_quantity", Decimal::from(new.stock_quantity))?;

        let product = self.db.catalog().insert_product(new).await?;
        info!(product_id = product.id, sku = %product.sku, "Product added");
        Ok(product)
    }

    pub async fn add_raw_material(&self, new: &NewRawMaterial) -> LedgerResult<RawMaterial> {
        validate_name("name", &new.name)?;
        validate_name("unit", &new.unit)?;
        validate_stock("stock_quantity", new.stock_quantity)?;
        validate_stock("reorder_level", new.reorder_level)?;

        let material = self.db.catalog().insert_raw_material(new).await?;
        info!(raw_material_id = material.id, name = %material.name, "Raw material added");
        Ok(material)
    }

    /// Stores the margin a store is charged for a product.
    pub async fn set_store_margin(
        &self,
        store_id: i64,
        product_id: i64,
        margin_percentage: Decimal,
    ) -> LedgerResult<()> {
        validate_margin(margin_percentage)?;

        let mut tx = self.db.begin().await?;
        catalog::get_store(&mut tx, store_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Store", store_id))?;
        catalog::get_product(&mut tx, product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;
        catalog::set_margin(&mut tx, store_id, product_id, margin_percentage).await?;
        tx.commit().await?;

        info!(store_id, product_id, %margin_percentage, "Store margin set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::service::fixtures;
    use fulfil_core::{GstRate, Money};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_add_product_validates_before_insert() {
        let ledger = fixtures::ledger().await;

        let err = ledger
            .add_product(&NewProduct {
                sku: "PICKLE-1KG".to_string(),
                name: "Mango Pickle 1kg".to_string(),
                mrp: Money::from_rupees(dec!(-1)),
                cost: Money::zero(),
                gst_rate: GstRate::new(dec!(12)),
                stock_quantity: 0,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = ledger
            .add_product(&NewProduct {
                sku: "PICKLE-1KG".to_string(),
                name: "Mango Pickle 1kg".to_string(),
                mrp: Money::from_rupees(dec!(180)),
                cost: Money::from_rupees(dec!(120)),
                gst_rate: GstRate::new(dec!(112)),
                stock_quantity: 0,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_set_store_margin_requires_known_store() {
        let ledger = fixtures::ledger().await;
        let product = fixtures::product(&ledger, "GHEE-500", dec!(320), dec!(12)).await;

        let err = ledger
            .set_store_margin(99, product.id, dec!(10))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let store = ledger.add_store("Anand Stores").await.unwrap();
        ledger
            .set_store_margin(store.id, product.id, dec!(10))
            .await
            .unwrap();
        let stored = ledger
            .db()
            .catalog()
            .get_margin(store.id, product.id)
            .await
            .unwrap();
        assert_eq!(stored, Some(dec!(10)));
    }
}
