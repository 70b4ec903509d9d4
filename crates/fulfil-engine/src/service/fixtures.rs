//! Shared setup for ledger tests.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;

use super::{Ledger, LineItem};
use crate::service::invoicing::{InvoiceCreated, InvoiceLine};
use fulfil_core::{GstRate, Money, Product, RawMaterial, Store};
use fulfil_db::repository::batch::{self, NewBatch};
use fulfil_db::repository::catalog::{self, NewProduct, NewRawMaterial};
use fulfil_db::{Database, DbConfig};

pub async fn ledger() -> Ledger {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    Ledger::new(db, 330)
}

/// A WAL database file in `dir` behind an 8-connection pool, for tests
/// where writers race each other.
pub async fn file_ledger(dir: &TempDir) -> Ledger {
    let config = DbConfig::new(dir.path().join("ledger.db")).max_connections(8);
    let db = Database::new(config).await.unwrap();
    Ledger::new(db, 330)
}

pub async fn store(ledger: &Ledger) -> Store {
    ledger.add_store("Anand Stores").await.unwrap()
}

pub async fn product(ledger: &Ledger, sku: &str, mrp: Decimal, gst: Decimal) -> Product {
    ledger
        .add_product(&NewProduct {
            sku: sku.to_string(),
            name: format!("{sku} pack"),
            mrp: Money::from_rupees(mrp),
            cost: Money::from_rupees(mrp * dec!(0.75)),
            gst_rate: GstRate::new(gst),
            stock_quantity: 0,
        })
        .await
        .unwrap()
}

pub async fn raw_material(ledger: &Ledger, name: &str, stock: Decimal) -> RawMaterial {
    ledger
        .add_raw_material(&NewRawMaterial {
            name: name.to_string(),
            unit: "kg".to_string(),
            stock_quantity: stock,
            reorder_level: dec!(5),
        })
        .await
        .unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Inserts a batch as production would, crediting product stock.
pub async fn batch(ledger: &Ledger, product_id: i64, produced_on: NaiveDate, quantity: i64) -> i64 {
    let mut tx = ledger.db().begin().await.unwrap();
    let count = batch::count_for_day(&mut tx, product_id, produced_on).await.unwrap();
    let id = batch::insert_batch(
        &mut tx,
        &NewBatch {
            product_id,
            batch_number: fulfil_core::production::batch_number(produced_on, count),
            production_date: produced_on,
            quantity,
            production_order_id: None,
        },
    )
    .await
    .unwrap();
    catalog::adjust_product_stock(&mut tx, product_id, quantity)
        .await
        .unwrap();
    tx.commit().await.unwrap();
    id
}

/// Orders and invoices `items` at zero margin for `store_id`.
pub async fn invoice(ledger: &Ledger, store_id: i64, items: &[LineItem]) -> InvoiceCreated {
    let order = ledger.create_order(store_id, items).await.unwrap();
    let lines: Vec<InvoiceLine> = items
        .iter()
        .map(|i| InvoiceLine {
            product_id: i.product_id,
            quantity: i.quantity,
            margin_percentage: None,
        })
        .collect();
    ledger
        .create_invoice_from_order(order.order_id, &lines, false)
        .await
        .unwrap()
}
