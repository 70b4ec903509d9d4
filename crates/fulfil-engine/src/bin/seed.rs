//! # Seed Data Generator
//!
//! Populates a ledger database with a small, consistent working set for
//! development: stores, products, raw materials, completed production runs,
//! an invoiced order with its dispatch, a part payment and a purchase
//! request.
//!
//! ## Usage
//! ```bash
//! # Use FULFIL_DATABASE_PATH or ./fulfil.db
//! cargo run -p fulfil-engine --bin seed
//!
//! # Specify database path
//! cargo run -p fulfil-engine --bin seed -- --db ./data/fulfil.db
//! ```

use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;

use fulfil_core::{GstRate, Money};
use fulfil_db::repository::catalog::{NewProduct, NewRawMaterial};
use fulfil_engine::{
    init_tracing, InvoiceLine, Ledger, LedgerConfig, LineItem, MaterialRequirement, PaymentRequest,
};

/// `(sku, name, mrp, cost, gst %)`
const PRODUCTS: &[(&str, &str, i64, i64, i64)] = &[
    ("GHEE-500", "Desi Ghee 500ml", 320, 240, 12),
    ("OIL-1L", "Mustard Oil 1L", 180, 135, 5),
    ("ATTA-5KG", "Chakki Atta 5kg", 240, 190, 0),
];

/// `(name, unit, stock, reorder level)`
const RAW_MATERIALS: &[(&str, &str, i64, i64)] = &[
    ("Butter", "kg", 50, 30),
    ("Mustard Seed", "kg", 100, 20),
    ("Wheat", "kg", 500, 100),
];

/// `(product index, planned, produced, raw material index, kg required)`
const PRODUCTION_RUNS: &[(usize, i64, Option<i64>, usize, i64)] = &[
    (0, 100, Some(96), 0, 25),
    (1, 200, None, 1, 60),
    (2, 50, None, 2, 250),
];

fn rupees(amount: i64) -> Money {
    Money::from_rupees(Decimal::from(amount))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let mut config = LedgerConfig::load()?;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Fulfil Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $FULFIL_DATABASE_PATH or ./fulfil.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    init_tracing(&config.log_level);

    println!("Fulfil Seed Data Generator");
    println!("==========================");
    println!("Database: {}", config.database_path.display());
    println!();

    let ledger = Ledger::open(&config).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if !ledger.db().catalog().list_raw_materials().await?.is_empty() {
        println!("⚠ Database already has catalog data");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Catalog
    let anand = ledger.add_store("Anand Stores").await?;
    let sharma = ledger.add_store("Sharma Kirana").await?;

    let mut products = Vec::with_capacity(PRODUCTS.len());
    for (sku, name, mrp, cost, gst) in PRODUCTS {
        let product = ledger
            .add_product(&NewProduct {
                sku: sku.to_string(),
                name: name.to_string(),
                mrp: rupees(*mrp),
                cost: rupees(*cost),
                gst_rate: GstRate::new(Decimal::from(*gst)),
                stock_quantity: 0,
            })
            .await?;
        products.push(product);
    }

    let mut materials = Vec::with_capacity(RAW_MATERIALS.len());
    for (name, unit, stock, reorder) in RAW_MATERIALS {
        let material = ledger
            .add_raw_material(&NewRawMaterial {
                name: name.to_string(),
                unit: unit.to_string(),
                stock_quantity: Decimal::from(*stock),
                reorder_level: Decimal::from(*reorder),
            })
            .await?;
        materials.push(material);
    }

    ledger
        .set_store_margin(anand.id, products[0].id, Decimal::from(8))
        .await?;
    println!(
        "✓ Catalog: {} stores, {} products, {} raw materials",
        2,
        products.len(),
        materials.len()
    );

    // Production
    println!();
    println!("Running production...");
    for (product_idx, planned, produced, material_idx, required) in PRODUCTION_RUNS {
        let order = ledger
            .create_production_order(
                products[*product_idx].id,
                *planned,
                &[MaterialRequirement {
                    raw_material_id: materials[*material_idx].id,
                    quantity_required: Decimal::from(*required),
                }],
            )
            .await?;
        ledger.start_production(order.production_order_id).await?;
        let done = ledger
            .complete_production(order.production_order_id, *produced)
            .await?;
        println!(
            "  {} → {} ({} units of {})",
            order.order_number, done.batch_number, done.quantity_produced, products[*product_idx].sku
        );
    }

    // Order to cash
    println!();
    println!("Invoicing...");
    let items = [
        LineItem::new(products[0].id, 10),
        LineItem::new(products[1].id, 24),
        LineItem::new(products[2].id, 5),
    ];
    let order = ledger.create_order(anand.id, &items).await?;
    let lines: Vec<InvoiceLine> = items
        .iter()
        .map(|item| InvoiceLine {
            product_id: item.product_id,
            quantity: item.quantity,
            margin_percentage: (item.product_id == products[1].id).then_some(Decimal::from(5)),
        })
        .collect();
    let invoice = ledger
        .create_invoice_from_order(order.order_id, &lines, false)
        .await?;
    println!(
        "  {} → invoice {} for {} (dispatch {})",
        order.order_number, invoice.invoice_number, invoice.total_amount, invoice.dispatch_id
    );
    for shortfall in &invoice.shortfalls {
        println!(
            "  ⚠ product {} short by {} units",
            shortfall.product_id,
            shortfall.missing()
        );
    }

    let small_order = ledger
        .create_order(sharma.id, &[LineItem::new(products[2].id, 2)])
        .await?;
    let small_invoice = ledger
        .create_invoice_from_order(
            small_order.order_id,
            &[InvoiceLine {
                product_id: products[2].id,
                quantity: 2,
                margin_percentage: None,
            }],
            true,
        )
        .await?;
    println!(
        "  {} → invoice {} for {} (IGST)",
        small_order.order_number, small_invoice.invoice_number, small_invoice.total_amount
    );

    let half = Money::from_rupees((invoice.total_amount.amount() / Decimal::TWO).round_dp(2));
    let paid = ledger
        .record_payment(invoice.invoice_id, &PaymentRequest::new(half))
        .await?;
    println!(
        "  Payment {} recorded: paid {}, balance {}",
        paid.payment_id, paid.summary.total_paid, paid.summary.remaining_balance
    );

    // Replenishment
    println!();
    println!("Checking raw materials...");
    for material in ledger.materials_below_reorder_level().await? {
        let request = ledger
            .raise_purchase_request(material.id, material.reorder_level * Decimal::from(4))
            .await?;
        println!(
            "  {} at {} {} → {}",
            material.name, material.stock_quantity, material.unit, request.request_number
        );
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
