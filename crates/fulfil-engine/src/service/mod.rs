//! # Ledger Services
//!
//! The [`Ledger`] facade. Each submodule adds one group of operations as an
//! `impl Ledger` block.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  validate input          (no I/O, CoreError::Validation)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  let mut tx = db.begin()                                               │
//! │       │                                                                 │
//! │       ├── read rows through tx                                          │
//! │       ├── check rules in fulfil-core  ──► Err: tx dropped, rolled back │
//! │       ├── guarded writes through tx   ──► Conflict: rolled back        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tx.commit()             then info! with the outcome                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here retries. A `Conflict` goes back to the caller, which may
//! run the whole operation again.
//!
//! ## Operations
//! - [`catalog`] - stores, products, raw materials, store margins
//! - [`invoicing`] - orders, invoices from orders, invoice cancellation
//! - [`dispatch`] - dispatch creation with FIFO allocation, combining
//! - [`production`] - production orders and completion
//! - [`payment`] - the payment ledger
//! - [`purchasing`] - raw-material purchase requests

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LedgerConfig;
use crate::error::LedgerResult;
use fulfil_core::sequence::business_date;
use fulfil_db::Database;

pub mod catalog;
pub mod dispatch;
pub mod invoicing;
pub mod payment;
pub mod production;
pub mod purchasing;

#[cfg(test)]
pub(crate) mod fixtures;

/// A `(product, units)` line of an order or dispatch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: i64,
    pub quantity: i64,
}

impl LineItem {
    pub fn new(product_id: i64, quantity: i64) -> Self {
        LineItem {
            product_id,
            quantity,
        }
    }
}

fn as_pairs(items: &[LineItem]) -> Vec<(i64, i64)> {
    items.iter().map(|i| (i.product_id, i.quantity)).collect()
}

/// Transactional facade over the ledger database.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: Database,

    /// Business time zone, minutes east of UTC.
    utc_offset_minutes: i32,
}

impl Ledger {
    pub fn new(db: Database, utc_offset_minutes: i32) -> Self {
        Ledger {
            db,
            utc_offset_minutes,
        }
    }

    /// Opens the configured database (running migrations) and wraps it.
    pub async fn open(config: &LedgerConfig) -> LedgerResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(Ledger::new(db, config.utc_offset_minutes))
    }

    /// Underlying database, for reads through its repositories.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Today's date in the business time zone.
    pub fn today(&self) -> LedgerResult<NaiveDate> {
        Ok(business_date(Utc::now(), self.utc_offset_minutes)?)
    }
}
