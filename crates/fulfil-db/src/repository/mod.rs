//! # Repository Module
//!
//! Database repository implementations for Fulfil.
//!
//! ## Two Access Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Transactional writes (fulfil-engine)                                  │
//! │       │                                                                 │
//! │       │  let mut tx = db.begin().await?;                               │
//! │       │  batch::decrement(&mut tx, batch_id, 5).await?;                │
//! │       │  dispatch::insert_allocation(&mut tx, …).await?;               │
//! │       │  tx.commit().await?;                                           │
//! │       ▼                                                                 │
//! │  module functions taking `&mut SqliteConnection`                       │
//! │                                                                         │
//! │  Reads outside a transaction (callers, tests, seed)                    │
//! │       │                                                                 │
//! │       │  db.batches().get_by_id(3).await?                              │
//! │       ▼                                                                 │
//! │  *Repository structs holding the pool                                  │
//! │                                                                         │
//! │  Both paths run the same SQL: repositories borrow a pooled connection  │
//! │  and call the module functions.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`catalog`] - Stores, products, store margins, raw materials
//! - [`sequence`] - Fiscal-year document numbers
//! - [`order`] - Sales orders
//! - [`invoice`] - Invoices and invoice items
//! - [`payment`] - Invoice payments
//! - [`batch`] - Product batches and guarded stock movements
//! - [`production`] - Production orders and materials
//! - [`dispatch`] - Dispatches, allocations, combined dispatches
//! - [`purchase`] - Raw-material purchase requests

pub mod batch;
pub mod catalog;
pub mod dispatch;
pub mod invoice;
pub mod order;
pub mod payment;
pub mod production;
pub mod purchase;
pub mod sequence;
