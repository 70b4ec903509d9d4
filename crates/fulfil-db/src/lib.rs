//! # fulfil-db: Database Layer for Fulfil
//!
//! SQLite storage for the order-to-cash and manufacturing ledger, built on
//! sqlx with runtime-checked queries.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Fulfil Data Flow                                 │
//! │                                                                         │
//! │  Ledger::create_dispatch (fulfil-engine)                                │
//! │       │  opens one transaction                                          │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     fulfil-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  repository::* │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ fn(&mut conn)  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ for tx work    │    │ 001_initial  │  │   │
//! │  │   │ begin()       │    │ XRepository    │    │ _schema.sql  │  │   │
//! │  │   │               │    │ for pool reads │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  SQLite Database (WAL)                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Per-table query functions and pool-backed readers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fulfil_db::{Database, DbConfig};
//! use fulfil_db::repository::batch;
//!
//! let db = Database::new(DbConfig::new("fulfil.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! batch::decrement(&mut tx, batch_id, 3).await?;
//! tx.commit().await?;
//!
//! let batches = db.batches().list_for_product(product_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::batch::BatchRepository;
pub use repository::catalog::CatalogRepository;
pub use repository::dispatch::DispatchRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::order::OrderRepository;
pub use repository::payment::PaymentRepository;
pub use repository::production::ProductionRepository;
pub use repository::purchase::PurchaseRepository;
