//! # fulfil-engine: Transactional Ledger for Fulfil
//!
//! Every mutating ledger operation runs here as a single SQLite
//! transaction: rules from `fulfil-core`, queries from `fulfil-db`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Fulfil Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Callers (seed binary, HTTP layer, tests)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Ledger::*                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ fulfil-engine (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ invoicing │  │ dispatch  │  │production │  │  payment  │  │   │
//! │  │   │  orders   │  │   FIFO    │  │  batches  │  │  ledger   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   config • error codes • tracing                               │   │
//! │  └─────────────┬───────────────────────────────────┬───────────────┘   │
//! │                │                                   │                    │
//! │  ┌─────────────▼───────────────┐   ┌───────────────▼───────────────┐   │
//! │  │  fulfil-core (pure rules)   │   │  fulfil-db (SQLite, sqlx)     │   │
//! │  └─────────────────────────────┘   └───────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Environment-driven configuration
//! - [`error`] - Ledger errors and their stable codes
//! - [`service`] - The [`Ledger`] and its operations
//! - [`telemetry`] - Tracing subscriber setup
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use fulfil_engine::{init_tracing, Ledger, LedgerConfig, LineItem};
//!
//! let config = LedgerConfig::load()?;
//! init_tracing(&config.log_level);
//! let ledger = Ledger::open(&config).await?;
//!
//! let order = ledger.create_order(store_id, &[LineItem::new(product_id, 12)]).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod service;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, LedgerConfig};
pub use error::{ErrorCode, LedgerError, LedgerResult};
pub use service::dispatch::{BatchAudit, CombinedDispatchCreated, DispatchCreated, LineAllocation};
pub use service::invoicing::{InvoiceCancelled, InvoiceCreated, InvoiceLine, OrderCreated};
pub use service::payment::{PaymentRecorded, PaymentRequest};
pub use service::production::{MaterialRequirement, ProductionCompleted, ProductionOrderCreated};
pub use service::purchasing::PurchaseRequestRaised;
pub use service::{Ledger, LineItem};
pub use telemetry::init_tracing;
