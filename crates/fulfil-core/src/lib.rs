//! # fulfil-core: Pure Business Logic for Fulfil
//!
//! The rules of the order-to-cash and manufacturing ledger, written as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Fulfil Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              CRUD collaborators (out of scope)                  │   │
//! │  │     stores, vendors, staff, auth, PDF rendering, routing        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              fulfil-engine (Ledger facade)                      │   │
//! │  │   create_invoice_from_order, create_dispatch, record_payment    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ fulfil-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌────────────┐      │   │
//! │  │  │ sequence │ │ pricing  │ │ allocation │ │ production │      │   │
//! │  │  │ FY nums  │ │ GST/R.O. │ │ FIFO plan  │ │ yield math │      │   │
//! │  │  └──────────┘ └──────────┘ └────────────┘ └────────────┘      │   │
//! │  │  ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌────────────┐      │   │
//! │  │  │ dispatch │ │ payment  │ │   money    │ │ validation │      │   │
//! │  │  │ states   │ │ status   │ │  Decimal   │ │   rules    │      │   │
//! │  │  └──────────┘ └──────────┘ └────────────┘ └────────────┘      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    fulfil-db (Database Layer)                   │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities and status enums
//! - [`money`] - Rupee amounts backed by `rust_decimal`
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//! - [`sequence`] - Fiscal-year document numbers
//! - [`pricing`] - Margin pricing, GST split and terminal round-off
//! - [`allocation`] - FIFO batch allocation planning
//! - [`production`] - Yield-proportional material usage and batch numbers
//! - [`dispatch`] - Small-order classification, priorities, state machine
//! - [`payment`] - Balance checks and payment status derivation
//!
//! ## Example Usage
//!
//! ```rust
//! use fulfil_core::money::Money;
//! use fulfil_core::types::GstRate;
//! use rust_decimal::Decimal;
//!
//! let line = Money::from_rupees(Decimal::from(1000));
//! let half = line.gst_half(GstRate::new(Decimal::from(12)));
//! assert_eq!(half, Money::from_rupees(Decimal::from(60)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod dispatch;
pub mod error;
pub mod money;
pub mod payment;
pub mod pricing;
pub mod production;
pub mod sequence;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines on a single invoice or dispatch.
pub const MAX_LINE_ITEMS: usize = 200;

/// Maximum units of one product on a single line.
///
/// Guards against typos such as 10000 instead of 100.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;
