//! # Domain Types
//!
//! Core domain types used throughout Fulfil.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Order ──► Invoice ──► Dispatch ──► DispatchBatch ──► ProductBatch      │
//! │              │            │                               ▲             │
//! │              │            └──► CombinedDispatch           │             │
//! │              ▼                                            │             │
//! │        InvoicePayment            ProductionOrder ─────────┘             │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                              ProductionMaterial ──► RawMaterial         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity has an integer `id` (database relations, FIFO tie-breaks)
//! and, where people refer to it, a business number (`invoice_number`,
//! `batch_number`, `order_number`).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// GST Rate
// =============================================================================

/// GST rate as a percentage (`12` = 12%).
///
/// Intra-state invoices split it evenly into CGST and SGST; inter-state
/// invoices charge the full rate as IGST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GstRate(Decimal);

impl GstRate {
    /// Creates a GST rate from a percentage.
    #[inline]
    pub const fn new(pct: Decimal) -> Self {
        GstRate(pct)
    }

    /// Returns the rate as a percentage.
    #[inline]
    pub const fn percentage(&self) -> Decimal {
        self.0
    }

    /// Zero-rated goods.
    #[inline]
    pub const fn zero() -> Self {
        GstRate(Decimal::ZERO)
    }
}

impl Default for GstRate {
    fn default() -> Self {
        GstRate::zero()
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A store (customer outlet). The directory itself is managed elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A finished-goods product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    pub name: String,

    /// Maximum retail price. Zero when the product is sold at cost basis.
    pub mrp: Money,

    /// Manufacturing cost per unit.
    pub cost: Money,

    pub gst_rate: GstRate,

    /// Aggregate on-hand units.
    ///
    /// A denormalized cache: FIFO allocation reads batches, never this.
    pub stock_quantity: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Price that margins are applied to: MRP, falling back to cost when
    /// MRP is zero.
    pub fn base_price(&self) -> Money {
        if self.mrp.is_positive() {
            self.mrp
        } else {
            self.cost
        }
    }
}

/// Margin a store earns on a product, reused on later invoices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreProductMargin {
    pub store_id: i64,
    pub product_id: i64,
    pub margin_percentage: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// A raw material consumed by production.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMaterial {
    pub id: i64,
    pub name: String,

    /// Unit of measure ("kg", "l", "pcs").
    pub unit: String,

    /// May go negative: completion deducts without re-checking.
    pub stock_quantity: Decimal,

    pub reorder_level: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RawMaterial {
    /// True when stock has fallen to or below the reorder level.
    pub fn needs_reorder(&self) -> bool {
        self.stock_quantity <= self.reorder_level
    }
}

// =============================================================================
// Batches
// =============================================================================

/// Whether a batch still has units to allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Available,
    Depleted,
}

impl BatchStatus {
    /// Status implied by a remaining quantity.
    pub fn for_remaining(quantity_remaining: i64) -> Self {
        if quantity_remaining == 0 {
            BatchStatus::Depleted
        } else {
            BatchStatus::Available
        }
    }
}

/// A production batch of one product.
///
/// ## Invariants
/// - `quantity_remaining >= 0`
/// - `status == Depleted` exactly when `quantity_remaining == 0`
/// - `quantity_remaining + Σ dispatch allocations == quantity_produced`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductBatch {
    pub id: i64,
    pub product_id: i64,

    /// `BATCH-YYYYMMDD-NNN`, unique per product.
    pub batch_number: String,

    pub production_date: NaiveDate,
    pub quantity_produced: i64,
    pub quantity_remaining: i64,
    pub status: BatchStatus,
    pub production_order_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Production
// =============================================================================

/// Lifecycle of a production order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ProductionStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl ProductionStatus {
    /// Completed and cancelled orders never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProductionStatus::Completed | ProductionStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionStatus::Pending => "pending",
            ProductionStatus::InProgress => "in_progress",
            ProductionStatus::Completed => "completed",
            ProductionStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for ProductionStatus {
    fn default() -> Self {
        ProductionStatus::Pending
    }
}

/// A plan to manufacture units of one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionOrder {
    pub id: i64,

    /// `PROD-YYYY-YY/N`.
    pub order_number: String,

    pub product_id: i64,
    pub quantity_to_produce: i64,

    /// Actual yield, set on completion.
    pub quantity_produced: Option<i64>,

    pub status: ProductionStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A raw material planned for a production order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionMaterial {
    pub id: i64,
    pub production_order_id: i64,
    pub raw_material_id: i64,

    /// Planned usage for the full `quantity_to_produce`.
    pub quantity_required: Decimal,

    /// Actual usage, set on completion.
    pub quantity_used: Option<Decimal>,
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Invoiced,
    Cancelled,
}

/// A sales order placed by a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,

    /// `ORD-YYYY-YY/N`.
    pub order_number: String,

    pub store_id: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

// =============================================================================
// Invoices
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Completed,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Completed => "completed",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

/// Collection state of an invoice, derived from its payment rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

/// A GST invoice.
///
/// ## Invariants
/// - `subtotal + cgst + sgst + igst + round_off == total_amount`
/// - `total_amount` is a whole rupee amount
/// - `total_paid <= total_amount + 0.01`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,

    /// `YYYY-YY/N`.
    pub invoice_number: String,

    pub order_id: Option<i64>,
    pub store_id: i64,

    /// Inter-state supply: IGST instead of CGST + SGST.
    pub is_igst: bool,

    pub subtotal: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
    pub round_off: Money,
    pub total_amount: Money,

    /// Recomputed from payment rows on every payment mutation.
    pub total_paid: Money,

    pub payment_status: PaymentStatus,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Outstanding amount, never below zero.
    pub fn balance(&self) -> Money {
        let balance = self.total_amount - self.total_paid;
        if balance.is_negative() {
            Money::zero()
        } else {
            balance
        }
    }
}

/// A priced line on an invoice. Amounts keep full precision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: i64,
    pub product_id: i64,
    pub quantity: i64,

    /// Units to ship; defaults to `quantity`.
    pub quantity_shipped: i64,

    /// Post-margin price per unit.
    pub unit_price: Money,

    /// Pre-margin base price per unit.
    pub cost_price: Money,

    pub margin_percentage: Decimal,
    pub gst_rate: GstRate,

    /// Pre-tax line amount (`unit_price × quantity`).
    pub total: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Upi,
    BankTransfer,
    Cheque,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

/// One collection against an invoice. Rows are only inserted or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoicePayment {
    pub id: i64,
    pub invoice_id: i64,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    pub collected_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Dispatch
// =============================================================================

/// Lifecycle of a dispatch (and of a combined dispatch, minus `Combined`).
///
/// ```text
/// pending ──► ready ──► in_transit ──► delivered
///    │          │
///    ├──────────┴──► cancelled
///    │
///    └──► combined   (small orders only, via CombinedDispatch)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Pending,
    Ready,
    InTransit,
    Delivered,
    Cancelled,
    Combined,
}

impl DispatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::Pending => "pending",
            DispatchStatus::Ready => "ready",
            DispatchStatus::InTransit => "in_transit",
            DispatchStatus::Delivered => "delivered",
            DispatchStatus::Cancelled => "cancelled",
            DispatchStatus::Combined => "combined",
        }
    }
}

impl Default for DispatchStatus {
    fn default() -> Self {
        DispatchStatus::Pending
    }
}

/// A physical shipment against an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispatch {
    pub id: i64,
    pub invoice_id: i64,
    pub status: DispatchStatus,

    /// 1 (lowest) to 10 (highest).
    pub priority: u8,

    /// Fixed at creation.
    pub is_small_order: bool,

    pub combined_dispatch_id: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchItem {
    pub id: i64,
    pub dispatch_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

/// Audit row: which batch satisfied which dispatch line, and how much.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchBatch {
    pub id: i64,
    pub dispatch_id: i64,
    pub batch_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

/// A group of small pending dispatches shipped together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedDispatch {
    pub id: i64,
    pub status: DispatchStatus,
    pub priority: u8,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Purchasing
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PurchaseRequestStatus {
    Open,
    Received,
    Cancelled,
}

/// A request to replenish a raw material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub id: i64,

    /// `PR-YYYY-YY/N`.
    pub request_number: String,

    pub raw_material_id: i64,
    pub quantity: Decimal,
    pub status: PurchaseRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
