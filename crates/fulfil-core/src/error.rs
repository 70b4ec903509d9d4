//! # Error Types
//!
//! Domain-specific error types for fulfil-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  fulfil-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  fulfil-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  fulfil-engine errors                                                  │
//! │  └── LedgerError      - Domain(CoreError) | Storage(DbError)           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                         DbError ────┴─► LedgerError → caller           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Allocation shortfalls are deliberately absent: they are warnings carried
//! in the dispatch result, never errors.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every variant is raised before the owning transaction writes anything.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Entity is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Completing an already-completed production order
    /// - Combining a dispatch that is not pending
    /// - Deleting an invoice that is not cancelled
    /// - Invoicing an order twice
    #[error("{entity} {id} cannot be changed: {reason}")]
    StateConflict {
        entity: &'static str,
        id: String,
        reason: String,
    },

    /// Payment exceeds the outstanding balance beyond the rupee tolerance.
    #[error("Payment of {amount} exceeds outstanding balance {balance}")]
    Overpayment { amount: Money, balance: Money },

    /// Raw material stock cannot cover a new production order.
    #[error("Insufficient {material}: available {available}, required {required}")]
    InsufficientMaterial {
        material: String,
        available: Decimal,
        required: Decimal,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for an entity type and ID.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Creates a StateConflict error.
    pub fn conflict(entity: &'static str, id: impl ToString, reason: impl Into<String>) -> Self {
        CoreError::StateConflict {
            entity,
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed decimal, bad date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// The same id appears more than once where ids must be distinct.
    #[error("{field} '{value}' is listed more than once")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
