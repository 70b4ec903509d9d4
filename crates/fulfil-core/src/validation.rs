//! # Validation Module
//!
//! Input checks that run before any transaction opens.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Ledger facade                                                │
//! │  └── THIS MODULE: quantities, priorities, amounts, margins, names      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Domain rules (fulfil-core modules)                           │
//! │  └── state machines, balance checks, material sufficiency              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity_remaining >= 0), CHECK (priority 1..10)           │
//! │  ├── UNIQUE document numbers                                           │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use fulfil_core::validation::{validate_priority, validate_quantity};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_priority(11).is_err());
//! ```

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_LINE_ITEMS, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Lowest dispatch priority.
pub const MIN_PRIORITY: i64 = 1;

/// Highest dispatch priority.
pub const MAX_PRIORITY: i64 = 10;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (store, product, raw material).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a unit quantity on an order, invoice or dispatch line.
///
/// ## Rules
/// - Must be positive
/// - Must not exceed [`MAX_LINE_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a fractional quantity (raw materials, purchase requests).
pub fn validate_decimal_quantity(field: &str, qty: Decimal) -> ValidationResult<()> {
    if qty <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a dispatch priority, returning it narrowed to `u8`.
///
/// ## Example
/// ```rust
/// use fulfil_core::validation::validate_priority;
///
/// assert_eq!(validate_priority(10).unwrap(), 10u8);
/// assert!(validate_priority(0).is_err());
/// ```
pub fn validate_priority(priority: i64) -> ValidationResult<u8> {
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        return Err(ValidationError::OutOfRange {
            field: "priority".to_string(),
            min: MIN_PRIORITY,
            max: MAX_PRIORITY,
        });
    }
    // In range, so the narrowing cannot truncate.
    Ok(priority as u8)
}

/// Validates a payment amount. Must be strictly positive.
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

/// Validates a price: zero is allowed, negative is not.
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "cannot be negative".to_string(),
        });
    }
    Ok(())
}

/// Validates a margin percentage.
///
/// Negative margins (discounts) are allowed down to -100%.
pub fn validate_margin(margin_pct: Decimal) -> ValidationResult<()> {
    if margin_pct < -Decimal::ONE_HUNDRED || margin_pct > Decimal::ONE_THOUSAND {
        return Err(ValidationError::OutOfRange {
            field: "margin_percentage".to_string(),
            min: -100,
            max: 1000,
        });
    }
    Ok(())
}

/// Validates a GST percentage (0 to 100).
pub fn validate_gst_rate(rate_pct: Decimal) -> ValidationResult<()> {
    if rate_pct < Decimal::ZERO || rate_pct > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: "gst_rate".to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates a list of line items given as `(product_id, quantity)` pairs.
///
/// ## Rules
/// - At least one line, at most [`MAX_LINE_ITEMS`]
/// - Every quantity valid per [`validate_quantity`]
/// - A product appears at most once
pub fn validate_lines(lines: &[(i64, i64)]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if lines.len() > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        });
    }

    let mut seen = HashSet::with_capacity(lines.len());
    for &(product_id, qty) in lines {
        validate_quantity(qty)?;
        if !seen.insert(product_id) {
            return Err(ValidationError::Duplicate {
                field: "product_id".to_string(),
                value: product_id.to_string(),
            });
        }
    }

    Ok(())
}

/// Validates a list of ids that must be distinct.
pub fn validate_distinct_ids(field: &str, ids: &[i64]) -> ValidationResult<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(*id) {
            return Err(ValidationError::Duplicate {
                field: field.to_string(),
                value: id.to_string(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("SOAP-100").is_ok());
        assert!(validate_sku("oil_1l").is_ok());
        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("SOAP 100").is_err());
        assert!(validate_sku(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_priority_bounds() {
        assert_eq!(validate_priority(1).unwrap(), 1);
        assert_eq!(validate_priority(10).unwrap(), 10);
        assert!(matches!(
            validate_priority(11),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_priority(0).is_err());
    }

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(Money::from_paise(1)).is_ok());
        assert!(validate_payment_amount(Money::zero()).is_err());
        assert!(validate_payment_amount(Money::from_paise(-100)).is_err());
    }

    #[test]
    fn test_validate_margin() {
        assert!(validate_margin(dec!(12.5)).is_ok());
        assert!(validate_margin(dec!(-10)).is_ok());
        assert!(validate_margin(dec!(-100.01)).is_err());
    }

    #[test]
    fn test_validate_lines() {
        assert!(validate_lines(&[(1, 2), (2, 5)]).is_ok());
        assert!(matches!(
            validate_lines(&[]),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_lines(&[(1, 2), (1, 3)]),
            Err(ValidationError::Duplicate { .. })
        ));
        assert!(validate_lines(&[(1, 0)]).is_err());
    }

    #[test]
    fn test_validate_distinct_ids() {
        assert!(validate_distinct_ids("dispatch_ids", &[1, 2, 3]).is_ok());
        assert!(validate_distinct_ids("dispatch_ids", &[4, 4]).is_err());
    }
}
