//! # Production Rules
//!
//! Yield-proportional material usage, batch numbering and the checks that
//! gate a production order's lifecycle.
//!
//! ```text
//! planned 100 units, material requires 2 kg
//! produced 80 units  →  ratio 0.8  →  used 1.6 kg
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{ProductionOrder, ProductionStatus};
use crate::MAX_LINE_QUANTITY;

const ENTITY: &str = "ProductionOrder";

/// `produced / planned`, unrounded.
pub fn usage_ratio(quantity_produced: i64, quantity_to_produce: i64) -> CoreResult<Decimal> {
    if quantity_to_produce <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity_to_produce".to_string(),
        }
        .into());
    }
    Ok(Decimal::from(quantity_produced) / Decimal::from(quantity_to_produce))
}

/// Actual consumption of a material given the usage ratio.
pub fn actual_usage(quantity_required: Decimal, ratio: Decimal) -> Decimal {
    quantity_required * ratio
}

/// `BATCH-YYYYMMDD-NNN`, where `created_today` counts batches of the same
/// product already minted on `date`.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use fulfil_core::production::batch_number;
///
/// let day = NaiveDate::from_ymd_opt(2024, 7, 9).unwrap();
/// assert_eq!(batch_number(day, 0), "BATCH-20240709-001");
/// ```
pub fn batch_number(date: NaiveDate, created_today: i64) -> String {
    format!("BATCH-{}-{:03}", date.format("%Y%m%d"), created_today + 1)
}

/// Resolves the yield for completion and checks the order may complete.
///
/// ## Errors
/// - `StateConflict` if the order is completed or cancelled
/// - `Validation` if the yield is not positive or exceeds [`MAX_LINE_QUANTITY`]
pub fn ensure_completable(order: &ProductionOrder, quantity_produced: Option<i64>) -> CoreResult<i64> {
    if order.status.is_terminal() {
        return Err(CoreError::conflict(
            ENTITY,
            &order.order_number,
            format!("order is already {}", order.status.as_str()),
        ));
    }

    let produced = quantity_produced.unwrap_or(order.quantity_to_produce);
    if produced <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity_produced".to_string(),
        }
        .into());
    }
    if produced > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity_produced".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        }
        .into());
    }

    Ok(produced)
}

/// Only pending orders can start.
pub fn ensure_startable(order: &ProductionOrder) -> CoreResult<()> {
    if order.status != ProductionStatus::Pending {
        return Err(CoreError::conflict(
            ENTITY,
            &order.order_number,
            format!("cannot start from {}", order.status.as_str()),
        ));
    }
    Ok(())
}

/// Pending and in-progress orders can be cancelled.
pub fn ensure_cancellable(order: &ProductionOrder) -> CoreResult<()> {
    if order.status.is_terminal() {
        return Err(CoreError::conflict(
            ENTITY,
            &order.order_number,
            format!("cannot cancel from {}", order.status.as_str()),
        ));
    }
    Ok(())
}

/// Checks raw material stock covers a planned requirement.
pub fn ensure_material_available(
    material: &str,
    available: Decimal,
    required: Decimal,
) -> CoreResult<()> {
    if available < required {
        return Err(CoreError::InsufficientMaterial {
            material: material.to_string(),
            available,
            required,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
