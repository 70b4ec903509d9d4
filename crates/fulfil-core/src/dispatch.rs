//! # Dispatch Rules
//!
//! Small-order classification, priority tiers and the dispatch state
//! machine.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   pending ──► ready ──► in_transit ──► delivered                        │
//! │      │          │                                                       │
//! │      └────┬─────┘                                                       │
//! │           ▼                                                             │
//! │       cancelled                                                         │
//! │                                                                         │
//! │   pending (small) ──► combined      only by creating a CombinedDispatch │
//! │                                                                         │
//! │   Combined dispatches follow the same machine, minus `combined`.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Dispatch, DispatchStatus};
use rust_decimal::Decimal;

/// At most this many distinct products makes an order small.
pub const SMALL_ORDER_MAX_PRODUCTS: usize = 3;

/// At most this many total units makes an order small.
pub const SMALL_ORDER_MAX_UNITS: i64 = 5;

/// Default priority for manually created dispatches.
pub const DEFAULT_PRIORITY: u8 = 1;

/// Classifies a dispatch from its `(product_id, quantity)` lines.
///
/// Small when it has few distinct products or few units in total.
pub fn is_small_order(lines: &[(i64, i64)]) -> bool {
    let mut products: Vec<i64> = lines.iter().map(|(p, _)| *p).collect();
    products.sort_unstable();
    products.dedup();

    let units: i64 = lines.iter().map(|(_, q)| *q).sum();

    products.len() <= SMALL_ORDER_MAX_PRODUCTS || units <= SMALL_ORDER_MAX_UNITS
}

/// Priority for dispatches created automatically from an invoice.
///
/// | invoice total | priority |
/// |---------------|----------|
/// | ≥ ₹50,000     | 3        |
/// | ≥ ₹20,000     | 2        |
/// | otherwise     | 1        |
pub fn priority_for_total(total_amount: Money) -> u8 {
    let amount = total_amount.amount();
    if amount >= Decimal::from(50_000) {
        3
    } else if amount >= Decimal::from(20_000) {
        2
    } else {
        1
    }
}

/// Whether the state machine allows `from → to` through a status update.
///
/// `Combined` is never a valid update target.
pub fn can_transition(from: DispatchStatus, to: DispatchStatus) -> bool {
    use DispatchStatus::*;

    matches!(
        (from, to),
        (Pending, Ready)
            | (Ready, InTransit)
            | (InTransit, Delivered)
            | (Pending, Cancelled)
            | (Ready, Cancelled)
    )
}

/// Checks a transition, naming the entity in the error.
pub fn ensure_transition(
    entity: &'static str,
    id: i64,
    from: DispatchStatus,
    to: DispatchStatus,
) -> CoreResult<()> {
    if !can_transition(from, to) {
        return Err(CoreError::conflict(
            entity,
            id,
            format!("cannot move from {} to {}", from.as_str(), to.as_str()),
        ));
    }
    Ok(())
}

/// Checks that a set of dispatches may be combined.
///
/// `requested` are the ids the caller asked for; `found` are the rows read
/// in the combining transaction.
pub fn ensure_combinable(requested: &[i64], found: &[Dispatch]) -> CoreResult<()> {
    if requested.len() < 2 {
        return Err(ValidationError::OutOfRange {
            field: "dispatch_ids".to_string(),
            min: 2,
            max: crate::MAX_LINE_ITEMS as i64,
        }
        .into());
    }

    crate::validation::validate_distinct_ids("dispatch_ids", requested)?;

    for id in requested {
        let dispatch = found
            .iter()
            .find(|d| d.id == *id)
            .ok_or_else(|| CoreError::not_found("Dispatch", id))?;

        if dispatch.status != DispatchStatus::Pending {
            return Err(CoreError::conflict(
                "Dispatch",
                dispatch.id,
                format!("status is {}, expected pending", dispatch.status.as_str()),
            ));
        }
        if !dispatch.is_small_order {
            return Err(CoreError::conflict(
                "Dispatch",
                dispatch.id,
                "not a small order",
            ));
        }
    }

    Ok(())
}

/// Member status implied by a combined dispatch's new status.
///
/// `None` means members stay `combined`.
pub fn member_status_for(combined_status: DispatchStatus) -> Option<DispatchStatus> {
    match combined_status {
        DispatchStatus::Delivered => Some(DispatchStatus::Delivered),
        DispatchStatus::Cancelled => Some(DispatchStatus::Pending),
        _ => None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn dispatch(id: i64, status: DispatchStatus, small: bool) -> Dispatch {
        Dispatch {
            id,
            invoice_id: id * 10,
            status,
            priority: 1,
            is_small_order: small,
            combined_dispatch_id: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_small_by_unit_count() {
        // 4 products, 3 units in total
        assert!(is_small_order(&[(1, 1), (2, 1), (3, 1), (4, 0)]));
    }

    #[test]
    fn test_small_by_product_count() {
        assert!(is_small_order(&[(1, 100), (2, 40), (3, 9)]));
    }

    #[test]
    fn test_large_order() {
        assert!(!is_small_order(&[(1, 2), (2, 2), (3, 1), (4, 1)]));
    }

    #[test]
    fn test_priority_tiers() {
        assert_eq!(priority_for_total(Money::from_rupees(dec!(50000))), 3);
        assert_eq!(priority_for_total(Money::from_rupees(dec!(49999))), 2);
        assert_eq!(priority_for_total(Money::from_rupees(dec!(20000))), 2);
        assert_eq!(priority_for_total(Money::from_rupees(dec!(19999.99))), 1);
    }

    #[test]
    fn test_transitions() {
        use DispatchStatus::*;
        assert!(can_transition(Pending, Ready));
        assert!(can_transition(Ready, InTransit));
        assert!(can_transition(InTransit, Delivered));
        assert!(can_transition(Ready, Cancelled));
        assert!(!can_transition(InTransit, Cancelled));
        assert!(!can_transition(Delivered, Pending));
        assert!(!can_transition(Pending, Combined));
        assert!(!can_transition(Pending, Delivered));
    }

    #[test]
    fn test_combine_requires_pending_small() {
        let found = vec![
            dispatch(1, DispatchStatus::Pending, true),
            dispatch(2, DispatchStatus::Ready, true),
        ];
        assert!(matches!(
            ensure_combinable(&[1, 2], &found),
            Err(CoreError::StateConflict { .. })
        ));

        let found = vec![
            dispatch(1, DispatchStatus::Pending, true),
            dispatch(2, DispatchStatus::Pending, false),
        ];
        assert!(ensure_combinable(&[1, 2], &found).is_err());

        let found = vec![
            dispatch(1, DispatchStatus::Pending, true),
            dispatch(2, DispatchStatus::Pending, true),
        ];
        assert!(ensure_combinable(&[1, 2], &found).is_ok());
    }

    #[test]
    fn test_combine_rejects_bad_id_lists() {
        let found = vec![dispatch(1, DispatchStatus::Pending, true)];
        assert!(matches!(
            ensure_combinable(&[1], &found),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            ensure_combinable(&[1, 1], &found),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            ensure_combinable(&[1, 3], &found),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_member_status_propagation() {
        assert_eq!(
            member_status_for(DispatchStatus::Delivered),
            Some(DispatchStatus::Delivered)
        );
        assert_eq!(
            member_status_for(DispatchStatus::Cancelled),
            Some(DispatchStatus::Pending)
        );
        assert_eq!(member_status_for(DispatchStatus::InTransit), None);
    }
}
