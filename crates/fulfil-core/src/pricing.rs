//! # Pricing Engine
//!
//! Margin pricing, GST and the invoice's single rounding step.
//!
//! ## Pricing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  base price (MRP, or cost when MRP is 0)                                │
//! │       │                                                                 │
//! │       ▼   × (1 + margin/100)      margin: explicit → stored → 0         │
//! │  unit price                                                             │
//! │       │                                                                 │
//! │       ▼   × quantity                                                    │
//! │  line total ────────────┬──────────────────► subtotal                   │
//! │                         │                                               │
//! │                         ├── IGST:  × rate/100 ──► igst                  │
//! │                         └── else:  × rate/200 ──► cgst, sgst            │
//! │                                                                         │
//! │  unrounded = subtotal + cgst + sgst + igst                              │
//! │  total     = round(unrounded)          (nearest rupee, half away)       │
//! │  round_off = total - unrounded         (|round_off| <= 0.50)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every intermediate keeps full decimal precision; only the invoice total
//! is rounded.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::GstRate;

// =============================================================================
// Margin Resolution
// =============================================================================

/// The margin to price with, and whether to remember it for the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarginResolution {
    pub margin_percentage: Decimal,

    /// True when an explicit margin was given and none is stored yet.
    pub persist: bool,
}

/// Resolves a line's margin: explicit value, then stored value, then zero.
///
/// An explicit value overrides a stored one for this invoice only.
pub fn resolve_margin(explicit: Option<Decimal>, stored: Option<Decimal>) -> MarginResolution {
    match (explicit, stored) {
        (Some(margin), None) => MarginResolution {
            margin_percentage: margin,
            persist: true,
        },
        (Some(margin), Some(_)) => MarginResolution {
            margin_percentage: margin,
            persist: false,
        },
        (None, Some(margin)) => MarginResolution {
            margin_percentage: margin,
            persist: false,
        },
        (None, None) => MarginResolution {
            margin_percentage: Decimal::ZERO,
            persist: false,
        },
    }
}

// =============================================================================
// Line Pricing
// =============================================================================

/// Everything needed to price one invoice line.
#[derive(Debug, Clone)]
pub struct LineInput {
    pub product_id: i64,
    pub quantity: i64,
    pub base_price: Money,
    pub margin_percentage: Decimal,
    pub gst_rate: GstRate,
}

/// A priced invoice line with its tax contributions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: i64,
    pub quantity: i64,
    pub cost_price: Money,
    pub unit_price: Money,
    pub margin_percentage: Decimal,
    pub gst_rate: GstRate,
    pub total: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
}

/// Prices a single line.
pub fn price_line(input: &LineInput, is_igst: bool) -> PricedLine {
    let unit_price = input.base_price.apply_margin(input.margin_percentage);
    let total = unit_price.multiply_quantity(input.quantity);

    let (cgst, sgst, igst) = if is_igst {
        (Money::zero(), Money::zero(), total.gst_full(input.gst_rate))
    } else {
        let half = total.gst_half(input.gst_rate);
        (half, half, Money::zero())
    };

    PricedLine {
        product_id: input.product_id,
        quantity: input.quantity,
        cost_price: input.base_price,
        unit_price,
        margin_percentage: input.margin_percentage,
        gst_rate: input.gst_rate,
        total,
        cgst,
        sgst,
        igst,
    }
}

// =============================================================================
// Invoice Totals
// =============================================================================

/// Invoice-level amounts.
///
/// `subtotal + cgst + sgst + igst + round_off == total_amount` exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
    pub round_off: Money,
    pub total_amount: Money,
}

/// Rounds an unrounded invoice sum, returning `(round_off, total_amount)`.
pub fn terminal_round(unrounded: Money) -> (Money, Money) {
    let total = unrounded.round_to_rupee();
    (total - unrounded, total)
}

/// Prices every line and computes invoice totals.
///
/// ## Errors
/// `Validation` when `lines` is empty.
pub fn price_invoice(lines: &[LineInput], is_igst: bool) -> CoreResult<(Vec<PricedLine>, InvoiceTotals)> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        }
        .into());
    }

    let priced: Vec<PricedLine> = lines.iter().map(|l| price_line(l, is_igst)).collect();

    let subtotal: Money = priced.iter().map(|l| l.total).sum();
    let cgst: Money = priced.iter().map(|l| l.cgst).sum();
    let sgst: Money = priced.iter().map(|l| l.sgst).sum();
    let igst: Money = priced.iter().map(|l| l.igst).sum();

    let (round_off, total_amount) = terminal_round(subtotal + cgst + sgst + igst);

    Ok((
        priced,
        InvoiceTotals {
            subtotal,
            cgst,
            sgst,
            igst,
            round_off,
            total_amount,
        },
    ))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use rust_decimal_macros::dec;

    fn line(product_id: i64, qty: i64, base: Decimal, margin: Decimal, gst: Decimal) -> LineInput {
        LineInput {
            product_id,
            quantity: qty,
            base_price: Money::from_rupees(base),
            margin_percentage: margin,
            gst_rate: GstRate::new(gst),
        }
    }

    #[test]
    fn test_resolve_margin_order() {
        assert_eq!(
            resolve_margin(Some(dec!(10)), None),
            MarginResolution {
                margin_percentage: dec!(10),
                persist: true
            }
        );
        assert_eq!(
            resolve_margin(Some(dec!(10)), Some(dec!(8))),
            MarginResolution {
                margin_percentage: dec!(10),
                persist: false
            }
        );
        assert_eq!(resolve_margin(None, Some(dec!(8))).margin_percentage, dec!(8));
        assert_eq!(resolve_margin(None, None).margin_percentage, Decimal::ZERO);
        assert!(!resolve_margin(None, None).persist);
    }

    #[test]
    fn test_intra_state_split() {
        let (lines, totals) = price_invoice(&[line(1, 1, dec!(1000), dec!(0), dec!(12))], false).unwrap();
        assert_eq!(totals.cgst, Money::from_rupees(dec!(60.00)));
        assert_eq!(totals.sgst, Money::from_rupees(dec!(60.00)));
        assert!(totals.igst.is_zero());
        assert_eq!(totals.total_amount, Money::from_rupees(dec!(1120)));
        assert_eq!(lines[0].unit_price, Money::from_rupees(dec!(1000)));
    }

    #[test]
    fn test_inter_state_uses_igst() {
        let (_, totals) = price_invoice(&[line(1, 2, dec!(500), dec!(0), dec!(18))], true).unwrap();
        assert!(totals.cgst.is_zero());
        assert!(totals.sgst.is_zero());
        assert_eq!(totals.igst, Money::from_rupees(dec!(180)));
    }

    #[test]
    fn test_margin_applied_and_precision_kept() {
        let (lines, totals) =
            price_invoice(&[line(1, 7, dec!(37.50), dec!(12.5), dec!(18))], false).unwrap();
        assert_eq!(lines[0].unit_price.amount(), dec!(42.1875));
        assert_eq!(lines[0].total.amount(), dec!(295.3125));
        assert_eq!(lines[0].cost_price.amount(), dec!(37.50));
        assert_eq!(totals.cgst.amount(), dec!(26.578125));
        // 295.3125 + 2 × 26.578125 = 348.46875
        assert_eq!(totals.total_amount, Money::from_rupees(dec!(348)));
        assert_eq!(totals.round_off.amount(), dec!(-0.46875));
    }

    #[test]
    fn test_round_off_identity() {
        let cases = [
            vec![line(1, 3, dec!(19.99), dec!(7.25), dec!(5))],
            vec![
                line(1, 11, dec!(123.45), dec!(3), dec!(12)),
                line(2, 4, dec!(9.10), dec!(0), dec!(18)),
            ],
            vec![line(3, 1, dec!(0.5), dec!(0), dec!(0))],
            vec![line(4, 999, dec!(88.88), dec!(15.5), dec!(28))],
        ];

        for is_igst in [false, true] {
            for lines in &cases {
                let (_, t) = price_invoice(lines, is_igst).unwrap();
                assert_eq!(t.subtotal + t.cgst + t.sgst + t.igst + t.round_off, t.total_amount);
                assert!(t.round_off.abs() <= Money::from_rupees(dec!(0.5)));
                assert_eq!(t.total_amount, t.total_amount.round_to_rupee());
            }
        }
    }

    #[test]
    fn test_half_rupee_rounds_away_from_zero() {
        let (round_off, total) = terminal_round(Money::from_rupees(dec!(0.5)));
        assert_eq!(total, Money::from_rupees(dec!(1)));
        assert_eq!(round_off, Money::from_rupees(dec!(0.5)));
    }

    #[test]
    fn test_empty_lines_rejected() {
        let err = price_invoice(&[], false).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Required { .. })));
    }
}
