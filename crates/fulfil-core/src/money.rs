//! # Money Module
//!
//! Provides the `Money` type for rupee amounts.
//!
//! ## Why Decimal, Not Paise?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ROUNDING HAPPENS EXACTLY ONCE                                          │
//! │                                                                         │
//! │  unit price  = 37.50 × (1 + 12.5/100)  = 42.1875                       │
//! │  line total  = 42.1875 × 7             = 295.3125                      │
//! │  CGST (9%)   = 295.3125 × 18/200       = 26.578125                     │
//! │                                                                         │
//! │  Integer paise would round each of these. GST invoices must keep line  │
//! │  precision and round once, at the invoice total, into `round_off`.     │
//! │  Base-10 decimals keep every intermediate exact.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use fulfil_core::money::Money;
//! use rust_decimal::Decimal;
//!
//! let price = Money::from_paise(4_250); // ₹42.50
//! let line = price.multiply_quantity(3);
//! assert_eq!(line, Money::from_paise(12_750));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::ValidationError;
use crate::types::GstRate;

// =============================================================================
// Money Type
// =============================================================================

/// A rupee amount with full decimal precision.
///
/// ## Design Decisions
/// - **Decimal inner value**: exact base-10 arithmetic, no float drift
/// - **Signed**: round-off and refunds can be negative
/// - **Unrounded by default**: only [`Money::round_to_rupee`] and
///   [`Money::round_to_paise`] change precision
///
/// ## Where Money Is Used
/// ```text
/// Product.mrp ──► unit_price ──► line_total ──► subtotal ──┐
///                                    │                     ├──► total_amount
///                                    └──► CGST/SGST/IGST ──┘        │
///                                                                   ▼
///                              InvoicePayment.amount ──► total_paid / balance
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Creates a Money value from a rupee amount.
    #[inline]
    pub const fn from_rupees(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a Money value from paise (1/100 rupee).
    ///
    /// ## Example
    /// ```rust
    /// use fulfil_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let m = Money::from_paise(1099);
    /// assert_eq!(m.amount(), Decimal::new(1099, 2));
    /// ```
    #[inline]
    pub fn from_paise(paise: i64) -> Self {
        Money(Decimal::new(paise, 2))
    }

    /// Returns the underlying rupee amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is greater than zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is less than zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Rounds to the nearest whole rupee, half away from zero.
    ///
    /// This is the single terminal rounding step of an invoice.
    ///
    /// ## Example
    /// ```rust
    /// use fulfil_core::money::Money;
    ///
    /// assert_eq!(Money::from_paise(12_349).round_to_rupee(), Money::from_paise(12_300));
    /// assert_eq!(Money::from_paise(12_350).round_to_rupee(), Money::from_paise(12_400));
    /// ```
    pub fn round_to_rupee(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Rounds to paise, half away from zero. For display and reports only.
    pub fn round_to_paise(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Multiplies money by a unit quantity.
    #[inline]
    pub fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * Decimal::from(qty))
    }

    /// Returns `pct` percent of this amount, unrounded.
    pub fn percent(&self, pct: Decimal) -> Money {
        Money(self.0 * pct / Decimal::ONE_HUNDRED)
    }

    /// Applies a margin: `amount × (1 + margin/100)`.
    ///
    /// ## Example
    /// ```rust
    /// use fulfil_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let base = Money::from_rupees(Decimal::from(200));
    /// let priced = base.apply_margin(Decimal::from(15));
    /// assert_eq!(priced, Money::from_rupees(Decimal::from(230)));
    /// ```
    pub fn apply_margin(&self, margin_pct: Decimal) -> Money {
        Money(self.0 * (Decimal::ONE + margin_pct / Decimal::ONE_HUNDRED))
    }

    /// Full GST on this amount (the IGST contribution).
    pub fn gst_full(&self, rate: GstRate) -> Money {
        self.percent(rate.percentage())
    }

    /// Half-rate GST on this amount (each of the CGST and SGST contributions).
    ///
    /// `amount × rate / 200`, kept at full precision.
    pub fn gst_half(&self, rate: GstRate) -> Money {
        Money(self.0 * rate.percentage() / Decimal::from(200))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount rounded to paise with a rupee sign.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.round_to_paise().0;
        if rounded.is_sign_negative() && !rounded.is_zero() {
            write!(f, "-₹{:.2}", rounded.abs())
        } else {
            write!(f, "₹{:.2}", rounded.abs())
        }
    }
}

/// Parses a stored decimal string such as `"1234.5625"`.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Money)
            .map_err(|e| ValidationError::InvalidFormat {
                field: "amount".to_string(),
                reason: e.to_string(),
            })
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(1099);
        assert_eq!(money.amount(), dec!(10.99));
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_paise(1099).to_string(), "₹10.99");
        assert_eq!(Money::from_rupees(dec!(5)).to_string(), "₹5.00");
        assert_eq!(Money::from_rupees(dec!(-0.4)).to_string(), "-₹0.40");
        assert_eq!(Money::from_rupees(dec!(26.578125)).to_string(), "₹26.58");
        assert_eq!(Money::zero().to_string(), "₹0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_rupees(dec!(10));
        let b = Money::from_rupees(dec!(2.5));

        assert_eq!(a + b, Money::from_rupees(dec!(12.5)));
        assert_eq!(a - b, Money::from_rupees(dec!(7.5)));
        assert_eq!(b * 3, Money::from_rupees(dec!(7.5)));
        assert_eq!(-b, Money::from_rupees(dec!(-2.5)));

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total, Money::from_rupees(dec!(15)));
    }

    #[test]
    fn test_gst_half_keeps_precision() {
        let line = Money::from_rupees(dec!(295.3125));
        let half = line.gst_half(GstRate::new(dec!(18)));
        assert_eq!(half.amount(), dec!(26.578125));
    }

    #[test]
    fn test_gst_split_matches_full_rate() {
        let line = Money::from_rupees(dec!(1000));
        let rate = GstRate::new(dec!(12));
        assert_eq!(line.gst_half(rate), Money::from_rupees(dec!(60)));
        assert_eq!(line.gst_half(rate) + line.gst_half(rate), line.gst_full(rate));
    }

    #[test]
    fn test_round_to_rupee_midpoint() {
        assert_eq!(
            Money::from_rupees(dec!(100.5)).round_to_rupee(),
            Money::from_rupees(dec!(101))
        );
        assert_eq!(
            Money::from_rupees(dec!(100.49)).round_to_rupee(),
            Money::from_rupees(dec!(100))
        );
    }

    #[test]
    fn test_parse() {
        let m: Money = "1234.5625".parse().unwrap();
        assert_eq!(m.amount(), dec!(1234.5625));
        assert!("12,00".parse::<Money>().is_err());
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_paise(1).is_positive());
        assert!(Money::from_paise(-1).is_negative());
        assert_eq!(Money::from_paise(-150).abs(), Money::from_paise(150));
    }
}
