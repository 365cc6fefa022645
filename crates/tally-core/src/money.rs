//! # Money Module
//!
//! Monetary values as integer cents.
//!
//! ## Why Integer Money?
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                      │
//! │                                                                  │
//! │  0.1 + 0.2 = 0.30000000000000004  -> wrong                       │
//! │  Rs 10.00 / 3 = 3.33 (x3 = 9.99)  -> a paisa vanished silently   │
//! │                                                                  │
//! │  OUR SOLUTION: integer cents                                     │
//! │    1000 / 3 = 333 (x3 = 999) - we KNOW where the cent went       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every subtotal, tax, discount and total in a bill flows through this
//! type. The two ratio helpers, [`Money::prorate`] and
//! [`Money::scale_by`], are the arithmetic backbone of returns: a partial
//! return takes a quantity-fraction of a line's subtotal, and the return
//! tax scales the return subtotal by the original bill's tax ratio.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: negative values exist for refunds and stock-ledger
///   deltas
/// - **Single field tuple struct**: zero-cost abstraction over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Rs 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a line quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Takes a `numerator / denominator` fraction of this amount, rounded
    /// half-up at cent precision.
    ///
    /// This is the partial-return computation: returning `q` units of a
    /// line that originally sold `n` units refunds `subtotal * q / n`.
    /// Multiplying before dividing keeps the result cent-exact.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// // Line subtotal Rs 10.00 over 4 units; return 1 unit -> Rs 2.50
    /// let line = Money::from_cents(1000);
    /// assert_eq!(line.prorate(1, 4).cents(), 250);
    ///
    /// // Uneven split rounds at the cent: 1000 * 1 / 3 = 333
    /// assert_eq!(line.prorate(1, 3).cents(), 333);
    /// ```
    ///
    /// A zero or negative denominator yields zero rather than panicking;
    /// the caller validates quantities before money math happens.
    pub fn prorate(&self, numerator: i64, denominator: i64) -> Money {
        if denominator <= 0 {
            return Money::zero();
        }
        // i128 intermediate to avoid overflow, +den/2 for half-up rounding
        let scaled =
            (self.0 as i128 * numerator as i128 + denominator as i128 / 2) / denominator as i128;
        Money(scaled as i64)
    }

    /// Scales this amount by the ratio of two other amounts, rounded
    /// half-up at cent precision.
    ///
    /// Used for tax proration: a return bill's tax is
    /// `return_subtotal * (original_tax / original_subtotal)`.
    ///
    /// ## Divide-by-zero Guard
    /// A zero denominator yields zero tax (an all-discount bill has no
    /// tax ratio to speak of).
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let return_subtotal = Money::from_cents(15000);
    /// let orig_tax = Money::from_cents(3000);
    /// let orig_subtotal = Money::from_cents(30000);
    /// assert_eq!(return_subtotal.scale_by(orig_tax, orig_subtotal).cents(), 1500);
    /// ```
    pub fn scale_by(&self, numerator: Money, denominator: Money) -> Money {
        if denominator.0 == 0 {
            return Money::zero();
        }
        let den = denominator.0 as i128;
        let half = den.abs() / 2;
        let scaled = (self.0 as i128 * numerator.0 as i128 + half * den.signum()) / den;
        Money(scaled as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display is for logs and debugging; currency formatting for humans is a
/// presentation concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
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

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!(a.multiply_quantity(3).cents(), 3000);
    }

    #[test]
    fn test_prorate_even_split() {
        // Rs 10.00 over 4 units, return 1 -> Rs 2.50
        assert_eq!(Money::from_cents(1000).prorate(1, 4).cents(), 250);
        // Full return is the identity
        assert_eq!(Money::from_cents(1000).prorate(4, 4).cents(), 1000);
    }

    #[test]
    fn test_prorate_uneven_split_rounds() {
        // 1000 * 1 / 3 = 333.33 -> 333
        assert_eq!(Money::from_cents(1000).prorate(1, 3).cents(), 333);
        // 1000 * 2 / 3 = 666.67 -> 667
        assert_eq!(Money::from_cents(1000).prorate(2, 3).cents(), 667);
    }

    #[test]
    fn test_prorate_bad_denominator_is_zero() {
        assert_eq!(Money::from_cents(1000).prorate(1, 0).cents(), 0);
        assert_eq!(Money::from_cents(1000).prorate(1, -2).cents(), 0);
    }

    #[test]
    fn test_scale_by_tax_ratio() {
        // 10% tax ratio carried onto a return subtotal
        let ret = Money::from_cents(15000);
        let tax = Money::from_cents(3000);
        let sub = Money::from_cents(30000);
        assert_eq!(ret.scale_by(tax, sub).cents(), 1500);
    }

    #[test]
    fn test_scale_by_zero_denominator() {
        let ret = Money::from_cents(15000);
        assert_eq!(ret.scale_by(Money::from_cents(100), Money::zero()).cents(), 0);
    }

    #[test]
    fn test_scale_by_rounds_half_up() {
        // 999 * 825 / 10000 = 82.4175 -> 82
        let amount = Money::from_cents(999);
        let scaled = amount.scale_by(Money::from_cents(825), Money::from_cents(10000));
        assert_eq!(scaled.cents(), 82);
        // 500 * 1 / 1000 = 0.5 -> 1
        let tiny = Money::from_cents(500);
        assert_eq!(tiny.scale_by(Money::from_cents(1), Money::from_cents(1000)).cents(), 1);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
    }

    /// Documents the intentional precision behavior of integer division:
    /// the rounding error of a prorated split never exceeds half a cent
    /// per line.
    #[test]
    fn test_prorate_error_bounded() {
        let line = Money::from_cents(1000);
        let parts: i64 = (0..3).map(|_| line.prorate(1, 3).cents()).sum();
        // 3 * 333 = 999; one cent short of 1000 and we know it
        assert_eq!(parts, 999);
    }
}
