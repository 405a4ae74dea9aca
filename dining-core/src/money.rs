//! Money calculation utilities using rust_decimal for precision
//!
//! All arithmetic stays in exact `Decimal`. Rounding to cents happens only in
//! [`Totals::rounded`], i.e. at presentation, so repeated recomputation never
//! compounds rounding error.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// Fixed sales tax rate (6%)
pub const TAX_RATE: Decimal = Decimal::from_parts(6, 0, 0, false, 2);

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Round a monetary value for display
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Subtotal, tax and grand total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl Totals {
    /// `tax = subtotal × 6%`, `total = subtotal + tax` (exact)
    pub fn from_subtotal(subtotal: Decimal) -> Self {
        let tax = subtotal * TAX_RATE;
        Self {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }

    /// Sum line subtotals, then apply tax
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = Decimal>,
    {
        Self::from_subtotal(lines.into_iter().sum())
    }

    /// Presentation form: each part rounded to cents, `total = subtotal + tax`
    pub fn rounded(&self) -> Self {
        let subtotal = round_money(self.subtotal);
        let tax = round_money(self.tax);
        Self {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

/// Line subtotal (unit price already includes add-ons)
#[inline]
pub fn line_subtotal(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_tax_rate_is_six_percent() {
        assert_eq!(TAX_RATE, d("0.06"));
    }

    #[test]
    fn test_basic_totals() {
        let totals = Totals::from_lines([line_subtotal(d("10.00"), 2)]).rounded();
        assert_eq!(totals.subtotal, d("20.00"));
        assert_eq!(totals.tax, d("1.20"));
        assert_eq!(totals.total, d("21.20"));
    }

    #[test]
    fn test_rounding_only_at_presentation() {
        // 0.05 × 0.06 = 0.003, kept exact internally
        let exact = Totals::from_subtotal(d("0.05"));
        assert_eq!(exact.tax, d("0.003"));
        assert_eq!(exact.rounded().tax, d("0.00"));

        // half-up
        let exact = Totals::from_subtotal(d("0.25"));
        assert_eq!(exact.tax, d("0.015"));
        assert_eq!(exact.rounded().tax, d("0.02"));
        assert_eq!(exact.rounded().total, d("0.27"));
    }

    #[test]
    fn test_order_of_lines_does_not_matter() {
        let lines = [d("3.33"), d("12.75"), d("0.99"), d("7.10")];
        let forward = Totals::from_lines(lines);
        let backward = Totals::from_lines(lines.iter().rev().copied());
        assert_eq!(forward, backward);

        let s = d("24.17");
        assert_eq!(forward.rounded().tax, round_money(s * d("0.06")));
        assert_eq!(forward.rounded().total, s + forward.rounded().tax);
    }

    #[test]
    fn test_many_small_items_no_drift() {
        let totals = Totals::from_lines((0..100).map(|_| d("0.01")));
        assert_eq!(totals.subtotal, d("1.00"));
        assert_eq!(totals.rounded().tax, d("0.06"));
        assert_eq!(totals.rounded().total, d("1.06"));
    }
}
