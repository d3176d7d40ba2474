//! # Estimate Totals
//!
//! Aggregates line item amounts into subtotal, tax and grand total.
//!
//! Totals are never stored as live draft state. They are recomputed from the
//! items and the tax rate every time they are read, so they cannot drift.
//! Amounts are re-derived from each item's inputs rather than read from its
//! cached `amount`, which matters for items loaded from storage.
//!
//! ## Example
//!
//! ```rust
//! use estimate_core::line_item::LineItem;
//! use estimate_core::totals::compute_totals;
//! use rust_decimal::Decimal;
//!
//! let items = vec![
//!     LineItem::count("Wardrobe shutters", Decimal::from(2), Decimal::from(2100)),
//!     LineItem::count("Handles", Decimal::from(10), Decimal::from(150)),
//! ];
//! let totals = compute_totals(&items, Decimal::from(18));
//! assert_eq!(totals.subtotal, Decimal::from(5700));
//! assert_eq!(totals.tax_amount, Decimal::from(1026));
//! assert_eq!(totals.total_amount, Decimal::from(6726));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::line_item::{derive_amount, LineItem};

/// Subtotal, tax and grand total of an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EstimateTotals {
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    #[serde(default)]
    pub total_amount: Decimal,
}

/// Sum item amounts and apply a percentage tax rate.
///
/// No rounding happens here; `tax_amount` is exactly
/// `subtotal * tax_rate / 100`.
pub fn compute_totals(items: &[LineItem], tax_rate: Decimal) -> EstimateTotals {
    let subtotal = items
        .iter()
        .map(derive_amount)
        .fold(Decimal::ZERO, |acc, amount| acc.saturating_add(amount));
    let tax_amount = subtotal.saturating_mul(tax_rate) / Decimal::ONE_HUNDRED;
    EstimateTotals {
        subtotal,
        tax_amount,
        total_amount: subtotal.saturating_add(tax_amount),
    }
}

/// Format a money value with two decimals and comma-grouped thousands
/// (`₹4,200.00`). Half-cents round away from zero.
pub fn format_currency(value: Decimal, symbol: &str) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    format!("{}{}{}.{}", sign, symbol, group_thousands(whole), fraction)
}

/// Format a quantity with two decimal places.
pub fn format_quantity(value: Decimal) -> String {
    format!("{:.2}", value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
