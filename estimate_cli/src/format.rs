//! Plain-text tables for the terminal.

use std::fmt::Write;

use estimate_core::estimate::{EstimateDraft, PersistedEstimate};
use estimate_core::line_item::{LineItem, Unit};
use estimate_core::totals::{format_currency, format_quantity, EstimateTotals};

pub fn estimate_list(estimates: &[PersistedEstimate], symbol: &str) -> String {
    if estimates.is_empty() {
        return "No estimates yet.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "{:<14} {:<10} {:<28} {:>16}  {}", "NUMBER", "DATE", "CLIENT", "TOTAL", "ID");
    for estimate in estimates {
        let _ = writeln!(
            out,
            "{:<14} {:<10} {:<28} {:>16}  {}",
            clip(estimate.display_number(), 14),
            estimate.draft.date.format("%Y-%m-%d"),
            clip(&estimate.draft.client_name, 28),
            format_currency(estimate.totals.total_amount, symbol),
            estimate.id,
        );
    }
    out
}

/// Full view of a stored estimate, using its stored totals.
pub fn persisted_estimate(estimate: &PersistedEstimate, symbol: &str) -> String {
    let mut out = format!("Estimate {}  (id {})\n", estimate.display_number(), estimate.id);
    out.push_str(&draft_body(&estimate.draft, &estimate.totals, symbol));
    out
}

/// Full view of a draft with live totals.
pub fn draft(draft: &EstimateDraft, symbol: &str) -> String {
    let number = if draft.estimate_number.trim().is_empty() {
        "(assigned on save)"
    } else {
        draft.estimate_number.as_str()
    };
    let mut out = format!("Estimate {}\n", number);
    out.push_str(&draft_body(draft, &draft.totals(), symbol));
    out
}

fn draft_body(draft: &EstimateDraft, totals: &EstimateTotals, symbol: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Date:    {}", draft.date.format("%Y-%m-%d"));
    let _ = writeln!(out, "Client:  {}", draft.client_name);
    if !draft.client_address.is_empty() {
        let _ = writeln!(out, "Address: {}", draft.client_address.replace('\n', ", "));
    }
    if !draft.client_phone.is_empty() {
        let _ = writeln!(out, "Phone:   {}", draft.client_phone);
    }
    out.push('\n');

    if draft.line_items().is_empty() {
        out.push_str("  (no line items)\n");
    } else {
        let _ = writeln!(
            out,
            "{:>3}  {:<30} {:<17} {:>10} {:<4} {:>14} {:>16}",
            "#", "PARTICULARS", "SIZE", "QTY", "UNIT", "RATE", "AMOUNT"
        );
        for (i, item) in draft.line_items().iter().enumerate() {
            let _ = writeln!(out, "{}", item_row(i + 1, item, symbol));
        }
    }

    out.push('\n');
    let _ = writeln!(out, "{:>20} {:>16}", "Subtotal:", format_currency(totals.subtotal, symbol));
    let _ = writeln!(
        out,
        "{:>20} {:>16}",
        format!("Tax ({}%):", draft.tax_rate.normalize()),
        format_currency(totals.tax_amount, symbol)
    );
    let _ = writeln!(out, "{:>20} {:>16}", "Total:", format_currency(totals.total_amount, symbol));
    out
}

/// One item line, numbered from 1.
pub fn item_row(number: usize, item: &LineItem, symbol: &str) -> String {
    let size = match item.unit() {
        Unit::Area => format!("{} x {}", item.length(), item.width()),
        Unit::Count => String::new(),
    };
    format!(
        "{:>3}  {:<30} {:<17} {:>10} {:<4} {:>14} {:>16}",
        number,
        clip(item.particulars(), 30),
        size,
        format_quantity(item.quantity()),
        item.unit().label(),
        format_currency(item.rate(), symbol),
        format_currency(item.amount(), symbol),
    )
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
        clipped.push('…');
        clipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use estimate_core::units::FeetInches;
    use rust_decimal::Decimal;

    #[test]
    fn test_empty_list() {
        assert_eq!(estimate_list(&[], "₹"), "No estimates yet.\n");
    }

    #[test]
    fn test_draft_view_shows_live_totals() {
        let mut d = EstimateDraft::new(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(), Decimal::from(18));
        d.client_name = "Asha".into();
        d.push_line_item(LineItem::area("Ceiling", FeetInches::new(10, 6), FeetInches::new(8, 0), Decimal::from(50)));
        let text = draft(&d, "₹");
        assert!(text.contains("(assigned on save)"));
        assert!(text.contains("10' 6\" x 8' 0\""));
        assert!(text.contains("₹4,200.00"));
        assert!(text.contains("Tax (18%):"));
        assert!(text.contains("₹4,956.00"));
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("a very long client name", 8), "a very …");
    }
}
