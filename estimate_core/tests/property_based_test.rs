use chrono::NaiveDate;
use estimate_core::estimate::EstimateDraft;
use estimate_core::line_item::{apply_field_change, derive_amount, derive_quantity, LineItem, LineItemField, Unit};
use estimate_core::totals::compute_totals;
use estimate_core::units::{resolve_area, resolve_length, FeetInches};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Money-like decimals with up to two places
fn money() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000, 0u32..=2).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

/// Inches that resolve to exact quarter feet, keeping sums exact
fn quarter_inches() -> impl Strategy<Value = u32> {
    prop_oneof![Just(0u32), Just(3u32), Just(6u32), Just(9u32)]
}

fn area_item() -> impl Strategy<Value = LineItem> {
    (0u32..200, quarter_inches(), 0u32..200, quarter_inches(), money()).prop_map(|(lf, li, wf, wi, rate)| {
        LineItem::area("area", FeetInches::new(lf, li), FeetInches::new(wf, wi), rate)
    })
}

fn count_item() -> impl Strategy<Value = LineItem> {
    (money(), money()).prop_map(|(qty, rate)| LineItem::count("count", qty, rate))
}

fn any_item() -> impl Strategy<Value = LineItem> {
    prop_oneof![area_item(), count_item()]
}

fn draft_with(items: Vec<LineItem>) -> EstimateDraft {
    let mut draft = EstimateDraft::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), Decimal::from(18));
    for item in items {
        draft.push_line_item(item);
    }
    draft
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        ..ProptestConfig::default()
    })]

    #[test]
    fn prop_length_is_feet_plus_twelfths(feet in 0u32..10_000, inches in 0u32..48) {
        let length = resolve_length(feet, inches);
        prop_assert_eq!(length - Decimal::from(feet), Decimal::from(inches) / Decimal::from(12));
        prop_assert!(length >= Decimal::from(feet));
    }

    #[test]
    fn prop_whole_feet_of_inches(feet in 0u32..10_000, extra_feet in 0u32..10) {
        prop_assert_eq!(resolve_length(feet, extra_feet * 12), Decimal::from(feet + extra_feet));
    }

    #[test]
    fn prop_area_quantity_is_product_of_lengths(
        lf in 0u32..500, li in 0u32..12, wf in 0u32..500, wi in 0u32..12, rate in money()
    ) {
        let item = LineItem::area("x", FeetInches::new(lf, li), FeetInches::new(wf, wi), rate);
        prop_assert_eq!(item.quantity(), resolve_length(lf, li) * resolve_length(wf, wi));
        prop_assert_eq!(item.quantity(), resolve_area(lf, li, wf, wi));
    }

    #[test]
    fn prop_unit_toggle_restores_quantity(item in any_item()) {
        let other = match item.unit() {
            Unit::Area => Unit::Count,
            Unit::Count => Unit::Area,
        };
        let toggled = apply_field_change(&item, LineItemField::Unit(other));
        let back = apply_field_change(&toggled, LineItemField::Unit(item.unit()));
        prop_assert_eq!(back.quantity(), item.quantity());
        prop_assert_eq!(back.amount(), item.amount());
    }

    #[test]
    fn prop_count_quantity_is_direct_quantity(qty in money(), rate in money()) {
        let item = LineItem::count("x", qty, rate);
        prop_assert_eq!(derive_quantity(&item), qty);
        prop_assert_eq!(item.quantity(), qty);
    }

    #[test]
    fn prop_amount_is_quantity_times_rate(item in any_item(), rate in money()) {
        let item = apply_field_change(&item, LineItemField::Rate(rate));
        prop_assert_eq!(item.amount(), item.quantity() * rate);
        prop_assert_eq!(derive_amount(&item), item.amount());

        let free = apply_field_change(&item, LineItemField::Rate(Decimal::ZERO));
        prop_assert_eq!(free.amount(), Decimal::ZERO);
    }

    #[test]
    fn prop_subtotal_is_additive(
        a in prop::collection::vec(any_item(), 0..8),
        b in prop::collection::vec(any_item(), 0..8),
        rate in money()
    ) {
        let joined: Vec<LineItem> = a.iter().chain(b.iter()).cloned().collect();
        let whole = compute_totals(&joined, rate);
        prop_assert_eq!(
            whole.subtotal,
            compute_totals(&a, rate).subtotal + compute_totals(&b, rate).subtotal
        );
    }

    #[test]
    fn prop_tax_and_total(items in prop::collection::vec(any_item(), 0..10), rate in 0i64..=100) {
        let rate = Decimal::from(rate);
        let totals = compute_totals(&items, rate);
        let subtotal: Decimal = items.iter().map(|i| i.amount()).sum();
        prop_assert_eq!(totals.subtotal, subtotal);
        prop_assert_eq!(totals.tax_amount, totals.subtotal * rate / Decimal::ONE_HUNDRED);
        prop_assert_eq!(totals.total_amount, totals.subtotal + totals.tax_amount);
    }

    #[test]
    fn prop_empty_items_total_zero(rate in money()) {
        let totals = compute_totals(&[], rate);
        prop_assert_eq!(totals.subtotal, Decimal::ZERO);
        prop_assert_eq!(totals.tax_amount, Decimal::ZERO);
        prop_assert_eq!(totals.total_amount, Decimal::ZERO);
    }

    #[test]
    fn prop_delete_shifts_later_items(
        items in prop::collection::vec(any_item(), 1..12),
        pick in any::<prop::sample::Index>()
    ) {
        let k = pick.index(items.len());
        let mut draft = draft_with(items.clone());
        let removed = draft.delete_line_item(k).unwrap();

        prop_assert_eq!(&removed, &items[k]);
        prop_assert_eq!(draft.item_count(), items.len() - 1);
        prop_assert_eq!(&draft.line_items()[..k], &items[..k]);
        prop_assert_eq!(&draft.line_items()[k..], &items[k + 1..]);
    }

    #[test]
    fn prop_out_of_range_delete_changes_nothing(items in prop::collection::vec(any_item(), 0..6), extra in 0usize..4) {
        let mut draft = draft_with(items.clone());
        prop_assert!(draft.delete_line_item(items.len() + extra).is_err());
        prop_assert_eq!(draft.line_items(), &items[..]);
    }
}

#[test]
fn area_scenario() {
    let item = LineItem::area("Living room", FeetInches::new(10, 6), FeetInches::new(8, 0), Decimal::from(50));
    assert_eq!(item.quantity(), Decimal::from(84));
    assert_eq!(item.amount(), Decimal::from(4200));
}

#[test]
fn two_item_totals_scenario() {
    let items = vec![
        LineItem::area("Living room", FeetInches::new(10, 6), FeetInches::new(8, 0), Decimal::from(50)),
        LineItem::count("Spotlights", Decimal::from(10), Decimal::from(150)),
    ];
    let totals = compute_totals(&items, Decimal::from(18));
    assert_eq!(totals.subtotal, Decimal::from(5700));
    assert_eq!(totals.tax_amount, Decimal::from(1026));
    assert_eq!(totals.total_amount, Decimal::from(6726));
}
