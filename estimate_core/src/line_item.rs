//! # Line Items
//!
//! One priced row of an estimate. A line item is either area based (`SQFT`,
//! quantity = length x width from feet+inches measurements) or count based
//! (`NOS`, quantity typed in directly). Its amount is always
//! `quantity * rate`.
//!
//! `quantity` and `amount` are derived and private. The only way to change
//! an input field is [`apply_field_change`], which returns a new item with
//! both derived values recomputed, so a `LineItem` handed to the aggregator
//! is always self-consistent.
//!
//! Switching the unit does not clear the fields of the other unit: an item
//! toggled `SQFT -> NOS -> SQFT` gets its old dimensions (and quantity) back.
//!
//! ## Example
//!
//! ```rust
//! use estimate_core::line_item::{apply_field_change, LineItem, LineItemField, Unit};
//! use rust_decimal::Decimal;
//!
//! let item = LineItem::new();
//! let item = apply_field_change(&item, LineItemField::LengthFeet(10));
//! let item = apply_field_change(&item, LineItemField::LengthInches(6));
//! let item = apply_field_change(&item, LineItemField::WidthFeet(8));
//! let item = apply_field_change(&item, LineItemField::Rate(Decimal::from(50)));
//!
//! assert_eq!(item.unit(), Unit::Area);
//! assert_eq!(item.quantity(), Decimal::from(84));
//! assert_eq!(item.amount(), Decimal::from(4200));
//! ```

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::errors::{EstimateError, EstimateResult};
use crate::units::{resolve_area, FeetInches};

// ============================================================================
// Unit
// ============================================================================

/// How a line item's quantity is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Unit {
    /// Square feet from length x width
    #[default]
    #[serde(rename = "SQFT")]
    Area,
    /// Number of pieces, entered directly
    #[serde(rename = "NOS")]
    Count,
}

impl Unit {
    /// Label used on screen, in documents and on the wire
    pub fn label(&self) -> &'static str {
        match self {
            Unit::Area => "SQFT",
            Unit::Count => "NOS",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Unit {
    type Err = EstimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SQFT" | "AREA" => Ok(Unit::Area),
            "NOS" | "COUNT" => Ok(Unit::Count),
            _ => Err(EstimateError::invalid_input("unit", s, "unit must be SQFT or NOS")),
        }
    }
}

// ============================================================================
// Item keys
// ============================================================================

/// Stable in-memory identity of a line item.
///
/// Positions shift when an item above is deleted; keys do not. Keys are
/// never persisted: every load hands out fresh ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey(Uuid);

impl ItemKey {
    pub fn new() -> Self {
        ItemKey(Uuid::new_v4())
    }
}

impl Default for ItemKey {
    fn default() -> Self {
        ItemKey::new()
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// LineItem
// ============================================================================

/// One priced row of an estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LineItemRecord", into = "LineItemRecord")]
pub struct LineItem {
    key: ItemKey,
    id: String,
    particulars: String,
    unit: Unit,
    length: FeetInches,
    width: FeetInches,
    direct_quantity: Decimal,
    rate: Decimal,
    quantity: Decimal,
    amount: Decimal,
}

impl LineItem {
    /// A blank area item: zeroed measurements, zero rate, no description.
    pub fn new() -> Self {
        LineItem {
            key: ItemKey::new(),
            id: String::new(),
            particulars: String::new(),
            unit: Unit::Area,
            length: FeetInches::default(),
            width: FeetInches::default(),
            direct_quantity: Decimal::ZERO,
            rate: Decimal::ZERO,
            quantity: Decimal::ZERO,
            amount: Decimal::ZERO,
        }
    }

    /// An area item measured as `length x width`.
    pub fn area(particulars: impl Into<String>, length: FeetInches, width: FeetInches, rate: Decimal) -> Self {
        let mut item = LineItem {
            particulars: particulars.into(),
            unit: Unit::Area,
            length,
            width,
            rate: non_negative(rate),
            ..LineItem::new()
        };
        item.recompute();
        item
    }

    /// A count item with a directly entered quantity.
    pub fn count(particulars: impl Into<String>, quantity: Decimal, rate: Decimal) -> Self {
        let mut item = LineItem {
            particulars: particulars.into(),
            unit: Unit::Count,
            direct_quantity: non_negative(quantity),
            rate: non_negative(rate),
            ..LineItem::new()
        };
        item.recompute();
        item
    }

    pub fn key(&self) -> ItemKey {
        self.key
    }

    /// Storage id; empty until the item has been persisted
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn particulars(&self) -> &str {
        &self.particulars
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn length(&self) -> FeetInches {
        self.length
    }

    pub fn width(&self) -> FeetInches {
        self.width
    }

    /// The typed-in quantity used by `NOS` items (kept while the item is `SQFT`)
    pub fn direct_quantity(&self) -> Decimal {
        self.direct_quantity
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    /// Derived quantity as of the last change
    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    /// Derived amount as of the last change
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub(crate) fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn recompute(&mut self) {
        self.quantity = derive_quantity(self);
        self.amount = derive_amount(self);
    }
}

impl Default for LineItem {
    fn default() -> Self {
        LineItem::new()
    }
}

// ============================================================================
// Derivation
// ============================================================================

/// Quantity implied by the item's current unit and inputs.
pub fn derive_quantity(item: &LineItem) -> Decimal {
    match item.unit {
        Unit::Area => resolve_area(item.length.feet, item.length.inches, item.width.feet, item.width.inches),
        Unit::Count => item.direct_quantity,
    }
}

/// `derive_quantity(item) * rate`
pub fn derive_amount(item: &LineItem) -> Decimal {
    derive_quantity(item).saturating_mul(item.rate)
}

/// A single input-field change on a line item.
#[derive(Debug, Clone, PartialEq)]
pub enum LineItemField {
    Particulars(String),
    Unit(Unit),
    LengthFeet(u32),
    LengthInches(u32),
    WidthFeet(u32),
    WidthInches(u32),
    /// Direct quantity for `NOS` items
    Quantity(Decimal),
    Rate(Decimal),
}

impl LineItemField {
    /// Field names accepted by [`LineItemField::parse`]
    pub const NAMES: [&'static str; 8] = [
        "particulars",
        "unit",
        "length_feet",
        "length_inches",
        "width_feet",
        "width_inches",
        "quantity",
        "rate",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LineItemField::Particulars(_) => "particulars",
            LineItemField::Unit(_) => "unit",
            LineItemField::LengthFeet(_) => "length_feet",
            LineItemField::LengthInches(_) => "length_inches",
            LineItemField::WidthFeet(_) => "width_feet",
            LineItemField::WidthInches(_) => "width_inches",
            LineItemField::Quantity(_) => "quantity",
            LineItemField::Rate(_) => "rate",
        }
    }

    /// Build a field change from raw text input.
    ///
    /// Numbers are coerced, never rejected: empty, garbled or negative input
    /// becomes 0 and fractional measurements are truncated. Only an unknown
    /// field name or unit label is an error.
    pub fn parse(name: &str, raw: &str) -> EstimateResult<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        let field = match normalized.as_str() {
            "particulars" => LineItemField::Particulars(raw.trim().to_string()),
            "unit" => LineItemField::Unit(raw.parse()?),
            "length_feet" => LineItemField::LengthFeet(coerce_whole(raw)),
            "length_inches" => LineItemField::LengthInches(coerce_whole(raw)),
            "width_feet" => LineItemField::WidthFeet(coerce_whole(raw)),
            "width_inches" => LineItemField::WidthInches(coerce_whole(raw)),
            "quantity" => LineItemField::Quantity(non_negative(coerce_decimal(raw))),
            "rate" => LineItemField::Rate(non_negative(coerce_decimal(raw))),
            _ => {
                return Err(EstimateError::invalid_input(
                    "field",
                    name,
                    format!("expected one of: {}", Self::NAMES.join(", ")),
                ))
            }
        };
        Ok(field)
    }
}

/// Return a copy of `item` with `change` applied and quantity/amount recomputed.
pub fn apply_field_change(item: &LineItem, change: LineItemField) -> LineItem {
    let mut next = item.clone();
    match change {
        LineItemField::Particulars(text) => next.particulars = text,
        LineItemField::Unit(unit) => next.unit = unit,
        LineItemField::LengthFeet(v) => next.length.feet = v,
        LineItemField::LengthInches(v) => next.length.inches = v,
        LineItemField::WidthFeet(v) => next.width.feet = v,
        LineItemField::WidthInches(v) => next.width.inches = v,
        LineItemField::Quantity(v) => next.direct_quantity = non_negative(v),
        LineItemField::Rate(v) => next.rate = non_negative(v),
    }
    next.recompute();
    next
}

// ============================================================================
// Input coercion
// ============================================================================

/// Parse a decimal from user text; anything unparseable is 0.
///
/// Thousands separators are accepted (`"1,500.50"`), as is scientific
/// notation.
pub fn coerce_decimal(raw: &str) -> Decimal {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .unwrap_or(Decimal::ZERO)
}

/// Parse a whole, non-negative number from user text; fractions truncate,
/// anything unparseable or negative is 0.
pub fn coerce_whole(raw: &str) -> u32 {
    non_negative(coerce_decimal(raw)).trunc().to_u32().unwrap_or(u32::MAX)
}

/// Clamp negative values to zero
pub fn non_negative(value: Decimal) -> Decimal {
    if value.is_sign_negative() {
        Decimal::ZERO
    } else {
        value
    }
}

// ============================================================================
// Wire format
// ============================================================================

/// JSON shape of a line item, compatible with the estimate REST API.
///
/// `quantity` and `amount` are stored values and are trusted as-is on load.
/// `direct_quantity` is our own addition; records written by other clients
/// lack it, in which case a `NOS` item's stored quantity is its direct
/// quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LineItemRecord {
    #[serde(default)]
    id: String,
    #[serde(default)]
    particulars: String,
    #[serde(default, deserialize_with = "lenient_whole")]
    length_feet: u32,
    #[serde(default, deserialize_with = "lenient_whole")]
    length_inches: u32,
    #[serde(default, deserialize_with = "lenient_whole")]
    width_feet: u32,
    #[serde(default, deserialize_with = "lenient_whole")]
    width_inches: u32,
    #[serde(default, deserialize_with = "null_as_zero")]
    quantity: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    direct_quantity: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_unit")]
    unit: Unit,
    #[serde(default, deserialize_with = "null_as_zero")]
    rate: Decimal,
    #[serde(default, deserialize_with = "null_as_zero")]
    amount: Decimal,
}

impl From<LineItemRecord> for LineItem {
    fn from(record: LineItemRecord) -> Self {
        let direct_quantity = match (record.direct_quantity, record.unit) {
            (Some(direct), _) => direct,
            (None, Unit::Count) => record.quantity,
            (None, Unit::Area) => Decimal::ZERO,
        };
        LineItem {
            key: ItemKey::new(),
            id: record.id,
            particulars: record.particulars,
            unit: record.unit,
            length: FeetInches::new(record.length_feet, record.length_inches),
            width: FeetInches::new(record.width_feet, record.width_inches),
            direct_quantity: non_negative(direct_quantity),
            rate: non_negative(record.rate),
            quantity: record.quantity,
            amount: record.amount,
        }
    }
}

impl From<LineItem> for LineItemRecord {
    fn from(item: LineItem) -> Self {
        LineItemRecord {
            id: item.id,
            particulars: item.particulars,
            length_feet: item.length.feet,
            length_inches: item.length.inches,
            width_feet: item.width.feet,
            width_inches: item.width.inches,
            quantity: item.quantity,
            direct_quantity: Some(item.direct_quantity),
            unit: item.unit,
            rate: item.rate,
            amount: item.amount,
        }
    }
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    Ok(Option::<Decimal>::deserialize(deserializer)?.unwrap_or(Decimal::ZERO))
}

/// Missing or null is `SQFT`; any label we do not know is priced per piece.
fn lenient_unit<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Unit, D::Error> {
    Ok(match Option::<String>::deserialize(deserializer)? {
        None => Unit::Area,
        Some(label) if label.trim().is_empty() => Unit::Area,
        Some(label) => label.parse().unwrap_or(Unit::Count),
    })
}

fn lenient_whole<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    // float-to-int `as` casts saturate and map NaN to 0
    Ok(Option::<f64>::deserialize(deserializer)?.map(|v| v as u32).unwrap_or(0))
}
