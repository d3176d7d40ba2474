//! # Estimate Data Structures
//!
//! ```text
//! EstimateDraft            (in-memory working copy)
//! ├── client_name / client_address / client_phone
//! ├── estimate_number      (empty = let storage assign one)
//! ├── date
//! ├── tax_rate             (percent)
//! └── line_items: Vec<LineItem>   (order = print order)
//!
//! EstimatePayload   = draft + computed totals      (sent to storage)
//! PersistedEstimate = id + draft + totals + timestamps (returned by storage)
//! ```
//!
//! Totals are computed from the items every time they are asked for; a
//! draft never stores them.
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use estimate_core::estimate::{DraftField, EstimateDraft};
//! use estimate_core::line_item::LineItemField;
//! use rust_decimal::Decimal;
//!
//! let today = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
//! let mut draft = EstimateDraft::new(today, Decimal::from(18));
//! draft.set_field(DraftField::ClientName("Asha Rao".into()));
//!
//! draft.add_line_item();
//! draft.change_line_item(0, LineItemField::Unit("NOS".parse().unwrap())).unwrap();
//! draft.change_line_item(0, LineItemField::Quantity(Decimal::from(15))).unwrap();
//! draft.change_line_item(0, LineItemField::Rate(Decimal::from(250))).unwrap();
//!
//! assert_eq!(draft.totals().total_amount, Decimal::new(442500, 2));
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{EstimateError, EstimateResult, SaveBlocker};
use crate::line_item::{apply_field_change, coerce_decimal, ItemKey, LineItem, LineItemField};
use crate::settings::DEFAULT_TAX_RATE_PERCENT;
use crate::totals::{compute_totals, EstimateTotals};

fn default_tax_rate() -> Decimal {
    Decimal::from(DEFAULT_TAX_RATE_PERCENT)
}

/// The editable fields of an estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DraftRecord")]
pub struct EstimateDraft {
    pub client_name: String,
    pub client_address: String,
    pub client_phone: String,

    /// User-supplied number, or empty for storage auto-numbering
    pub estimate_number: String,

    pub date: NaiveDate,

    /// Tax rate in percent (intended 0-100, not clamped)
    pub tax_rate: Decimal,

    line_items: Vec<LineItem>,
}

/// Incoming JSON shape of a draft.
///
/// Other clients may store an empty or free-form `date`; it loads as `None`
/// and the owner of the record decides which date to use instead.
#[derive(Debug, Deserialize)]
struct DraftRecord {
    #[serde(default)]
    client_name: String,
    #[serde(default)]
    client_address: String,
    #[serde(default)]
    client_phone: String,
    #[serde(default)]
    estimate_number: String,
    #[serde(default, deserialize_with = "lenient_date")]
    date: Option<NaiveDate>,
    #[serde(default = "default_tax_rate")]
    tax_rate: Decimal,
    #[serde(default)]
    line_items: Vec<LineItem>,
}

impl DraftRecord {
    fn into_draft(self, fallback_date: NaiveDate) -> EstimateDraft {
        EstimateDraft {
            client_name: self.client_name,
            client_address: self.client_address,
            client_phone: self.client_phone,
            estimate_number: self.estimate_number,
            date: self.date.unwrap_or(fallback_date),
            tax_rate: self.tax_rate,
            line_items: self.line_items,
        }
    }
}

impl From<DraftRecord> for EstimateDraft {
    fn from(record: DraftRecord) -> Self {
        record.into_draft(Utc::now().date_naive())
    }
}

impl EstimateDraft {
    /// A blank draft dated `date` with the given tax rate.
    pub fn new(date: NaiveDate, tax_rate: Decimal) -> Self {
        EstimateDraft {
            client_name: String::new(),
            client_address: String::new(),
            client_phone: String::new(),
            estimate_number: String::new(),
            date,
            tax_rate,
            line_items: Vec::new(),
        }
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn line_item(&self, index: usize) -> Option<&LineItem> {
        self.line_items.get(index)
    }

    pub fn item_count(&self) -> usize {
        self.line_items.len()
    }

    pub(crate) fn line_items_mut(&mut self) -> &mut [LineItem] {
        &mut self.line_items
    }

    /// Append a blank `SQFT` item and return its key.
    pub fn add_line_item(&mut self) -> ItemKey {
        self.push_line_item(LineItem::new())
    }

    /// Append a prepared item and return its key.
    pub fn push_line_item(&mut self, item: LineItem) -> ItemKey {
        let key = item.key();
        self.line_items.push(item);
        key
    }

    /// Replace the item at `index`.
    pub fn update_line_item(&mut self, index: usize, item: LineItem) -> EstimateResult<()> {
        let slot = self.slot_mut(index)?;
        *slot = item;
        Ok(())
    }

    /// Apply one field change to the item at `index` and return the result.
    pub fn change_line_item(&mut self, index: usize, change: LineItemField) -> EstimateResult<&LineItem> {
        let slot = self.slot_mut(index)?;
        *slot = apply_field_change(slot, change);
        Ok(&*slot)
    }

    /// Remove the item at `index`; later items move up by one.
    pub fn delete_line_item(&mut self, index: usize) -> EstimateResult<LineItem> {
        self.check_index(index)?;
        Ok(self.line_items.remove(index))
    }

    /// Current position of the item with `key`
    pub fn index_of(&self, key: ItemKey) -> Option<usize> {
        self.line_items.iter().position(|item| item.key() == key)
    }

    pub fn update_item_by_key(&mut self, key: ItemKey, item: LineItem) -> EstimateResult<()> {
        let index = self.require_key(key)?;
        self.update_line_item(index, item)
    }

    pub fn change_item_by_key(&mut self, key: ItemKey, change: LineItemField) -> EstimateResult<&LineItem> {
        let index = self.require_key(key)?;
        self.change_line_item(index, change)
    }

    pub fn delete_item_by_key(&mut self, key: ItemKey) -> EstimateResult<LineItem> {
        let index = self.require_key(key)?;
        self.delete_line_item(index)
    }

    /// Set one top-level field.
    pub fn set_field(&mut self, field: DraftField) {
        match field {
            DraftField::ClientName(v) => self.client_name = v,
            DraftField::ClientAddress(v) => self.client_address = v,
            DraftField::ClientPhone(v) => self.client_phone = v,
            DraftField::EstimateNumber(v) => self.estimate_number = v,
            DraftField::Date(v) => self.date = v,
            DraftField::TaxRate(v) => self.tax_rate = v,
        }
    }

    /// Totals as of right now.
    pub fn totals(&self) -> EstimateTotals {
        compute_totals(&self.line_items, self.tax_rate)
    }

    /// Everything that currently prevents a save; empty when saving is allowed.
    pub fn save_blockers(&self) -> Vec<SaveBlocker> {
        let mut blockers = Vec::new();
        if self.client_name.trim().is_empty() {
            blockers.push(SaveBlocker::MissingClientName);
        }
        if self.line_items.is_empty() {
            blockers.push(SaveBlocker::NoLineItems);
        }
        blockers
    }

    /// Bundle the draft with freshly computed totals.
    pub fn to_payload(&self) -> EstimatePayload {
        EstimatePayload {
            totals: self.totals(),
            draft: self.clone(),
        }
    }

    fn check_index(&self, index: usize) -> EstimateResult<()> {
        if index >= self.line_items.len() {
            return Err(EstimateError::IndexOutOfRange {
                index,
                len: self.line_items.len(),
            });
        }
        Ok(())
    }

    fn slot_mut(&mut self, index: usize) -> EstimateResult<&mut LineItem> {
        self.check_index(index)?;
        Ok(&mut self.line_items[index])
    }

    fn require_key(&self, key: ItemKey) -> EstimateResult<usize> {
        self.index_of(key).ok_or_else(|| EstimateError::ItemNotFound { key: key.to_string() })
    }
}

/// A single top-level draft field change.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftField {
    ClientName(String),
    ClientAddress(String),
    ClientPhone(String),
    EstimateNumber(String),
    Date(NaiveDate),
    TaxRate(Decimal),
}

impl DraftField {
    /// Field names accepted by [`DraftField::parse`]
    pub const NAMES: [&'static str; 6] = [
        "client_name",
        "client_address",
        "client_phone",
        "estimate_number",
        "date",
        "tax_rate",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DraftField::ClientName(_) => "client_name",
            DraftField::ClientAddress(_) => "client_address",
            DraftField::ClientPhone(_) => "client_phone",
            DraftField::EstimateNumber(_) => "estimate_number",
            DraftField::Date(_) => "date",
            DraftField::TaxRate(_) => "tax_rate",
        }
    }

    /// Build a field change from raw text.
    ///
    /// The tax rate is coerced like any numeric input (garbage becomes 0).
    /// Dates must be `YYYY-MM-DD` or `DD/MM/YYYY`.
    pub fn parse(name: &str, raw: &str) -> EstimateResult<Self> {
        let text = raw.trim().to_string();
        let field = match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "client_name" => DraftField::ClientName(text),
            "client_address" => DraftField::ClientAddress(text),
            "client_phone" => DraftField::ClientPhone(text),
            "estimate_number" => DraftField::EstimateNumber(text),
            "date" => DraftField::Date(parse_date(&text)?),
            "tax_rate" => DraftField::TaxRate(coerce_decimal(&text)),
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

fn parse_date(text: &str) -> EstimateResult<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%d/%m/%Y"))
        .map_err(|_| EstimateError::invalid_input("date", text, "expected YYYY-MM-DD or DD/MM/YYYY"))
}

/// Draft fields plus computed totals: what gets handed to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatePayload {
    #[serde(flatten)]
    pub draft: EstimateDraft,

    #[serde(flatten)]
    pub totals: EstimateTotals,
}

/// An estimate as returned by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PersistedRecord")]
pub struct PersistedEstimate {
    pub id: String,

    #[serde(flatten)]
    pub draft: EstimateDraft,

    /// Totals as stored at save time
    #[serde(flatten)]
    pub totals: EstimateTotals,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Incoming JSON shape of a stored estimate.
///
/// Timestamps may carry an offset (`...Z`) or be naive UTC as the REST API
/// writes them (`2025-01-01T00:00:00.123456`).
#[derive(Debug, Deserialize)]
struct PersistedRecord {
    id: String,
    #[serde(flatten)]
    draft: DraftRecord,
    #[serde(flatten)]
    totals: EstimateTotals,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    updated_at: Option<DateTime<Utc>>,
}

impl From<PersistedRecord> for PersistedEstimate {
    fn from(record: PersistedRecord) -> Self {
        // an undated record is dated by when it was stored
        let fallback_date = record
            .created_at
            .or(record.updated_at)
            .unwrap_or_else(Utc::now)
            .date_naive();
        PersistedEstimate {
            id: record.id,
            draft: record.draft.into_draft(fallback_date),
            totals: record.totals,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.and_then(|text| {
        let text = text.trim();
        parse_date(text)
            .ok()
            .or_else(|| parse_timestamp(text).map(|at| at.date_naive()))
    }))
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.and_then(|text| parse_timestamp(text.trim())))
}

/// RFC 3339, or a naive ISO date-time taken as UTC.
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    text.parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

impl PersistedEstimate {
    /// Estimate number, or the id when no number was ever assigned
    pub fn display_number(&self) -> &str {
        if self.draft.estimate_number.trim().is_empty() {
            &self.id
        } else {
            &self.draft.estimate_number
        }
    }
}
