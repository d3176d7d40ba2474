//! # Estimate Ledger
//!
//! The record list behind the local storage backends, and the rules every
//! backend applies when it persists a payload:
//!
//! - **create**: new UUID id; an empty estimate number becomes
//!   `{prefix}-{count + 1:04}`; line items without an id get one;
//!   `created_at = updated_at = now`
//! - **update**: id and `created_at` are kept, missing item ids are filled,
//!   `updated_at = now`; numbers are left exactly as sent
//! - **list**: newest `created_at` first
//!
//! Numbering counts records, so deleting an estimate can make a later
//! create reuse a number. Numbers are not guaranteed unique.
//!
//! The ledger is plain data: it never touches a clock or the filesystem.
//! Callers pass `now` in and decide where the ledger lives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{EstimateError, EstimateResult};
use crate::estimate::{EstimateDraft, EstimatePayload, PersistedEstimate};

/// Current ledger file schema version
pub const SCHEMA_VERSION: &str = "0.1.0";

/// All persisted estimates of one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// Schema version for migration support
    pub version: String,

    #[serde(default)]
    pub estimates: Vec<PersistedEstimate>,
}

impl Default for Ledger {
    fn default() -> Self {
        Ledger::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Ledger {
            version: SCHEMA_VERSION.to_string(),
            estimates: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.estimates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimates.is_empty()
    }

    /// Copy of every estimate, newest first.
    pub fn list(&self) -> Vec<PersistedEstimate> {
        let mut estimates = self.estimates.clone();
        // stable sort: records without a timestamp go last, in insertion order
        estimates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        estimates
    }

    pub fn get(&self, id: &str) -> EstimateResult<&PersistedEstimate> {
        self.estimates
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| EstimateError::not_found(id))
    }

    /// The number the next auto-numbered create would receive.
    pub fn next_number(&self, prefix: &str) -> String {
        format!("{}-{:04}", prefix, self.estimates.len() + 1)
    }

    /// Store a new estimate.
    pub fn create(&mut self, payload: EstimatePayload, prefix: &str, now: DateTime<Utc>) -> PersistedEstimate {
        let EstimatePayload { mut draft, totals } = payload;
        if draft.estimate_number.trim().is_empty() {
            draft.estimate_number = self.next_number(prefix);
        }
        assign_item_ids(&mut draft);

        let estimate = PersistedEstimate {
            id: Uuid::new_v4().to_string(),
            draft,
            totals,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.estimates.push(estimate.clone());
        estimate
    }

    /// Replace the estimate with `id`.
    pub fn update(&mut self, id: &str, payload: EstimatePayload, now: DateTime<Utc>) -> EstimateResult<PersistedEstimate> {
        let slot = self
            .estimates
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| EstimateError::not_found(id))?;

        let EstimatePayload { mut draft, totals } = payload;
        assign_item_ids(&mut draft);
        slot.draft = draft;
        slot.totals = totals;
        slot.updated_at = Some(now);
        Ok(slot.clone())
    }

    /// Remove the estimate with `id`.
    pub fn delete(&mut self, id: &str) -> EstimateResult<PersistedEstimate> {
        let index = self
            .estimates
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| EstimateError::not_found(id))?;
        Ok(self.estimates.remove(index))
    }
}

fn assign_item_ids(draft: &mut EstimateDraft) {
    for item in draft.line_items_mut() {
        if item.id().is_empty() {
            item.assign_id(Uuid::new_v4().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_item::LineItem;
    use chrono::{Duration, NaiveDate, TimeZone};
    use rust_decimal::Decimal;

    fn payload(client: &str) -> EstimatePayload {
        let mut draft = EstimateDraft::new(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(), Decimal::from(18));
        draft.client_name = client.to_string();
        draft.push_line_item(LineItem::count("Switches", Decimal::from(15), Decimal::from(250)));
        draft.to_payload()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_create_assigns_number_ids_and_timestamps() {
        let mut ledger = Ledger::new();
        let first = ledger.create(payload("A"), "HCE", t0());
        let second = ledger.create(payload("B"), "HCE", t0());

        assert_eq!(first.draft.estimate_number, "HCE-0001");
        assert_eq!(second.draft.estimate_number, "HCE-0002");
        assert_ne!(first.id, second.id);
        assert!(!first.draft.line_items()[0].id().is_empty());
        assert_eq!(first.created_at, Some(t0()));
        assert_eq!(first.updated_at, Some(t0()));
        assert_eq!(first.totals.total_amount, Decimal::from(4425));
    }

    #[test]
    fn test_create_keeps_user_number() {
        let mut ledger = Ledger::new();
        let mut request = payload("A");
        request.draft.estimate_number = "SITE-42".into();
        let created = ledger.create(request, "HCE", t0());
        assert_eq!(created.draft.estimate_number, "SITE-42");
        // the next auto number still counts records
        assert_eq!(ledger.next_number("HCE"), "HCE-0002");
    }

    #[test]
    fn test_update_keeps_identity() {
        let mut ledger = Ledger::new();
        let created = ledger.create(payload("A"), "HCE", t0());
        let item_id = created.draft.line_items()[0].id().to_string();

        let mut edit = created.draft.clone();
        edit.client_name = "A (revised)".into();
        edit.estimate_number = String::new();
        edit.add_line_item();
        let later = t0() + Duration::hours(2);

        let updated = ledger.update(&created.id, edit.to_payload(), later).unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, Some(t0()));
        assert_eq!(updated.updated_at, Some(later));
        assert_eq!(updated.draft.client_name, "A (revised)");
        // update never auto-numbers
        assert_eq!(updated.draft.estimate_number, "");
        assert_eq!(updated.draft.line_items()[0].id(), item_id);
        assert!(!updated.draft.line_items()[1].id().is_empty());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_missing_ids_are_not_found() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.get("nope").unwrap_err().error_code(), "NOT_FOUND");
        assert_eq!(
            ledger.update("nope", payload("A"), t0()).unwrap_err(),
            EstimateError::not_found("nope")
        );
        assert!(ledger.delete("nope").is_err());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_list_is_newest_first() {
        let mut ledger = Ledger::new();
        let old = ledger.create(payload("old"), "HCE", t0());
        let new = ledger.create(payload("new"), "HCE", t0() + Duration::days(1));
        let mid = ledger.create(payload("mid"), "HCE", t0() + Duration::hours(3));

        let ids: Vec<String> = ledger.list().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![new.id, mid.id, old.id]);
    }

    #[test]
    fn test_delete_then_create_reuses_count() {
        let mut ledger = Ledger::new();
        let first = ledger.create(payload("A"), "HCE", t0());
        ledger.create(payload("B"), "HCE", t0());
        ledger.delete(&first.id).unwrap();
        let third = ledger.create(payload("C"), "HCE", t0());
        assert_eq!(third.draft.estimate_number, "HCE-0002");
    }
}
