//! # Draft Session
//!
//! The editing lifecycle around a single [`EstimateDraft`]:
//!
//! ```text
//!             open_new(today)            edit_existing(estimate)
//!   Idle ───────────────────► New    Idle ───────────────────► Existing{id}
//!    ▲                          │                                   │
//!    │   discard / complete_save│                                   │
//!    └──────────────────────────┴───────────────────────────────────┘
//! ```
//!
//! Saving is two-step. [`EstimateSession::prepare_save`] checks the save
//! preconditions and builds the request for the storage collaborator without
//! leaving the editing state; only after storage succeeds does
//! [`EstimateSession::complete_save`] return the session to idle. A failed
//! store call therefore never loses the draft.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::errors::{EstimateError, EstimateResult, SaveBlocker};
use crate::estimate::{DraftField, EstimateDraft, EstimatePayload, PersistedEstimate};
use crate::line_item::{ItemKey, LineItem, LineItemField};
use crate::settings::EstimateSettings;
use crate::totals::EstimateTotals;

/// Where the active draft came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftOrigin {
    /// A brand-new estimate; saving creates a record
    New,
    /// A copy of a persisted estimate; saving updates that record
    Existing { id: String },
}

/// Which storage operation a save maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveTarget {
    Create,
    Update { id: String },
}

/// Everything the storage collaborator needs to persist the draft.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub target: SaveTarget,
    pub payload: EstimatePayload,
}

#[derive(Debug, Clone, PartialEq)]
struct ActiveDraft {
    origin: DraftOrigin,
    draft: EstimateDraft,
}

/// Holds at most one active draft and enforces its transitions.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateSession {
    default_tax_rate: Decimal,
    active: Option<ActiveDraft>,
}

impl EstimateSession {
    pub fn new(settings: &EstimateSettings) -> Self {
        EstimateSession {
            default_tax_rate: settings.default_tax_rate,
            active: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    pub fn origin(&self) -> Option<&DraftOrigin> {
        self.active.as_ref().map(|a| &a.origin)
    }

    pub fn draft(&self) -> Option<&EstimateDraft> {
        self.active.as_ref().map(|a| &a.draft)
    }

    /// Mutable access to the active draft
    pub fn draft_mut(&mut self) -> EstimateResult<&mut EstimateDraft> {
        self.active
            .as_mut()
            .map(|a| &mut a.draft)
            .ok_or(EstimateError::NoActiveDraft)
    }

    fn require_draft(&self) -> EstimateResult<&EstimateDraft> {
        self.draft().ok_or(EstimateError::NoActiveDraft)
    }

    /// Start a blank estimate dated `today`.
    pub fn open_new(&mut self, today: NaiveDate) -> &EstimateDraft {
        self.replace_active(DraftOrigin::New, EstimateDraft::new(today, self.default_tax_rate))
    }

    /// Start editing a copy of a persisted estimate.
    ///
    /// Line items keep their stored quantity and amount; they are only
    /// re-derived when a field is changed.
    pub fn edit_existing(&mut self, estimate: &PersistedEstimate) -> &EstimateDraft {
        let origin = DraftOrigin::Existing {
            id: estimate.id.clone(),
        };
        self.replace_active(origin, estimate.draft.clone())
    }

    fn replace_active(&mut self, origin: DraftOrigin, draft: EstimateDraft) -> &EstimateDraft {
        if let Some(previous) = &self.active {
            debug!(origin = ?previous.origin, "discarding active draft");
        }
        debug!(origin = ?origin, "opened draft");
        &self.active.insert(ActiveDraft { origin, draft }).draft
    }

    pub fn add_line_item(&mut self) -> EstimateResult<ItemKey> {
        Ok(self.draft_mut()?.add_line_item())
    }

    pub fn update_line_item(&mut self, index: usize, item: LineItem) -> EstimateResult<()> {
        self.draft_mut()?.update_line_item(index, item)
    }

    pub fn change_line_item(&mut self, index: usize, change: LineItemField) -> EstimateResult<&LineItem> {
        self.draft_mut()?.change_line_item(index, change)
    }

    pub fn delete_line_item(&mut self, index: usize) -> EstimateResult<LineItem> {
        let removed = self.draft_mut()?.delete_line_item(index)?;
        debug!(index, "deleted line item");
        Ok(removed)
    }

    pub fn update_item_by_key(&mut self, key: ItemKey, item: LineItem) -> EstimateResult<()> {
        self.draft_mut()?.update_item_by_key(key, item)
    }

    pub fn change_item_by_key(&mut self, key: ItemKey, change: LineItemField) -> EstimateResult<&LineItem> {
        self.draft_mut()?.change_item_by_key(key, change)
    }

    pub fn delete_item_by_key(&mut self, key: ItemKey) -> EstimateResult<LineItem> {
        self.draft_mut()?.delete_item_by_key(key)
    }

    pub fn index_of(&self, key: ItemKey) -> Option<usize> {
        self.draft()?.index_of(key)
    }

    pub fn set_draft_field(&mut self, field: DraftField) -> EstimateResult<()> {
        self.draft_mut()?.set_field(field);
        Ok(())
    }

    pub fn totals(&self) -> EstimateResult<EstimateTotals> {
        Ok(self.require_draft()?.totals())
    }

    /// Reasons the active draft cannot be saved; empty when it can.
    pub fn save_readiness(&self) -> EstimateResult<Vec<SaveBlocker>> {
        Ok(self.require_draft()?.save_blockers())
    }

    /// `true` when a draft is open and nothing blocks saving it
    pub fn can_save(&self) -> bool {
        self.draft().map_or(false, |d| d.save_blockers().is_empty())
    }

    /// Build the storage request for the active draft.
    ///
    /// The session stays in its editing state; call [`Self::complete_save`]
    /// once storage has accepted the request.
    pub fn prepare_save(&self) -> EstimateResult<SaveRequest> {
        let active = self.active.as_ref().ok_or(EstimateError::NoActiveDraft)?;
        let blockers = active.draft.save_blockers();
        if !blockers.is_empty() {
            return Err(EstimateError::SaveBlocked { blockers });
        }
        let target = match &active.origin {
            DraftOrigin::New => SaveTarget::Create,
            DraftOrigin::Existing { id } => SaveTarget::Update { id: id.clone() },
        };
        Ok(SaveRequest {
            target,
            payload: active.draft.to_payload(),
        })
    }

    /// Close the draft after a successful save.
    pub fn complete_save(&mut self) -> EstimateResult<()> {
        let active = self.active.take().ok_or(EstimateError::NoActiveDraft)?;
        debug!(origin = ?active.origin, "draft saved and closed");
        Ok(())
    }

    /// Drop the active draft without persisting anything. No-op when idle.
    pub fn discard(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(origin = ?active.origin, "draft discarded");
        }
    }
}

impl Default for EstimateSession {
    fn default() -> Self {
        EstimateSession::new(&EstimateSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_item::Unit;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    fn persisted() -> PersistedEstimate {
        let mut draft = EstimateDraft::new(today(), dec("12"));
        draft.client_name = "Existing Client".into();
        draft.estimate_number = "HCE-0007".into();
        draft.push_line_item(LineItem::count("Lights", dec("4"), dec("100")));
        PersistedEstimate {
            id: "est-7".into(),
            totals: draft.totals(),
            draft,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_idle_session_rejects_draft_operations() {
        let mut session = EstimateSession::default();
        assert!(session.is_idle());
        assert_eq!(session.add_line_item().unwrap_err(), EstimateError::NoActiveDraft);
        assert_eq!(session.totals().unwrap_err(), EstimateError::NoActiveDraft);
        assert_eq!(session.prepare_save().unwrap_err(), EstimateError::NoActiveDraft);
        assert!(!session.can_save());
        // discarding while idle is harmless
        session.discard();
    }

    #[test]
    fn test_open_new_uses_settings_defaults() {
        let settings = EstimateSettings {
            default_tax_rate: dec("5"),
            ..EstimateSettings::default()
        };
        let mut session = EstimateSession::new(&settings);
        let draft = session.open_new(today());
        assert_eq!(draft.tax_rate, dec("5"));
        assert_eq!(draft.date, today());
        assert!(draft.client_name.is_empty());
        assert!(draft.line_items().is_empty());
        assert_eq!(session.origin(), Some(&DraftOrigin::New));
        assert_eq!(session.totals().unwrap(), EstimateTotals::default());
    }

    #[test]
    fn test_edit_existing_copies_fields() {
        let estimate = persisted();
        let mut session = EstimateSession::default();
        let draft = session.edit_existing(&estimate);
        assert_eq!(draft, &estimate.draft);
        assert_eq!(
            session.origin(),
            Some(&DraftOrigin::Existing { id: "est-7".into() })
        );
    }

    #[test]
    fn test_opening_replaces_active_draft() {
        let mut session = EstimateSession::default();
        session.edit_existing(&persisted());
        session.open_new(today());
        assert_eq!(session.origin(), Some(&DraftOrigin::New));
        assert!(session.draft().unwrap().line_items().is_empty());
    }

    #[test]
    fn test_save_blocked_until_client_and_items() {
        let mut session = EstimateSession::default();
        session.open_new(today());
        match session.prepare_save().unwrap_err() {
            EstimateError::SaveBlocked { blockers } => assert_eq!(blockers.len(), 2),
            other => panic!("unexpected error: {:?}", other),
        }

        session.set_draft_field(DraftField::ClientName("Asha".into())).unwrap();
        assert_eq!(session.save_readiness().unwrap(), vec![SaveBlocker::NoLineItems]);

        session.add_line_item().unwrap();
        assert!(session.can_save());
        let request = session.prepare_save().unwrap();
        assert_eq!(request.target, SaveTarget::Create);
        // still editing until the store confirms
        assert!(!session.is_idle());
    }

    #[test]
    fn test_existing_origin_maps_to_update() {
        let mut session = EstimateSession::default();
        session.edit_existing(&persisted());
        // payload contents do not influence the target
        session
            .set_draft_field(DraftField::EstimateNumber("HCE-9999".into()))
            .unwrap();
        let request = session.prepare_save().unwrap();
        assert_eq!(request.target, SaveTarget::Update { id: "est-7".into() });
        assert_eq!(request.payload.draft.estimate_number, "HCE-9999");
        assert_eq!(request.payload.totals.total_amount, dec("448"));
    }

    #[test]
    fn test_complete_save_and_discard_return_to_idle() {
        let mut session = EstimateSession::default();
        session.edit_existing(&persisted());
        session.complete_save().unwrap();
        assert!(session.is_idle());
        assert_eq!(session.complete_save().unwrap_err(), EstimateError::NoActiveDraft);

        session.open_new(today());
        session.discard();
        assert!(session.is_idle());
    }

    #[test]
    fn test_line_item_operations_through_session() {
        let mut session = EstimateSession::default();
        session.open_new(today());
        let key = session.add_line_item().unwrap();
        session.change_line_item(0, LineItemField::LengthFeet(10)).unwrap();
        session.change_line_item(0, LineItemField::LengthInches(6)).unwrap();
        session.change_line_item(0, LineItemField::WidthFeet(8)).unwrap();
        let item = session.change_line_item(0, LineItemField::Rate(dec("50"))).unwrap();
        assert_eq!(item.amount(), dec("4200"));

        session.add_line_item().unwrap();
        session.change_line_item(1, LineItemField::Unit(Unit::Count)).unwrap();
        session.change_line_item(1, LineItemField::Quantity(dec("10"))).unwrap();
        session.change_line_item(1, LineItemField::Rate(dec("150"))).unwrap();

        let totals = session.totals().unwrap();
        assert_eq!(totals.subtotal, dec("5700"));
        assert_eq!(totals.tax_amount, dec("1026"));
        assert_eq!(totals.total_amount, dec("6726"));

        session.delete_item_by_key(key).unwrap();
        assert_eq!(session.index_of(key), None);
        assert_eq!(session.totals().unwrap().subtotal, dec("1500"));
        assert!(session.delete_line_item(3).is_err());
    }
}
