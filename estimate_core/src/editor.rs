//! # Estimate Editor
//!
//! Ties the draft session to the storage and rendering collaborators and
//! keeps the list of estimates a user is looking at.
//!
//! Collaborator failures are contained: they are logged, remembered as
//! [`EstimateEditor::last_error`] and returned, while the displayed list and
//! the active draft stay exactly as they were. Every successful create,
//! update or delete is followed by a list refresh.
//!
//! Deleting is two-step. [`EstimateEditor::request_delete`] hands out a
//! [`DeleteConfirmation`]; only that exact confirmation, passed back to
//! [`EstimateEditor::confirm_delete`], reaches the store.

use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{EstimateError, EstimateResult};
use crate::estimate::{EstimateDraft, PersistedEstimate};
use crate::pdf::{document_file_name, DocumentRenderer};
use crate::session::{DraftOrigin, EstimateSession, SaveTarget};
use crate::settings::EstimateSettings;
use crate::store::EstimateStore;

/// Proof that the user was asked before deleting an estimate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub id: String,
    /// Estimate number at request time, for the confirmation prompt
    pub label: String,
    token: Uuid,
}

/// A rendered estimate document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Draft session plus collaborators.
pub struct EstimateEditor<S, R> {
    store: S,
    renderer: R,
    settings: EstimateSettings,
    session: EstimateSession,
    estimates: Vec<PersistedEstimate>,
    last_error: Option<EstimateError>,
    pending_delete: Option<DeleteConfirmation>,
}

impl<S: EstimateStore, R: DocumentRenderer> EstimateEditor<S, R> {
    pub fn new(store: S, renderer: R, settings: EstimateSettings) -> Self {
        EstimateEditor {
            session: EstimateSession::new(&settings),
            store,
            renderer,
            settings,
            estimates: Vec::new(),
            last_error: None,
            pending_delete: None,
        }
    }

    pub fn settings(&self) -> &EstimateSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Estimates as of the last successful refresh, newest first
    pub fn estimates(&self) -> &[PersistedEstimate] {
        &self.estimates
    }

    pub fn session(&self) -> &EstimateSession {
        &self.session
    }

    /// Direct access for field and line item edits on the active draft
    pub fn session_mut(&mut self) -> &mut EstimateSession {
        &mut self.session
    }

    pub fn draft(&self) -> Option<&EstimateDraft> {
        self.session.draft()
    }

    /// The most recent collaborator failure, cleared by the next success
    pub fn last_error(&self) -> Option<&EstimateError> {
        self.last_error.as_ref()
    }

    pub fn pending_delete(&self) -> Option<&DeleteConfirmation> {
        self.pending_delete.as_ref()
    }

    fn contain<T>(&mut self, operation: &str, result: EstimateResult<T>) -> EstimateResult<T> {
        match result {
            Ok(value) => {
                self.last_error = None;
                Ok(value)
            }
            Err(error) => {
                warn!(operation, code = error.error_code(), %error, "estimate operation failed");
                self.last_error = Some(error.clone());
                Err(error)
            }
        }
    }

    /// Reload the estimate list from the store.
    pub async fn refresh(&mut self) -> EstimateResult<&[PersistedEstimate]> {
        let result = self.store.list().await;
        let estimates = self.contain("list", result)?;
        debug!(count = estimates.len(), "refreshed estimate list");
        self.estimates = estimates;
        Ok(&self.estimates)
    }

    /// Start a blank draft.
    pub fn open_new(&mut self, today: NaiveDate) -> &EstimateDraft {
        self.session.open_new(today)
    }

    /// Start editing the estimate with `id`.
    ///
    /// Uses the copy from the displayed list when there is one, otherwise
    /// fetches it from the store.
    pub async fn open_existing(&mut self, id: &str) -> EstimateResult<&EstimateDraft> {
        let estimate = self.find_or_fetch(id).await?;
        Ok(self.session.edit_existing(&estimate))
    }

    /// Current stored copy of the estimate with `id`.
    pub async fn fetch(&mut self, id: &str) -> EstimateResult<PersistedEstimate> {
        let result = self.store.get(id).await;
        self.contain("get", result)
    }

    async fn find_or_fetch(&mut self, id: &str) -> EstimateResult<PersistedEstimate> {
        if let Some(found) = self.estimates.iter().find(|e| e.id == id) {
            return Ok(found.clone());
        }
        self.fetch(id).await
    }

    /// Persist the active draft.
    ///
    /// A blocked draft never reaches the store. On success the session
    /// returns to idle and the list is refreshed; a failed refresh is
    /// logged but does not undo the save.
    pub async fn save(&mut self) -> EstimateResult<PersistedEstimate> {
        let request = self.session.prepare_save()?;
        let result = match &request.target {
            SaveTarget::Create => self.store.create(request.payload).await,
            SaveTarget::Update { id } => self.store.update(id, request.payload).await,
        };
        let saved = self.contain("save", result)?;

        self.session.complete_save()?;
        let _ = self.refresh().await;
        Ok(saved)
    }

    /// Drop the active draft.
    pub fn discard(&mut self) {
        self.session.discard();
    }

    /// Ask to delete the estimate with `id`. Replaces any earlier request.
    pub fn request_delete(&mut self, id: &str) -> DeleteConfirmation {
        let label = self
            .estimates
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.display_number().to_string())
            .unwrap_or_else(|| id.to_string());
        let confirmation = DeleteConfirmation {
            id: id.to_string(),
            label,
            token: Uuid::new_v4(),
        };
        debug!(id, "delete requested");
        self.pending_delete = Some(confirmation.clone());
        confirmation
    }

    pub fn cancel_delete(&mut self) {
        if self.pending_delete.take().is_some() {
            debug!("delete cancelled");
        }
    }

    /// Delete the estimate named by a confirmation from [`Self::request_delete`].
    ///
    /// A confirmation that does not match the pending request is refused
    /// without contacting the store. Deleting the estimate that is open in
    /// the session also discards that draft.
    pub async fn confirm_delete(&mut self, confirmation: &DeleteConfirmation) -> EstimateResult<()> {
        if self.pending_delete.as_ref() != Some(confirmation) {
            return Err(EstimateError::DeleteNotConfirmed {
                id: confirmation.id.clone(),
            });
        }

        let result = self.store.delete(&confirmation.id).await;
        self.contain("delete", result)?;
        self.pending_delete = None;

        let editing_deleted = matches!(
            self.session.origin(),
            Some(DraftOrigin::Existing { id }) if *id == confirmation.id
        );
        if editing_deleted {
            self.session.discard();
        }

        let _ = self.refresh().await;
        Ok(())
    }

    /// Render the estimate with `id` through the document collaborator.
    pub async fn render_document(&mut self, id: &str) -> EstimateResult<RenderedDocument> {
        let estimate = self.find_or_fetch(id).await?;
        let result = self.renderer.render(&estimate).await;
        let bytes = self.contain("render", result)?;
        Ok(RenderedDocument {
            file_name: document_file_name(&estimate),
            bytes,
        })
    }
}
