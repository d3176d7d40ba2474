//! In-process estimate storage.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tracing::info;

use crate::errors::{EstimateError, EstimateResult};
use crate::estimate::{EstimatePayload, PersistedEstimate};
use crate::settings::EstimateSettings;

use super::{EstimateStore, Ledger};

/// A [`Ledger`] behind a mutex. Nothing survives the process.
#[derive(Debug)]
pub struct MemoryStore {
    ledger: Mutex<Ledger>,
    number_prefix: String,
}

impl MemoryStore {
    pub fn new(settings: &EstimateSettings) -> Self {
        Self::with_ledger(Ledger::new(), settings)
    }

    /// Start from existing records.
    pub fn with_ledger(ledger: Ledger, settings: &EstimateSettings) -> Self {
        MemoryStore {
            ledger: Mutex::new(ledger),
            number_prefix: settings.number_prefix.clone(),
        }
    }

    /// Copy of the current ledger
    pub fn snapshot(&self) -> EstimateResult<Ledger> {
        Ok(self.ledger()?.clone())
    }

    fn ledger(&self) -> EstimateResult<MutexGuard<'_, Ledger>> {
        self.ledger.lock().map_err(|_| EstimateError::Internal {
            message: "estimate ledger lock poisoned".to_string(),
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new(&EstimateSettings::default())
    }
}

impl EstimateStore for MemoryStore {
    async fn list(&self) -> EstimateResult<Vec<PersistedEstimate>> {
        Ok(self.ledger()?.list())
    }

    async fn get(&self, id: &str) -> EstimateResult<PersistedEstimate> {
        self.ledger()?.get(id).cloned()
    }

    async fn create(&self, payload: EstimatePayload) -> EstimateResult<PersistedEstimate> {
        let created = self.ledger()?.create(payload, &self.number_prefix, Utc::now());
        info!(id = %created.id, number = %created.draft.estimate_number, "created estimate");
        Ok(created)
    }

    async fn update(&self, id: &str, payload: EstimatePayload) -> EstimateResult<PersistedEstimate> {
        let updated = self.ledger()?.update(id, payload, Utc::now())?;
        info!(id = %updated.id, "updated estimate");
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> EstimateResult<()> {
        self.ledger()?.delete(id)?;
        info!(id, "deleted estimate");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::EstimateDraft;
    use crate::line_item::LineItem;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn payload(client: &str) -> EstimatePayload {
        let mut draft = EstimateDraft::new(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(), Decimal::from(18));
        draft.client_name = client.to_string();
        draft.push_line_item(LineItem::count("Lights", Decimal::from(2), Decimal::from(100)));
        draft.to_payload()
    }

    #[tokio::test]
    async fn test_crud_cycle() {
        let store = MemoryStore::default();
        assert!(store.list().await.unwrap().is_empty());

        let created = store.create(payload("Asha")).await.unwrap();
        assert_eq!(created.draft.estimate_number, "HCE-0001");
        assert_eq!(store.get(&created.id).await.unwrap(), created);

        let mut edit = created.draft.clone();
        edit.client_name = "Asha Rao".into();
        let updated = store.update(&created.id, edit.to_payload()).await.unwrap();
        assert_eq!(updated.draft.client_name, "Asha Rao");

        store.delete(&created.id).await.unwrap();
        assert_eq!(store.get(&created.id).await.unwrap_err().error_code(), "NOT_FOUND");
        assert!(store.delete(&created.id).await.is_err());
    }

    #[tokio::test]
    async fn test_prefix_comes_from_settings() {
        let settings = EstimateSettings {
            number_prefix: "QT".into(),
            ..EstimateSettings::default()
        };
        let store = MemoryStore::new(&settings);
        let created = store.create(payload("Asha")).await.unwrap();
        assert_eq!(created.draft.estimate_number, "QT-0001");
        assert_eq!(store.snapshot().unwrap().len(), 1);
    }
}
