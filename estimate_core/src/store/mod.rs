//! # Estimate Storage
//!
//! The storage collaborator behind the editor. Every backend implements
//! [`EstimateStore`]; the record rules they share (id assignment,
//! auto-numbering, timestamps, list order) live in [`ledger::Ledger`] so a
//! local file and an in-memory store behave exactly like the REST API.
//!
//! | backend | use |
//! |---------|-----|
//! | [`MemoryStore`] | tests, scratch sessions |
//! | [`FileStore`] | single JSON file with atomic saves and a lock file |
//! | [`HttpStore`] | the estimate REST API (`/api/estimates`) |

use std::future::Future;

use crate::errors::EstimateResult;
use crate::estimate::{EstimatePayload, PersistedEstimate};

#[cfg(not(target_arch = "wasm32"))]
pub mod file;
pub mod http;
pub mod ledger;
pub mod memory;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStore;
pub use http::HttpStore;
pub use ledger::Ledger;
pub use memory::MemoryStore;

/// Durable estimate storage.
pub trait EstimateStore {
    /// All estimates, newest first
    fn list(&self) -> impl Future<Output = EstimateResult<Vec<PersistedEstimate>>> + Send;

    /// One estimate by id; `NotFound` if absent
    fn get(&self, id: &str) -> impl Future<Output = EstimateResult<PersistedEstimate>> + Send;

    /// Persist a new estimate and return the stored record
    fn create(&self, payload: EstimatePayload) -> impl Future<Output = EstimateResult<PersistedEstimate>> + Send;

    /// Replace an existing estimate; `NotFound` if absent
    fn update(
        &self,
        id: &str,
        payload: EstimatePayload,
    ) -> impl Future<Output = EstimateResult<PersistedEstimate>> + Send;

    /// Remove an estimate; `NotFound` if absent
    fn delete(&self, id: &str) -> impl Future<Output = EstimateResult<()>> + Send;
}
