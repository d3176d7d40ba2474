//! Storage and rendering backends selected on the command line.

use std::path::PathBuf;

use estimate_core::errors::EstimateResult;
use estimate_core::estimate::{EstimatePayload, PersistedEstimate};
use estimate_core::pdf::{DocumentRenderer, TypstRenderer};
use estimate_core::settings::EstimateSettings;
use estimate_core::store::{EstimateStore, FileStore, HttpStore};

/// Where estimates live.
pub enum Backend {
    File(FileStore),
    Http(HttpStore),
}

/// Who renders documents.
pub enum Renderer {
    Local(TypstRenderer),
    Remote(HttpStore),
}

/// A local JSON ledger renders with Typst; a remote API renders itself.
pub fn connect(
    store: PathBuf,
    remote: Option<&str>,
    settings: &EstimateSettings,
) -> EstimateResult<(Backend, Renderer)> {
    match remote {
        Some(url) => {
            let client = HttpStore::new(url)?;
            Ok((Backend::Http(client.clone()), Renderer::Remote(client)))
        }
        None => Ok((
            Backend::File(FileStore::new(store, settings)),
            Renderer::Local(TypstRenderer::new(settings.clone())),
        )),
    }
}

impl EstimateStore for Backend {
    async fn list(&self) -> EstimateResult<Vec<PersistedEstimate>> {
        match self {
            Backend::File(store) => store.list().await,
            Backend::Http(store) => store.list().await,
        }
    }

    async fn get(&self, id: &str) -> EstimateResult<PersistedEstimate> {
        match self {
            Backend::File(store) => store.get(id).await,
            Backend::Http(store) => store.get(id).await,
        }
    }

    async fn create(&self, payload: EstimatePayload) -> EstimateResult<PersistedEstimate> {
        match self {
            Backend::File(store) => store.create(payload).await,
            Backend::Http(store) => store.create(payload).await,
        }
    }

    async fn update(&self, id: &str, payload: EstimatePayload) -> EstimateResult<PersistedEstimate> {
        match self {
            Backend::File(store) => store.update(id, payload).await,
            Backend::Http(store) => store.update(id, payload).await,
        }
    }

    async fn delete(&self, id: &str) -> EstimateResult<()> {
        match self {
            Backend::File(store) => store.delete(id).await,
            Backend::Http(store) => store.delete(id).await,
        }
    }
}

impl DocumentRenderer for Renderer {
    async fn render(&self, estimate: &PersistedEstimate) -> EstimateResult<Vec<u8>> {
        match self {
            Renderer::Local(renderer) => renderer.render(estimate).await,
            Renderer::Remote(client) => client.render(estimate).await,
        }
    }
}
