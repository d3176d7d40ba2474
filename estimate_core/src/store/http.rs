//! Client for the estimate REST API.
//!
//! | operation | request |
//! |-----------|---------|
//! | list      | `GET    {base}/api/estimates` |
//! | get       | `GET    {base}/api/estimates/{id}` |
//! | create    | `POST   {base}/api/estimates` |
//! | update    | `PUT    {base}/api/estimates/{id}` |
//! | delete    | `DELETE {base}/api/estimates/{id}` |
//! | render    | `POST   {base}/api/estimates/{id}/pdf` |
//!
//! The server owns numbering, ids and timestamps. A 404 maps to
//! [`EstimateError::NotFound`]; any other failure, including an unreachable
//! server, is [`EstimateError::Remote`]. There are no retries and no
//! request timeout.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::errors::{EstimateError, EstimateResult};
use crate::estimate::{EstimatePayload, PersistedEstimate};
use crate::pdf::DocumentRenderer;

use super::EstimateStore;

const USER_AGENT: &str = concat!("havn-estimate/", env!("CARGO_PKG_VERSION"));

/// HTTP estimate store and remote document renderer.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl HttpStore {
    /// Client for the API rooted at `base_url` (e.g. `https://estimates.example.com`).
    pub fn new(base_url: impl Into<String>) -> EstimateResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| EstimateError::remote(None, format!("Failed to create HTTP client: {}", e)))?;
        Ok(HttpStore {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/api/estimates", self.base_url)
    }

    fn estimate_url(&self, id: &str) -> String {
        format!("{}/api/estimates/{}", self.base_url, id)
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/api/estimates/{}/pdf", self.base_url, id)
    }

    /// Send a request and turn non-success statuses into errors.
    async fn send(&self, request: RequestBuilder, id: Option<&str>) -> EstimateResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| EstimateError::remote(None, format!("Network error: {}", e)))?;

        let status = response.status();
        debug!(%status, url = %response.url(), "estimate API response");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(status, &body, id))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, id: Option<&str>) -> EstimateResult<T> {
        self.send(request, id)
            .await?
            .json::<T>()
            .await
            .map_err(|e| EstimateError::serialization(format!("Unexpected API response: {}", e)))
    }
}

/// Map a failed response to an error. FastAPI-style `{"detail": ...}`
/// bodies contribute their detail text.
fn error_for_status(status: StatusCode, body: &str, id: Option<&str>) -> EstimateError {
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return EstimateError::not_found(id);
        }
    }
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").map(|d| d.as_str().map(str::to_string).unwrap_or_else(|| d.to_string())))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body.trim().to_string()
            }
        });
    EstimateError::remote(Some(status.as_u16()), message)
}

impl EstimateStore for HttpStore {
    async fn list(&self) -> EstimateResult<Vec<PersistedEstimate>> {
        self.send_json(self.client.get(self.collection_url()), None).await
    }

    async fn get(&self, id: &str) -> EstimateResult<PersistedEstimate> {
        self.send_json(self.client.get(self.estimate_url(id)), Some(id)).await
    }

    async fn create(&self, payload: EstimatePayload) -> EstimateResult<PersistedEstimate> {
        let request = self.client.post(self.collection_url()).json(&payload);
        let created: PersistedEstimate = self.send_json(request, None).await?;
        info!(id = %created.id, number = %created.draft.estimate_number, "created estimate");
        Ok(created)
    }

    async fn update(&self, id: &str, payload: EstimatePayload) -> EstimateResult<PersistedEstimate> {
        let request = self.client.put(self.estimate_url(id)).json(&payload);
        let updated: PersistedEstimate = self.send_json(request, Some(id)).await?;
        info!(id, "updated estimate");
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> EstimateResult<()> {
        self.send(self.client.delete(self.estimate_url(id)), Some(id)).await?;
        info!(id, "deleted estimate");
        Ok(())
    }
}

impl DocumentRenderer for HttpStore {
    async fn render(&self, estimate: &PersistedEstimate) -> EstimateResult<Vec<u8>> {
        let response = self
            .send(self.client.post(self.document_url(&estimate.id)), Some(&estimate.id))
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| EstimateError::remote(None, format!("Failed to read document: {}", e)))?;
        Ok(bytes.to_vec())
    }
}
