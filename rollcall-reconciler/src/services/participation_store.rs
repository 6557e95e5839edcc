//! ParticipationStore client
//!
//! The store owns participation records. The reconciler lists snapshots and
//! requests status changes; every call may fail independently.
//!
//! # HTTP contract
//! - `GET  {base}/participations?eventId=&status=` → `[Participation]`
//!   (or `{"participations": [...]}`)
//! - `POST {base}/participations/{id}/approve`
//! - `POST {base}/participations/{id}/reject`
//! - `PATCH {base}/participations/{id}/attendance` with `{"attended": bool}`

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::{Participation, ParticipationFilter};

/// ParticipationStore call errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Base URL could not be parsed or cannot carry path segments
    #[error("Invalid store base URL: {0}")]
    InvalidBaseUrl(String),

    /// Connection or transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Store answered with a non-success status
    #[error("Store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("Unexpected store response: {0}")]
    Decode(String),

    /// Call exceeded its time budget
    #[error("Store call timed out after {0} ms")]
    Timeout(u64),
}

/// Operations the reconciler needs from the participation store
#[async_trait]
pub trait ParticipationStore: Send + Sync {
    /// List participations matching the filter
    async fn list(&self, filter: &ParticipationFilter) -> Result<Vec<Participation>, StoreError>;

    /// Move a participation to approved
    async fn approve(&self, participation_id: &str) -> Result<(), StoreError>;

    /// Move a participation to rejected
    async fn reject(&self, participation_id: &str) -> Result<(), StoreError>;

    /// Set the attended flag
    async fn set_attendance(&self, participation_id: &str, attended: bool)
        -> Result<(), StoreError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Bare(Vec<Participation>),
    Wrapped { participations: Vec<Participation> },
}

impl ListResponse {
    fn into_vec(self) -> Vec<Participation> {
        match self {
            ListResponse::Bare(list) => list,
            ListResponse::Wrapped { participations } => participations,
        }
    }
}

/// reqwest-backed ParticipationStore
pub struct HttpParticipationStore {
    http_client: Client,
    base_url: Url,
}

impl HttpParticipationStore {
    /// Create client for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let base_url =
            Url::parse(base_url).map_err(|e| StoreError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidBaseUrl(base_url.to_string()));
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// `{base}/participations[/segments...]`
    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("participations")
            .extend(segments);
        Ok(url)
    }

    async fn send_mutation(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<(), StoreError> {
        debug!(%method, %url, "Store mutation");

        let mut request = self.http_client.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

fn map_transport_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Network(format!("request timed out: {}", err))
    } else {
        StoreError::Network(err.to_string())
    }
}

#[async_trait]
impl ParticipationStore for HttpParticipationStore {
    async fn list(&self, filter: &ParticipationFilter) -> Result<Vec<Participation>, StoreError> {
        let url = self.url(&[])?;
        debug!(%url, ?filter, "Listing participations");

        let response = self
            .http_client
            .get(url)
            .query(&filter.query_pairs())
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(map_transport_error)?;
        let parsed: ListResponse =
            serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(parsed.into_vec())
    }

    async fn approve(&self, participation_id: &str) -> Result<(), StoreError> {
        let url = self.url(&[participation_id, "approve"])?;
        self.send_mutation(Method::POST, url, None).await
    }

    async fn reject(&self, participation_id: &str) -> Result<(), StoreError> {
        let url = self.url(&[participation_id, "reject"])?;
        self.send_mutation(Method::POST, url, None).await
    }

    async fn set_attendance(
        &self,
        participation_id: &str,
        attended: bool,
    ) -> Result<(), StoreError> {
        let url = self.url(&[participation_id, "attendance"])?;
        self.send_mutation(Method::PATCH, url, Some(json!({ "attended": attended })))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base: &str) -> HttpParticipationStore {
        HttpParticipationStore::new(base, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_urls_append_to_base_path() {
        let s = store("http://store.local/api/");
        assert_eq!(
            s.url(&[]).unwrap().as_str(),
            "http://store.local/api/participations"
        );
        assert_eq!(
            s.url(&["p-1", "approve"]).unwrap().as_str(),
            "http://store.local/api/participations/p-1/approve"
        );
    }

    #[test]
    fn test_ids_are_percent_encoded() {
        let s = store("http://store.local/api");
        assert_eq!(
            s.url(&["a/b c", "reject"]).unwrap().as_str(),
            "http://store.local/api/participations/a%2Fb%20c/reject"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(matches!(
            HttpParticipationStore::new("not a url", Duration::from_secs(1)),
            Err(StoreError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            HttpParticipationStore::new("mailto:someone@example.edu", Duration::from_secs(1)),
            Err(StoreError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_list_response_accepts_bare_and_wrapped_arrays() {
        let bare: ListResponse = serde_json::from_str("[]").unwrap();
        assert!(bare.into_vec().is_empty());
        let wrapped: ListResponse = serde_json::from_str(r#"{"participations": []}"#).unwrap();
        assert!(wrapped.into_vec().is_empty());
    }
}
