//! Remote volume lookups.
//!
//! [`BookLookup`] is the seam between the orchestrator and the network. The
//! production implementation is [`GoogleBooksClient`]; tests substitute
//! in-memory lookups.

mod extract;


use std::time::Duration;

use crate::config::ApiConfig;
use crate::error::{FetchError, Result};
use crate::types::{QueryUnit, Record};

use extract::VolumeList;

/// Result of one lookup
///
/// Lookups never fail outright: a failure is carried here and the batch is
/// treated as having zero records.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The request succeeded and the body parsed
    Success(Vec<Record>),
    /// The request or the body failed
    Failed(FetchError),
}

impl FetchOutcome {
    /// Records produced, empty on failure
    pub fn into_records(self) -> Vec<Record> {
        match self {
            FetchOutcome::Success(records) => records,
            FetchOutcome::Failed(_) => Vec::new(),
        }
    }

    /// Returns true if the lookup succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }
}

/// Abstraction over the remote lookup API, enabling testability.
#[async_trait::async_trait]
pub trait BookLookup: Send + Sync {
    /// Perform one request for `query`
    async fn fetch(&self, query: &QueryUnit) -> FetchOutcome;
}

/// [`BookLookup`] backed by the Google Books volume search API
pub struct GoogleBooksClient {
    http: reqwest::Client,
    api_key: String,
    timeout: Duration,
}

impl GoogleBooksClient {
    /// Build a client from the API settings
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("isbn-enrich/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_key: api.api_key.clone(),
            timeout: api.request_timeout,
        })
    }

    async fn fetch_volumes(
        &self,
        query: &QueryUnit,
    ) -> std::result::Result<Vec<Record>, FetchError> {
        let mut request = self.http.get(query.url.clone());
        if !self.api_key.is_empty() {
            request = request.query(&[("key", self.api_key.as_str())]);
        }

        // without_url() keeps the key out of error messages
        let response = request.send().await.map_err(|e| FetchError::Transport {
            query: query.as_str().to_string(),
            detail: e.without_url().to_string(),
        })?;

        let status = response.status();
        tracing::debug!(batch = query.index, status = status.as_u16(), query = %query.as_str(), "Got response");
        if !status.is_success() {
            return Err(FetchError::RemoteApi {
                query: query.as_str().to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| FetchError::Transport {
            query: query.as_str().to_string(),
            detail: e.without_url().to_string(),
        })?;

        let volumes: VolumeList = serde_json::from_slice(&body).map_err(|e| FetchError::Parse {
            query: query.as_str().to_string(),
            detail: e.to_string(),
        })?;

        Ok(volumes.into_records())
    }
}

#[async_trait::async_trait]
impl BookLookup for GoogleBooksClient {
    async fn fetch(&self, query: &QueryUnit) -> FetchOutcome {
        match tokio::time::timeout(self.timeout, self.fetch_volumes(query)).await {
            Ok(Ok(records)) => FetchOutcome::Success(records),
            Ok(Err(e)) => FetchOutcome::Failed(e),
            Err(_) => FetchOutcome::Failed(FetchError::Timeout {
                query: query.as_str().to_string(),
                after: self.timeout,
            }),
        }
    }
}
