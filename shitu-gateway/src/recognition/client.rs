//! AnimeTrace search API client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shitu_core::ModelSelector;
use tracing::info;

/// What is submitted for recognition.
#[derive(Debug, Clone, Copy)]
pub enum SearchInput<'a> {
    /// Remote locator the service fetches itself
    Url(&'a str),
    /// Inline base64-encoded image bytes
    Base64(&'a str),
}

impl SearchInput<'_> {
    fn kind(&self) -> &'static str {
        match self {
            SearchInput::Url(_) => "url",
            SearchInput::Base64(_) => "base64",
        }
    }
}

/// Response body of the search endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<SearchEntry>,
}

/// One detected subject in the submitted image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchEntry {
    /// Ranked candidates; absent when the service detected nothing usable
    #[serde(default)]
    pub character: Option<Vec<CharacterCandidate>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterCandidate {
    #[serde(default)]
    pub character: String,
    #[serde(default)]
    pub work: String,
}

/// Recognition service errors
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("recognition service returned HTTP {0}")]
    Status(u16),
    #[error("recognition request timed out")]
    Timeout,
    #[error("recognition request failed: {0}")]
    Transport(String),
    #[error("invalid recognition response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// Recognition service seam, implemented by [`AnimeTraceClient`].
#[async_trait::async_trait]
pub trait RecognitionBackend: Send + Sync {
    async fn search(
        &self,
        input: SearchInput<'_>,
        model: ModelSelector,
    ) -> Result<SearchResponse, BackendError>;
}

/// HTTP client for the AnimeTrace search endpoint.
#[derive(Debug, Clone)]
pub struct AnimeTraceClient {
    http_client: reqwest::Client,
    api_url: String,
}

impl AnimeTraceClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            api_url: api_url.into(),
        })
    }
}

#[async_trait::async_trait]
impl RecognitionBackend for AnimeTraceClient {
    async fn search(
        &self,
        input: SearchInput<'_>,
        model: ModelSelector,
    ) -> Result<SearchResponse, BackendError> {
        let (field, value) = match input {
            SearchInput::Url(url) => ("url", url),
            SearchInput::Base64(data) => ("base64", data),
        };
        let form = [
            (field, value),
            ("model", model.as_str()),
            ("is_multi", "1"),
            ("ai_detect", "0"),
        ];

        info!(
            "Calling recognition API - model: {} ({} submission)",
            model.display_name(),
            input.kind()
        );

        let response = self
            .http_client
            .post(&self.api_url)
            .form(&form)
            .send()
            .await
            .map_err(BackendError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(BackendError::Status(response.status().as_u16()));
        }

        let body = response.text().await.map_err(BackendError::from_reqwest)?;
        let payload: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        info!("Recognition API returned {} result(s)", payload.data.len());
        Ok(payload)
    }
}
