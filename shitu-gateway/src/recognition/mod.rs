//! Two-tier image recognition.
//!
//! Tier 1 hands the service the image URL. If that is rejected (422/5xx),
//! fails in transport, or comes back with no results, tier 2 downloads the
//! image, shrinks and re-encodes it, and uploads it inline. Only tier 2
//! failures surface to the caller.

pub mod client;
pub mod encode;
pub mod fetch;

use std::sync::Arc;

use shitu_core::ModelSelector;
use shitu_core::config::RecognitionSettings;
use tracing::{error, info, warn};

use crate::locator::ImageReference;

pub use client::{AnimeTraceClient, BackendError, RecognitionBackend, SearchInput, SearchResponse};
pub use encode::{EncodeError, EncodeOptions};
pub use fetch::{FetchError, HttpImageFetcher, ImageFetcher};

/// One ranked candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterMatch {
    pub character: String,
    pub work: String,
}

/// Candidates for the first detected subject, in service order. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognitionResult {
    pub matches: Vec<CharacterMatch>,
}

/// Why a recognition attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Recognition service answered with an error after both tiers
    ServiceRejected,
    /// The image could not be downloaded
    FetchFailed,
    /// The downloaded bytes are not a supported image
    DecodeFailed,
    /// A network call exceeded its bound
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Success(RecognitionResult),
    /// The service returned no detected subject, or no candidate list for it
    EmptyMatch,
    Failure { kind: ErrorKind, detail: String },
}

impl PipelineOutcome {
    fn failure(kind: ErrorKind, detail: impl Into<String>) -> Self {
        PipelineOutcome::Failure {
            kind,
            detail: detail.into(),
        }
    }

    fn from_response(response: SearchResponse) -> Self {
        let Some(first) = response.data.into_iter().next() else {
            return PipelineOutcome::EmptyMatch;
        };
        let Some(candidates) = first.character else {
            return PipelineOutcome::EmptyMatch;
        };
        PipelineOutcome::Success(RecognitionResult {
            matches: candidates
                .into_iter()
                .map(|c| CharacterMatch {
                    character: c.character,
                    work: c.work,
                })
                .collect(),
        })
    }
}

/// Tier-1 statuses that mean "try again with the bytes" rather than "give up".
fn is_fallback_status(status: u16) -> bool {
    status == 422 || (500..600).contains(&status)
}

/// Stateless recognition pipeline. Each call is independent.
#[derive(Clone)]
pub struct Recognizer {
    backend: Arc<dyn RecognitionBackend>,
    fetcher: Arc<dyn ImageFetcher>,
    encode: EncodeOptions,
}

impl Recognizer {
    pub fn new(
        backend: Arc<dyn RecognitionBackend>,
        fetcher: Arc<dyn ImageFetcher>,
        encode: EncodeOptions,
    ) -> Self {
        Self {
            backend,
            fetcher,
            encode,
        }
    }

    /// HTTP-backed pipeline for the configured AnimeTrace endpoint.
    pub fn from_settings(settings: &RecognitionSettings) -> Result<Self, BackendError> {
        let timeout = settings.timeout();
        let backend = AnimeTraceClient::new(&settings.api_url, timeout)?;
        let fetcher = HttpImageFetcher::new(timeout)
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self::new(
            Arc::new(backend),
            Arc::new(fetcher),
            EncodeOptions {
                max_dimension: settings.max_dimension,
                jpeg_quality: settings.jpeg_quality,
            },
        ))
    }

    pub async fn recognize(
        &self,
        reference: &ImageReference,
        model: ModelSelector,
    ) -> PipelineOutcome {
        match self
            .backend
            .search(SearchInput::Url(reference.url()), model)
            .await
        {
            Ok(response) if !response.data.is_empty() => {
                return PipelineOutcome::from_response(response);
            }
            Ok(_) => info!("URL lookup returned no results, retrying with uploaded image"),
            Err(BackendError::Status(status)) if is_fallback_status(status) => {
                warn!("URL lookup rejected (HTTP {}), retrying with uploaded image", status);
            }
            Err(BackendError::Status(status)) => {
                error!("URL lookup failed with HTTP {}", status);
                return PipelineOutcome::failure(
                    ErrorKind::ServiceRejected,
                    format!("HTTP {status}"),
                );
            }
            Err(e) => warn!("URL lookup failed ({}), retrying with uploaded image", e),
        }

        self.recognize_inline(reference, model).await
    }

    async fn recognize_inline(
        &self,
        reference: &ImageReference,
        model: ModelSelector,
    ) -> PipelineOutcome {
        let url = reference.url();
        info!("Downloading image: {}", url.chars().take(100).collect::<String>());

        let bytes = match self.fetcher.fetch(url).await {
            Ok(bytes) => bytes,
            Err(FetchError::Timeout) => {
                error!("Image download timed out");
                return PipelineOutcome::failure(ErrorKind::Timeout, FetchError::Timeout.to_string());
            }
            Err(e) => {
                error!("Image download failed: {}", e);
                return PipelineOutcome::failure(ErrorKind::FetchFailed, e.to_string());
            }
        };

        let options = self.encode;
        let encoded =
            tokio::task::spawn_blocking(move || encode::prepare_upload(&bytes, options)).await;
        let payload = match encoded {
            Ok(Ok(payload)) => payload,
            Ok(Err(e)) => {
                error!("Image preparation failed: {}", e);
                return PipelineOutcome::failure(ErrorKind::DecodeFailed, e.to_string());
            }
            Err(e) => {
                error!("Image preparation task failed: {}", e);
                return PipelineOutcome::failure(ErrorKind::DecodeFailed, e.to_string());
            }
        };
        info!("Image prepared for upload ({} base64 chars)", payload.len());

        match self.backend.search(SearchInput::Base64(&payload), model).await {
            Ok(response) => PipelineOutcome::from_response(response),
            Err(BackendError::Timeout) => {
                error!("Inline recognition timed out");
                PipelineOutcome::failure(ErrorKind::Timeout, BackendError::Timeout.to_string())
            }
            Err(e) => {
                error!("Inline recognition failed: {}", e);
                PipelineOutcome::failure(ErrorKind::ServiceRejected, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex;

    use client::{CharacterCandidate, SearchEntry};
    use image::{DynamicImage, ImageFormat, RgbImage};

    use crate::locator::ImageOrigin;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Url(String),
        Base64,
    }

    /// Scripted backend: answers calls in order and records what it saw.
    struct ScriptedBackend {
        answers: Mutex<Vec<Result<SearchResponse, BackendError>>>,
        calls: Mutex<Vec<Call>>,
    }

    impl ScriptedBackend {
        fn new(answers: Vec<Result<SearchResponse, BackendError>>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl RecognitionBackend for ScriptedBackend {
        async fn search(
            &self,
            input: SearchInput<'_>,
            _model: ModelSelector,
        ) -> Result<SearchResponse, BackendError> {
            self.calls.lock().unwrap().push(match input {
                SearchInput::Url(url) => Call::Url(url.to_string()),
                SearchInput::Base64(_) => Call::Base64,
            });
            self.answers.lock().unwrap().remove(0)
        }
    }

    struct StaticFetcher(Result<Vec<u8>, u16>);

    #[async_trait::async_trait]
    impl ImageFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            match &self.0 {
                Ok(bytes) => Ok(bytes.clone()),
                Err(0) => Err(FetchError::Timeout),
                Err(status) => Err(FetchError::Status(*status)),
            }
        }
    }

    fn png() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, image::Rgb([1, 2, 3])));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn hit(names: &[&str]) -> SearchResponse {
        SearchResponse {
            data: vec![SearchEntry {
                character: Some(
                    names
                        .iter()
                        .map(|name| CharacterCandidate {
                            character: name.to_string(),
                            work: "Work".to_string(),
                        })
                        .collect(),
                ),
            }],
        }
    }

    fn reference() -> ImageReference {
        ImageReference::new("https://cdn.example/a.png", ImageOrigin::Attachment)
    }

    fn recognizer(backend: Arc<ScriptedBackend>, fetched: Result<Vec<u8>, u16>) -> Recognizer {
        Recognizer::new(backend, Arc::new(StaticFetcher(fetched)), EncodeOptions::default())
    }

    fn names(outcome: &PipelineOutcome) -> Vec<String> {
        match outcome {
            PipelineOutcome::Success(result) => {
                result.matches.iter().map(|m| m.character.clone()).collect()
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn tier_one_success_skips_download() {
        let backend = ScriptedBackend::new(vec![Ok(hit(&["A", "B"]))]);
        let outcome = recognizer(backend.clone(), Err(404))
            .recognize(&reference(), ModelSelector::Anime)
            .await;

        assert_eq!(names(&outcome), vec!["A", "B"]);
        assert_eq!(
            backend.calls(),
            vec![Call::Url("https://cdn.example/a.png".to_string())]
        );
    }

    #[tokio::test]
    async fn soft_tier_one_failures_fall_back_to_upload() {
        let soft = [
            Err(BackendError::Status(422)),
            Err(BackendError::Status(500)),
            Err(BackendError::Status(503)),
            Err(BackendError::Timeout),
            Err(BackendError::Transport("connection refused".to_string())),
            Err(BackendError::InvalidResponse("eof".to_string())),
            Ok(SearchResponse::default()),
        ];
        for first in soft {
            let backend = ScriptedBackend::new(vec![first, Ok(hit(&["Fallback"]))]);
            let outcome = recognizer(backend.clone(), Ok(png()))
                .recognize(&reference(), ModelSelector::General)
                .await;

            assert_eq!(names(&outcome), vec!["Fallback"]);
            assert_eq!(backend.calls().len(), 2);
            assert_eq!(backend.calls()[1], Call::Base64);
        }
    }

    #[tokio::test]
    async fn hard_tier_one_status_does_not_fall_back() {
        let backend = ScriptedBackend::new(vec![Err(BackendError::Status(403))]);
        let outcome = recognizer(backend.clone(), Ok(png()))
            .recognize(&reference(), ModelSelector::Anime)
            .await;

        assert!(matches!(
            outcome,
            PipelineOutcome::Failure {
                kind: ErrorKind::ServiceRejected,
                ..
            }
        ));
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn tier_one_entry_without_candidates_is_not_retried() {
        let response = SearchResponse {
            data: vec![SearchEntry {
                character: Some(Vec::new()),
            }],
        };
        let backend = ScriptedBackend::new(vec![Ok(response)]);
        let outcome = recognizer(backend.clone(), Ok(png()))
            .recognize(&reference(), ModelSelector::Anime)
            .await;

        assert_eq!(outcome, PipelineOutcome::Success(RecognitionResult::default()));
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn tier_two_empty_data_is_empty_match() {
        let backend = ScriptedBackend::new(vec![
            Ok(SearchResponse::default()),
            Ok(SearchResponse::default()),
        ]);
        let outcome = recognizer(backend, Ok(png()))
            .recognize(&reference(), ModelSelector::Anime)
            .await;
        assert_eq!(outcome, PipelineOutcome::EmptyMatch);
    }

    #[tokio::test]
    async fn tier_two_missing_candidate_list_is_empty_match() {
        let backend = ScriptedBackend::new(vec![
            Err(BackendError::Status(422)),
            Ok(SearchResponse {
                data: vec![SearchEntry { character: None }],
            }),
        ]);
        let outcome = recognizer(backend, Ok(png()))
            .recognize(&reference(), ModelSelector::Anime)
            .await;
        assert_eq!(outcome, PipelineOutcome::EmptyMatch);
    }

    #[tokio::test]
    async fn tier_two_failures_are_classified() {
        let cases: Vec<(Result<Vec<u8>, u16>, Result<SearchResponse, BackendError>, ErrorKind)> = vec![
            (Err(404), Ok(hit(&["x"])), ErrorKind::FetchFailed),
            (Err(0), Ok(hit(&["x"])), ErrorKind::Timeout),
            (Ok(b"<html>nope</html>".to_vec()), Ok(hit(&["x"])), ErrorKind::DecodeFailed),
            (Ok(png()), Err(BackendError::Status(500)), ErrorKind::ServiceRejected),
            (Ok(png()), Err(BackendError::Timeout), ErrorKind::Timeout),
        ];

        for (fetched, second, expected) in cases {
            let backend = ScriptedBackend::new(vec![Err(BackendError::Status(422)), second]);
            let outcome = recognizer(backend, fetched)
                .recognize(&reference(), ModelSelector::GalGame)
                .await;
            match outcome {
                PipelineOutcome::Failure { kind, .. } => assert_eq!(kind, expected),
                other => panic!("expected {expected:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn fallback_statuses() {
        assert!(is_fallback_status(422));
        assert!(is_fallback_status(500));
        assert!(is_fallback_status(599));
        assert!(!is_fallback_status(400));
        assert!(!is_fallback_status(429));
    }
}
