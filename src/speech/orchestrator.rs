//! Speech request orchestration
//!
//! Composes the prompt, calls the speech service once, and decodes the
//! returned PCM. At most one request is in flight per orchestrator; a second
//! submission while one is running is rejected with [`Error::Busy`].

use std::sync::Arc;

use tokio::sync::{Semaphore, watch};

use super::gemini::{GenerateRequest, SpeechService};
use super::pcm::{self, AudioBuffer};
use super::request::RequestParameters;
use crate::config::Credential;
use crate::{Error, Result};

/// Output sample rate of the speech service
pub const SERVICE_SAMPLE_RATE: u32 = 24000;

/// Output channel count of the speech service
pub const SERVICE_CHANNELS: u16 = 1;

/// Lifecycle of the most recent request
#[derive(Debug, Clone, Default)]
pub enum RequestState {
    #[default]
    Idle,
    InFlight,
    Succeeded(Arc<AudioBuffer>),
    Failed(String),
}

impl RequestState {
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight)
    }
}

/// Drives speech requests against a [`SpeechService`]
pub struct SpeechOrchestrator<S> {
    service: S,
    credential: Credential,
    slot: Semaphore,
    state: watch::Sender<RequestState>,
}

impl<S: SpeechService> SpeechOrchestrator<S> {
    /// Create an orchestrator in the `Idle` state
    pub fn new(service: S, credential: Credential) -> Self {
        let (state, _) = watch::channel(RequestState::Idle);
        Self {
            service,
            credential,
            slot: Semaphore::new(1),
            state,
        }
    }

    /// Current request state
    pub fn state(&self) -> RequestState {
        self.state.borrow().clone()
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.state.subscribe()
    }

    pub const fn service(&self) -> &S {
        &self.service
    }

    /// Generate and decode speech for `params`
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the text is blank or no credential is configured
    /// - `Busy` if another request is in flight
    /// - `EmptyResponse` if the service returned no audio
    /// - `Service` for any failure of the call itself or of its payload
    pub async fn generate_speech(&self, params: RequestParameters) -> Result<Arc<AudioBuffer>> {
        params.validate()?;
        let api_key = self.credential.resolve().ok_or_else(|| {
            Error::InvalidInput("no API key configured (set GEMINI_API_KEY)".to_string())
        })?;

        let Ok(_permit) = self.slot.try_acquire() else {
            tracing::debug!("rejecting request while another is in flight");
            return Err(Error::Busy);
        };

        let guard = InFlight::enter(&self.state);
        tracing::info!(
            emotion = %params.emotion,
            voice = %params.voice,
            rate = params.rate.get(),
            chars = params.text.len(),
            "generating speech"
        );

        let result = self.run(&api_key, &params).await;

        match &result {
            Ok(buffer) => {
                tracing::info!(
                    frames = buffer.frames(),
                    duration_ms = buffer.duration().as_millis(),
                    "speech ready"
                );
                guard.settle(RequestState::Succeeded(Arc::clone(buffer)));
            }
            Err(e) => {
                tracing::warn!(error = %e, "speech request failed");
                guard.settle(RequestState::Failed(e.to_string()));
            }
        }

        result
    }

    async fn run(
        &self,
        api_key: &secrecy::SecretString,
        params: &RequestParameters,
    ) -> Result<Arc<AudioBuffer>> {
        let request = GenerateRequest::speech(params);

        let response = self
            .service
            .generate(api_key, &request)
            .await
            .map_err(into_service_error)?;

        let Some(payload) = response.first_inline_audio() else {
            tracing::warn!(
                candidates = response.candidates.len(),
                finish_reason = response.finish_reason().unwrap_or("none"),
                "response carried no audio"
            );
            return Err(Error::EmptyResponse);
        };

        let buffer = pcm::decode(payload, SERVICE_SAMPLE_RATE, SERVICE_CHANNELS)
            .map_err(|e| Error::Service(format!("malformed audio payload: {e}")))?;

        Ok(Arc::new(buffer))
    }
}

/// Marks the state `InFlight` for its lifetime
///
/// If dropped before [`InFlight::settle`] (the caller dropped the future),
/// the state becomes `Failed` so it never claims a request that is gone.
struct InFlight<'a> {
    state: &'a watch::Sender<RequestState>,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn enter(state: &'a watch::Sender<RequestState>) -> Self {
        state.send_replace(RequestState::InFlight);
        Self {
            state,
            settled: false,
        }
    }

    fn settle(mut self, outcome: RequestState) {
        self.state.send_replace(outcome);
        self.settled = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("speech request dropped before completion");
            self.state
                .send_replace(RequestState::Failed(CANCELLED.to_string()));
        }
    }
}

/// Failure message published when a request future is dropped
pub const CANCELLED: &str = "request cancelled";

/// Collapse call failures into `Service`, keeping the underlying message
fn into_service_error(error: Error) -> Error {
    match error {
        Error::Service(_) | Error::EmptyResponse => error,
        Error::Http(e) => Error::Service(e.to_string()),
        other => Error::Service(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use secrecy::SecretString;

    use super::*;
    use crate::speech::gemini::GenerateResponse;
    use crate::speech::request::{Emotion, SpeakingRate, Voice};

    struct CountingService {
        calls: AtomicUsize,
        response: fn() -> Result<GenerateResponse>,
    }

    #[async_trait]
    impl SpeechService for CountingService {
        async fn generate(
            &self,
            _api_key: &SecretString,
            _request: &GenerateRequest,
        ) -> Result<GenerateResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.response)()
        }
    }

    fn orchestrator(response: fn() -> Result<GenerateResponse>) -> SpeechOrchestrator<CountingService> {
        SpeechOrchestrator::new(
            CountingService {
                calls: AtomicUsize::new(0),
                response,
            },
            Credential::fixed(SecretString::from("test-key")),
        )
    }

    fn params(text: &str) -> RequestParameters {
        RequestParameters::new(text, Emotion::Neutral, Voice::Puck, SpeakingRate::default())
    }

    #[tokio::test]
    async fn test_starts_idle() {
        let orch = orchestrator(|| Ok(GenerateResponse::default()));
        assert!(matches!(orch.state(), RequestState::Idle));
    }

    #[tokio::test]
    async fn test_missing_credential_is_invalid_input() {
        let orch = SpeechOrchestrator::new(
            CountingService {
                calls: AtomicUsize::new(0),
                response: || Ok(GenerateResponse::with_audio("AAA=")),
            },
            Credential::none(),
        );

        let err = orch.generate_speech(params("hello")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(orch.service().calls.load(Ordering::SeqCst), 0);
        assert!(matches!(orch.state(), RequestState::Idle));
    }

    #[tokio::test]
    async fn test_service_error_mapped() {
        let orch = orchestrator(|| Err(Error::Audio("boom".to_string())));
        let err = orch.generate_speech(params("hello")).await.unwrap_err();
        assert!(matches!(err, Error::Service(ref m) if m.contains("boom")));
        assert!(matches!(orch.state(), RequestState::Failed(_)));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_service_error() {
        let orch = orchestrator(|| Ok(GenerateResponse::with_audio("%%%")));
        let err = orch.generate_speech(params("hello")).await.unwrap_err();
        assert!(matches!(err, Error::Service(_)));
    }

    #[tokio::test]
    async fn test_success_then_resubmit() {
        let orch = orchestrator(|| Ok(GenerateResponse::with_audio("AAAAAA==")));

        let buffer = orch.generate_speech(params("one")).await.unwrap();
        assert_eq!(buffer.frames(), 2);
        assert_eq!(buffer.sample_rate(), SERVICE_SAMPLE_RATE);
        assert!(matches!(orch.state(), RequestState::Succeeded(_)));

        // Slot is released after completion
        orch.generate_speech(params("two")).await.unwrap();
        assert_eq!(orch.service().calls.load(Ordering::SeqCst), 2);
    }
}
