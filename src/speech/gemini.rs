//! Gemini speech generation client

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::request::RequestParameters;
use crate::{Error, Result};

/// Default API endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default speech model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Remote speech generation service
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Issue one generation request and return the parsed response
    async fn generate(
        &self,
        api_key: &SecretString,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse>;
}

/// `generateContent` request body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateRequest {
    /// Build an audio-only request for the given parameters
    #[must_use]
    pub fn speech(params: &RequestParameters) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(params.prompt()),
                    inline_data: None,
                }],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec![Modality::Audio],
                speech_config: SpeechConfig {
                    speaking_rate: params.rate.get(),
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: params.voice.name().to_string(),
                        },
                    },
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    Text,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<Modality>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub speaking_rate: f32,
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

/// Content block shared by requests and responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

/// Base64 binary payload carried inside a response part
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: Option<String>,
    pub data: String,
}

/// `generateContent` response body
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl GenerateResponse {
    /// Wrap a single inline audio payload, mostly for test doubles
    #[must_use]
    pub fn with_audio(data: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    parts: vec![Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: Some("audio/L16;codec=pcm;rate=24000".to_string()),
                            data: data.into(),
                        }),
                    }],
                }),
                finish_reason: Some("STOP".to_string()),
            }],
        }
    }

    /// Finish reason of the first candidate (e.g. `STOP`, `SAFETY`)
    #[must_use]
    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates.first()?.finish_reason.as_deref()
    }

    /// Payload at `candidates[0].content.parts[0].inlineData.data`
    #[must_use]
    pub fn first_inline_audio(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .inline_data
            .as_ref()
            .map(|d| d.data.as_str())
    }
}

/// HTTP client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Create a client for `model` at `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Endpoint URL for the configured model
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl SpeechService for GeminiClient {
    async fn generate(
        &self,
        api_key: &SecretString,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse> {
        let url = self.endpoint();
        tracing::debug!(model = %self.model, "sending speech request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key.expose_secret())
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Service(format!("{status}: {body}")));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
