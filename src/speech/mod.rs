//! Speech generation pipeline
//!
//! Request parameters are turned into a prompt, sent to the speech service,
//! and the returned PCM is decoded for playback.

pub mod gemini;
pub mod orchestrator;
pub mod pcm;
mod playback;
mod request;

pub use gemini::{GeminiClient, GenerateRequest, GenerateResponse, SpeechService};
pub use orchestrator::{
    CANCELLED, RequestState, SERVICE_CHANNELS, SERVICE_SAMPLE_RATE, SpeechOrchestrator,
};
pub use pcm::AudioBuffer;
pub use playback::AudioPlayback;
pub use request::{Emotion, RequestParameters, SpeakingRate, Voice};
