//! emote - emotion-directed speech synthesis
//!
//! This library provides:
//! - Request parameters (text, emotion, voice, speaking rate)
//! - A client for the Gemini speech generation API
//! - Decoding of the returned raw PCM into playable buffers
//! - Playback on the default output device
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │        CLI  (speak │ interactive)            │
//! └──────────────────────┬───────────────────────┘
//!                        │ RequestParameters
//! ┌──────────────────────▼───────────────────────┐
//! │            SpeechOrchestrator                │
//! │   prompt │ single in-flight slot │ state     │
//! └──────────┬───────────────────────┬───────────┘
//!            │ GenerateRequest       │ base64 PCM
//! ┌──────────▼──────────┐  ┌─────────▼───────────┐
//! │  SpeechService      │  │  pcm::decode        │
//! │  (GeminiClient)     │  │  → AudioBuffer      │
//! └─────────────────────┘  └─────────┬───────────┘
//!                                    │
//!                          ┌─────────▼───────────┐
//!                          │  AudioPlayback      │
//!                          └─────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod speech;

pub use config::{Config, Credential};
pub use error::{Error, Result};
pub use speech::{
    AudioBuffer, AudioPlayback, Emotion, GeminiClient, RequestParameters, RequestState,
    SpeakingRate, SpeechOrchestrator, SpeechService, Voice,
};
