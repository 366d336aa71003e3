//! Raw PCM decoding
//!
//! The speech service returns headerless little-endian 16-bit signed PCM,
//! interleaved by channel and base64-encoded. This module turns that payload
//! into per-channel normalized `f32` samples.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose};

use crate::{Error, Result};

/// Bytes per 16-bit sample
const BYTES_PER_SAMPLE: usize = 2;

/// Divisor mapping `i16` onto [-1.0, 1.0)
const I16_SCALE: f32 = 32768.0;

/// Decoded audio, one sample vector per channel
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Allocate a zero-filled buffer of `frames` frames per channel
    #[must_use]
    pub fn silent(channels: u16, frames: usize, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: (0..channels).map(|_| vec![0.0; frames]).collect(),
        }
    }

    /// Build a buffer from existing per-channel samples
    ///
    /// # Errors
    ///
    /// Returns error if there are no channels or the channels differ in length
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        let Some(first) = channels.first() else {
            return Err(Error::InvalidInput("audio buffer needs at least one channel".to_string()));
        };
        if sample_rate == 0 {
            return Err(Error::InvalidInput("sample rate must be positive".to_string()));
        }
        let frames = first.len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(Error::InvalidInput("channel lengths differ".to_string()));
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Sample rate in Hz
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels
    #[must_use]
    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel)
    #[must_use]
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Whether the buffer holds no frames
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Samples of a single channel
    #[must_use]
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Playback length
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }

    /// Samples re-interleaved frame by frame
    #[must_use]
    pub fn interleaved(&self) -> Vec<f32> {
        let channels = self.channels();
        let mut out = Vec::with_capacity(self.frames() * channels);
        for i in 0..self.frames() {
            out.extend(self.channels.iter().map(|c| c[i]));
        }
        out
    }

    /// Encode as a 16-bit PCM WAV file
    ///
    /// # Errors
    ///
    /// Returns error if the WAV writer fails
    pub fn to_wav(&self) -> Result<Vec<u8>> {
        let channels = u16::try_from(self.channels())
            .map_err(|_| Error::Audio("too many channels for WAV".to_string()))?;
        let spec = hound::WavSpec {
            channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer =
                hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

            for sample in self.interleaved() {
                // Inverse of the decode scale so decoded payloads re-encode exactly
                #[allow(clippy::cast_possible_truncation)]
                let sample_i16 = (sample * I16_SCALE).clamp(-32768.0, 32767.0) as i16;
                writer
                    .write_sample(sample_i16)
                    .map_err(|e| Error::Audio(e.to_string()))?;
            }

            writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
        }

        Ok(cursor.into_inner())
    }
}

/// Decode a base64 PCM payload
///
/// # Errors
///
/// Returns error if the payload is not valid base64 or the format is invalid
pub fn decode(payload: &str, sample_rate: u32, channels: u16) -> Result<AudioBuffer> {
    let bytes = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::Audio(format!("invalid base64 audio payload: {e}")))?;
    decode_bytes(&bytes, sample_rate, channels)
}

/// Decode raw little-endian 16-bit PCM bytes
///
/// A trailing partial frame is dropped.
///
/// # Errors
///
/// Returns error if `sample_rate` or `channels` is zero
pub fn decode_bytes(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<AudioBuffer> {
    if sample_rate == 0 {
        return Err(Error::InvalidInput("sample rate must be positive".to_string()));
    }
    if channels == 0 {
        return Err(Error::InvalidInput("channel count must be positive".to_string()));
    }

    let num_channels = usize::from(channels);
    let frame_bytes = BYTES_PER_SAMPLE * num_channels;
    let frames = bytes.len() / frame_bytes;

    let remainder = bytes.len() % frame_bytes;
    if remainder != 0 {
        tracing::debug!(
            len = bytes.len(),
            dropped = remainder,
            channels,
            "truncating partial PCM frame"
        );
    }

    let mut buffer = AudioBuffer::silent(channels, frames, sample_rate);
    for (i, frame) in bytes.chunks_exact(frame_bytes).enumerate() {
        for (c, sample) in frame.chunks_exact(BYTES_PER_SAMPLE).enumerate() {
            let value = i16::from_le_bytes([sample[0], sample[1]]);
            buffer.channels[c][i] = f32::from(value) / I16_SCALE;
        }
    }

    Ok(buffer)
}
