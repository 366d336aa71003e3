//! Audio playback to speakers
//!
//! The output device is opened lazily on a dedicated audio thread the first
//! time something is played, and kept for the rest of the process.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};
use tokio::sync::oneshot;

use super::pcm::AudioBuffer;
use crate::{Error, Result};

/// Grace period after the last sample before the stream is dropped
const TAIL_PADDING: Duration = Duration::from_millis(200);

struct PlayJob {
    buffer: Arc<AudioBuffer>,
    done: Option<oneshot::Sender<()>>,
}

/// Plays decoded buffers on the default output device
#[derive(Default)]
pub struct AudioPlayback {
    jobs: Mutex<Option<mpsc::Sender<PlayJob>>>,
}

impl AudioPlayback {
    /// Create a playback handle; no device is opened yet
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `buffer` for playback and return immediately
    ///
    /// Buffers play one after another on the audio thread, so a buffer queued
    /// while another is playing starts when that one finishes.
    ///
    /// # Errors
    ///
    /// Returns error if the output device cannot be opened
    pub fn play(&self, buffer: Arc<AudioBuffer>) -> Result<()> {
        self.submit(PlayJob { buffer, done: None })
    }

    /// Play `buffer` and wait until it has finished
    ///
    /// # Errors
    ///
    /// Returns error if the output device cannot be opened or playback fails
    pub async fn play_blocking(&self, buffer: Arc<AudioBuffer>) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.submit(PlayJob {
            buffer,
            done: Some(tx),
        })?;
        rx.await
            .map_err(|_| Error::Audio("playback thread stopped".to_string()))
    }

    fn submit(&self, job: PlayJob) -> Result<()> {
        if job.buffer.is_empty() {
            if let Some(done) = job.done {
                let _ = done.send(());
            }
            return Ok(());
        }

        let mut jobs = self
            .jobs
            .lock()
            .map_err(|_| Error::Audio("playback state poisoned".to_string()))?;

        if jobs.is_none() {
            *jobs = Some(spawn_output_thread()?);
        }

        let sender = jobs
            .as_ref()
            .ok_or_else(|| Error::Audio("output thread unavailable".to_string()))?;

        if let Err(mpsc::SendError(job)) = sender.send(job) {
            // Thread died; reopen once
            tracing::warn!("audio thread gone, reopening output device");
            let sender = spawn_output_thread()?;
            sender
                .send(job)
                .map_err(|_| Error::Audio("output thread unavailable".to_string()))?;
            *jobs = Some(sender);
        }

        Ok(())
    }
}

/// Spawn the audio thread and wait for it to open the device
fn spawn_output_thread() -> Result<mpsc::Sender<PlayJob>> {
    let (job_tx, job_rx) = mpsc::channel::<PlayJob>();
    let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);

    std::thread::Builder::new()
        .name("emote-audio".to_string())
        .spawn(move || {
            let output = match OutputContext::open() {
                Ok(output) => {
                    let _ = ready_tx.send(Ok(()));
                    output
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            for job in job_rx {
                if let Err(e) = output.play(&job.buffer) {
                    tracing::error!(error = %e, "audio playback failed");
                }
                if let Some(done) = job.done {
                    let _ = done.send(());
                }
            }
        })?;

    ready_rx
        .recv()
        .map_err(|_| Error::Audio("audio thread exited during startup".to_string()))??;

    Ok(job_tx)
}

/// Opened output device and its stream configuration
struct OutputContext {
    device: Device,
    config: StreamConfig,
}

impl OutputContext {
    fn open() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let rate = SampleRate(crate::speech::SERVICE_SAMPLE_RATE);

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| c.channels() == 1 && c.min_sample_rate() <= rate && c.max_sample_rate() >= rate)
            .or_else(|| {
                // Fallback: try stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2 && c.min_sample_rate() <= rate && c.max_sample_rate() >= rate
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config.with_sample_rate(rate).config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = rate.0,
            channels = config.channels,
            "audio output initialized"
        );

        Ok(Self { device, config })
    }

    /// Play one buffer to completion
    fn play(&self, buffer: &AudioBuffer) -> Result<()> {
        if buffer.sample_rate() != self.config.sample_rate.0 {
            tracing::warn!(
                buffer_rate = buffer.sample_rate(),
                device_rate = self.config.sample_rate.0,
                "sample rate mismatch, audio will play at the wrong speed"
            );
        }

        let channels: Vec<Vec<f32>> = (0..buffer.channels())
            .filter_map(|c| buffer.channel(c).map(<[f32]>::to_vec))
            .collect();
        let frames = buffer.frames();
        let out_channels = usize::from(self.config.channels);

        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));
        let position_cb = Arc::clone(&position);
        let finished_cb = Arc::clone(&finished);

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = position_cb.load(Ordering::Relaxed);
                    for frame in data.chunks_mut(out_channels) {
                        for (d, out) in frame.iter_mut().enumerate() {
                            *out = if pos < frames {
                                channels[d % channels.len()][pos]
                            } else {
                                0.0
                            };
                        }
                        if pos < frames {
                            pos += 1;
                        } else {
                            finished_cb.store(true, Ordering::Relaxed);
                        }
                    }
                    position_cb.store(pos, Ordering::Relaxed);
                },
                |err| {
                    tracing::error!(error = %err, "audio stream error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        // Streams may start paused; play() resumes them
        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let start = Instant::now();
        let timeout = buffer.duration() + Duration::from_millis(500);

        while !finished.load(Ordering::Relaxed) {
            if start.elapsed() > timeout {
                tracing::warn!("playback did not drain before timeout");
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        std::thread::sleep(TAIL_PADDING);

        drop(stream);
        tracing::debug!(frames, "playback complete");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_buffer_skips_device() {
        // Never touches the audio device, so safe on headless CI
        let playback = AudioPlayback::new();
        let buffer = Arc::new(AudioBuffer::silent(1, 0, 24000));

        playback.play(Arc::clone(&buffer)).unwrap();
        playback.play_blocking(buffer).await.unwrap();
        assert!(playback.jobs.lock().unwrap().is_none());
    }
}
