//! Speaker output and the audio clock derived from it
//!
//! Time is the number of frames the device has pulled, divided by the
//! sample rate. Scheduled sounds cross to the audio callback over a channel
//! and start on the exact frame that matches their scheduled time.

use anyhow::{Result, anyhow};
use backbeat_core::engine::AudioClock;
use backbeat_core::{ClockError, ScheduledSound, SoundKind};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::drum_synth::SoundVoice;

const MASTER_GAIN: f32 = 0.8;

/// A sound waiting for its start frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingSound {
    pub start_frame: u64,
    pub kind: SoundKind,
}

/// Mixes voices into output buffers, frame-accurately
pub struct Renderer {
    sample_rate: f32,
    incoming: Receiver<PendingSound>,
    pending: Vec<PendingSound>,
    active: Vec<SoundVoice>,
    frame: u64,
    frames_rendered: Arc<AtomicU64>,
}

impl Renderer {
    pub fn new(
        sample_rate: f32,
        incoming: Receiver<PendingSound>,
        frames_rendered: Arc<AtomicU64>,
    ) -> Self {
        Self {
            sample_rate,
            incoming,
            pending: Vec::new(),
            active: Vec::new(),
            frame: 0,
            frames_rendered,
        }
    }

    /// Fill an interleaved buffer, duplicating the mono mix to every channel
    pub fn fill<T>(&mut self, data: &mut [T], channels: usize)
    where
        T: Sample + cpal::FromSample<f32>,
    {
        self.pending.extend(self.incoming.try_iter());

        for frame in data.chunks_mut(channels.max(1)) {
            let value: T = cpal::Sample::from_sample(self.next_frame());
            for sample in frame.iter_mut() {
                *sample = value;
            }
        }

        self.frames_rendered.store(self.frame, Ordering::Release);
    }

    fn next_frame(&mut self) -> f32 {
        let now = self.frame;
        let sample_rate = self.sample_rate;
        let active = &mut self.active;
        self.pending.retain(|sound| {
            if sound.start_frame <= now {
                active.push(SoundVoice::new(sound.kind, sample_rate));
                false
            } else {
                true
            }
        });

        let mut mixed = 0.0;
        for voice in self.active.iter_mut() {
            mixed += voice.next_sample();
        }
        self.active.retain(|voice| !voice.is_finished());

        self.frame += 1;
        (mixed * MASTER_GAIN).clamp(-1.0, 1.0)
    }

    pub fn active_voices(&self) -> usize {
        self.active.len()
    }
}

/// Audio clock backed by the default cpal output device
pub struct OutputClock {
    stream: Stream,
    sample_rate: f64,
    frames_rendered: Arc<AtomicU64>,
    sounds: Sender<PendingSound>,
}

impl OutputClock {
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No output device available"))?;
        let config = device.default_output_config()?;

        let sample_format = config.sample_format();
        let config: StreamConfig = config.into();
        let sample_rate = config.sample_rate.0 as f64;

        let (sounds, incoming) = unbounded();
        let frames_rendered = Arc::new(AtomicU64::new(0));
        let renderer = Renderer::new(sample_rate as f32, incoming, frames_rendered.clone());

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, renderer)?,
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, renderer)?,
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, renderer)?,
            _ => return Err(anyhow!("Unsupported sample format: {:?}", sample_format)),
        };

        log::info!(
            "Opened output device at {} Hz, {} channel(s)",
            sample_rate,
            config.channels
        );

        Ok(OutputClock {
            stream,
            sample_rate,
            frames_rendered,
            sounds,
        })
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &StreamConfig,
        mut renderer: Renderer,
    ) -> Result<Stream>
    where
        T: Sample + SizedSample + Send + 'static + cpal::FromSample<f32>,
    {
        let channels = config.channels as usize;
        let err_fn = |err| log::error!("an error occurred on the output audio stream: {:?}", err);

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    renderer.fill(data, channels);
                },
                err_fn,
                None,
            )
            .map_err(|e| anyhow!("Failed to build output stream: {}", e))?;

        Ok(stream)
    }
}

/// Convert an absolute clock time to the frame that plays it
pub fn time_to_frame(time: f64, sample_rate: f64) -> u64 {
    (time.max(0.0) * sample_rate).round() as u64
}

impl AudioClock for OutputClock {
    fn current_time(&self) -> f64 {
        self.frames_rendered.load(Ordering::Acquire) as f64 / self.sample_rate
    }

    fn resume(&mut self) -> std::result::Result<(), ClockError> {
        self.stream
            .play()
            .map_err(|e| ClockError::new(format!("Failed to play stream: {}", e)))
    }

    fn schedule(&mut self, sound: &ScheduledSound) {
        let pending = PendingSound {
            start_frame: time_to_frame(sound.time, self.sample_rate),
            kind: sound.kind,
        };
        if self.sounds.send(pending).is_err() {
            log::warn!("Audio callback is gone; dropped {} at {:.3}s", sound.kind.name(), sound.time);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> (Renderer, Sender<PendingSound>, Arc<AtomicU64>) {
        let (tx, rx) = unbounded();
        let frames = Arc::new(AtomicU64::new(0));
        (Renderer::new(1000.0, rx, frames.clone()), tx, frames)
    }

    #[test]
    fn test_silence_without_sounds() {
        let (mut renderer, _tx, frames) = renderer();
        let mut buffer = vec![1.0f32; 64];
        renderer.fill(&mut buffer, 2);
        assert!(buffer.iter().all(|s| *s == 0.0));
        assert_eq!(frames.load(Ordering::Acquire), 32);
    }

    #[test]
    fn test_sound_starts_on_its_frame() {
        let (mut renderer, tx, _frames) = renderer();
        tx.send(PendingSound {
            start_frame: 10,
            kind: SoundKind::RhythmHit,
        })
        .unwrap();

        let mut buffer = vec![0.0f32; 20];
        renderer.fill(&mut buffer, 1);

        assert!(buffer[..10].iter().all(|s| *s == 0.0));
        assert!(buffer[10..].iter().any(|s| *s != 0.0));
        assert_eq!(renderer.active_voices(), 1);
    }

    #[test]
    fn test_late_sound_plays_immediately() {
        let (mut renderer, tx, _frames) = renderer();
        let mut buffer = vec![0.0f32; 50];
        renderer.fill(&mut buffer, 1);

        tx.send(PendingSound {
            start_frame: 3,
            kind: SoundKind::Click { downbeat: true },
        })
        .unwrap();
        renderer.fill(&mut buffer, 1);
        assert_eq!(renderer.active_voices(), 1);
    }

    #[test]
    fn test_finished_voices_are_released() {
        let (mut renderer, tx, _frames) = renderer();
        tx.send(PendingSound {
            start_frame: 0,
            kind: SoundKind::Click { downbeat: false },
        })
        .unwrap();

        // 60 ms click at 1 kHz
        let mut buffer = vec![0.0f32; 100];
        renderer.fill(&mut buffer, 1);
        assert_eq!(renderer.active_voices(), 0);
    }

    #[test]
    fn test_time_to_frame() {
        assert_eq!(time_to_frame(0.5, 48000.0), 24000);
        assert_eq!(time_to_frame(-1.0, 48000.0), 0);
    }
}
