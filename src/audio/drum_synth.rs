//! Synthesized metronome sounds
//!
//! Sample loading is not part of the native host, so the click and the
//! rhythm hit are synthesized: a short rim-style click for quarter notes
//! (pitched up on the downbeat) and a snare-style hit for pattern steps.

use backbeat_core::SoundKind;
use std::f32::consts::PI;

/// Simple xorshift PRNG for noise generation
struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    fn new(seed: u32) -> Self {
        Self { state: seed.max(1) } // Ensure non-zero
    }

    fn next_u32(&mut self) -> u32 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        self.state
    }

    /// Random f32 in [-1.0, 1.0)
    fn noise(&mut self) -> f32 {
        (self.next_u32() as f32) / (u32::MAX as f32) * 2.0 - 1.0
    }
}

/// A one-shot voice for a single scheduled sound
pub struct SoundVoice {
    kind: SoundKind,
    sample_rate: f32,
    sample_count: usize,
    max_samples: usize,
    rng: SimpleRng,
}

impl SoundVoice {
    pub fn new(kind: SoundKind, sample_rate: f32) -> Self {
        let max_duration_ms = match kind {
            SoundKind::Click { .. } => 60.0,
            SoundKind::RhythmHit => 180.0,
        };
        let max_samples = (max_duration_ms * sample_rate / 1000.0) as usize;

        Self {
            kind,
            sample_rate,
            sample_count: 0,
            max_samples,
            rng: SimpleRng::new(31337),
        }
    }

    #[inline]
    fn time(&self) -> f32 {
        self.sample_count as f32 / self.sample_rate
    }

    pub fn is_finished(&self) -> bool {
        self.sample_count >= self.max_samples
    }

    pub fn next_sample(&mut self) -> f32 {
        if self.is_finished() {
            return 0.0;
        }

        let sample = match self.kind {
            SoundKind::Click { downbeat } => self.click(downbeat),
            SoundKind::RhythmHit => self.hit(),
        };

        self.sample_count += 1;
        sample
    }

    /// Rim-style click, a fifth higher and louder on the downbeat
    fn click(&self, downbeat: bool) -> f32 {
        let t = self.time();
        let (freq, level) = if downbeat { (2250.0, 0.6) } else { (1500.0, 0.45) };

        let amp = (-t * 80.0).exp();
        let tone = (2.0 * PI * freq * t).sin() + (2.0 * PI * freq * 1.333 * t).sin() * 0.5;

        tone * amp * level
    }

    /// Snare-style hit: tonal body plus noise
    fn hit(&mut self) -> f32 {
        let t = self.time();

        let body = (2.0 * PI * 220.0 * t).sin();
        let body_env = (-t * 30.0).exp();

        let noise = self.rng.noise();
        let noise_env = (-t * 20.0).exp();

        body * body_env * 0.35 + noise * noise_env * 0.45
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(kind: SoundKind) -> Vec<f32> {
        let mut voice = SoundVoice::new(kind, 48000.0);
        let mut out = Vec::new();
        while !voice.is_finished() {
            out.push(voice.next_sample());
        }
        out
    }

    #[test]
    fn test_voices_finish() {
        assert_eq!(render(SoundKind::Click { downbeat: false }).len(), 2880);
        assert_eq!(render(SoundKind::RhythmHit).len(), 8640);

        let mut voice = SoundVoice::new(SoundKind::RhythmHit, 48000.0);
        for _ in 0..10_000 {
            voice.next_sample();
        }
        assert_eq!(voice.next_sample(), 0.0);
    }

    #[test]
    fn test_downbeat_is_louder() {
        let peak = |s: &[f32]| s.iter().map(|v| v.abs()).fold(0.0f32, f32::max);
        let accent = render(SoundKind::Click { downbeat: true });
        let regular = render(SoundKind::Click { downbeat: false });
        assert!(peak(&accent) > peak(&regular));
    }

    #[test]
    fn test_output_stays_in_range() {
        for kind in [
            SoundKind::Click { downbeat: true },
            SoundKind::Click { downbeat: false },
            SoundKind::RhythmHit,
        ] {
            assert!(render(kind).iter().all(|s| s.abs() <= 1.0));
        }
    }
}
