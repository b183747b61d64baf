//! Trainer configuration
//!
//! Plain data, safe for WebAssembly. With the `serde` feature enabled the
//! config round-trips through JSON and missing fields take their defaults.

use crate::error::{Result, TrainerError};

/// Default tempo in beats per minute
pub const DEFAULT_TEMPO_BPM: f64 = 120.0;

/// How far ahead of the audio clock events are committed, in seconds
pub const DEFAULT_LOOKAHEAD_SECS: f64 = 0.1;

/// Lead-in length in sixteenth notes (one bar)
pub const DEFAULT_COUNT_IN_STEPS: u64 = 16;

/// Fastest accepted tempo; one lookahead pass stays a handful of steps
pub const MAX_TEMPO_BPM: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrainerConfig {
    /// Initial tempo (quarter notes per minute)
    pub tempo_bpm: f64,
    pub lookahead_secs: f64,
    pub count_in_steps: u64,
    /// Fixed pattern seed in [0, 1); `None` draws a random one
    pub seed: Option<f64>,
}

impl TrainerConfig {
    pub fn with_tempo(mut self, bpm: f64) -> Self {
        self.tempo_bpm = bpm;
        self
    }

    pub fn with_seed(mut self, seed: f64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_lookahead(mut self, secs: f64) -> Self {
        self.lookahead_secs = secs;
        self
    }

    pub fn with_count_in(mut self, steps: u64) -> Self {
        self.count_in_steps = steps;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_tempo(self.tempo_bpm)?;
        if !(self.lookahead_secs.is_finite() && self.lookahead_secs > 0.0) {
            return Err(TrainerError::InvalidLookahead(self.lookahead_secs));
        }
        if let Some(seed) = self.seed {
            if !seed.is_finite() {
                return Err(TrainerError::InvalidSeed(seed));
            }
        }
        Ok(())
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            tempo_bpm: DEFAULT_TEMPO_BPM,
            lookahead_secs: DEFAULT_LOOKAHEAD_SECS,
            count_in_steps: DEFAULT_COUNT_IN_STEPS,
            seed: None,
        }
    }
}

/// Tempo must lie in (0, MAX_TEMPO_BPM]
pub fn validate_tempo(bpm: f64) -> Result<()> {
    if bpm.is_finite() && bpm > 0.0 && bpm <= MAX_TEMPO_BPM {
        Ok(())
    } else {
        Err(TrainerError::InvalidTempo(bpm))
    }
}
