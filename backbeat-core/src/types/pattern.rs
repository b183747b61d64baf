//! One-bar rhythm patterns
//!
//! A [`Pattern`] is a bar of sixteen sixteenth-note steps, each either a hit
//! or a rest. Patterns are looped during practice, so every run-length
//! property here is evaluated circularly: a run that crosses the bar line
//! counts as one run.

use std::fmt;
use std::str::FromStr;

/// Number of sixteenth-note steps in one bar
pub const STEPS_PER_PATTERN: usize = 16;

/// Longest allowed run of consecutive hits (circular)
pub const MAX_CONSECUTIVE_HITS: usize = 3;

/// Longest allowed run of consecutive rests (circular)
pub const MAX_CONSECUTIVE_RESTS: usize = 4;

/// A 16-step binary rhythm, immutable once built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pattern {
    steps: [bool; STEPS_PER_PATTERN],
}

impl Pattern {
    /// Build a pattern from explicit steps (`true` = hit)
    pub fn from_steps(steps: [bool; STEPS_PER_PATTERN]) -> Self {
        Self { steps }
    }

    /// Build a pattern from a 16-bit word, bit 15 being step 0
    pub fn from_bits(bits: u16) -> Self {
        let mut steps = [false; STEPS_PER_PATTERN];
        for (i, step) in steps.iter_mut().enumerate() {
            *step = bits & (1 << (STEPS_PER_PATTERN - 1 - i)) != 0;
        }
        Self { steps }
    }

    /// The fixed off-beat alternation `.x.x.x.x.x.x.x.x`
    pub fn alternating() -> Self {
        let mut steps = [false; STEPS_PER_PATTERN];
        for (i, step) in steps.iter_mut().enumerate() {
            *step = i % 2 == 1;
        }
        Self { steps }
    }

    pub fn steps(&self) -> &[bool; STEPS_PER_PATTERN] {
        &self.steps
    }

    /// Whether `step` (taken modulo 16) carries a hit
    pub fn is_hit(&self, step: usize) -> bool {
        self.steps[step % STEPS_PER_PATTERN]
    }

    /// Pack the steps into a 16-bit word, step 0 in the most significant bit
    pub fn bits(&self) -> u16 {
        self.steps
            .iter()
            .fold(0u16, |acc, &hit| (acc << 1) | u16::from(hit))
    }

    pub fn hit_count(&self) -> usize {
        self.steps.iter().filter(|&&hit| hit).count()
    }

    /// Steps as 0/1 bytes, the shape the browser renderer consumes
    pub fn to_bytes(&self) -> [u8; STEPS_PER_PATTERN] {
        let mut out = [0u8; STEPS_PER_PATTERN];
        for (dst, &hit) in out.iter_mut().zip(self.steps.iter()) {
            *dst = u8::from(hit);
        }
        out
    }

    /// Longest circular run of hits (`hit = true`) or rests (`hit = false`).
    ///
    /// Returns 16 when the whole bar is one value.
    pub fn max_run(&self, hit: bool) -> usize {
        if self.steps.iter().all(|&s| s == hit) {
            return STEPS_PER_PATTERN;
        }
        // Start scanning right after a step of the other value so no run is split
        let start = self
            .steps
            .iter()
            .position(|&s| s != hit)
            .unwrap_or(0);
        let mut longest = 0;
        let mut current = 0;
        for offset in 1..=STEPS_PER_PATTERN {
            if self.steps[(start + offset) % STEPS_PER_PATTERN] == hit {
                current += 1;
                longest = longest.max(current);
            } else {
                current = 0;
            }
        }
        longest
    }

    /// Run-length check used by the generator.
    ///
    /// The scan starts `max(MAX_CONSECUTIVE_HITS, MAX_CONSECUTIVE_RESTS)`
    /// steps before step 0 so that a run wrapping across the bar line is
    /// seen whole.
    pub fn is_valid(&self) -> bool {
        let lead_in = MAX_CONSECUTIVE_HITS.max(MAX_CONSECUTIVE_RESTS);
        let mut hits = 0;
        let mut rests = 0;

        for i in 0..lead_in + STEPS_PER_PATTERN {
            let idx = (i + STEPS_PER_PATTERN - lead_in) % STEPS_PER_PATTERN;
            if self.steps[idx] {
                hits += 1;
                rests = 0;
            } else {
                rests += 1;
                hits = 0;
            }

            if hits > MAX_CONSECUTIVE_HITS || rests > MAX_CONSECUTIVE_RESTS {
                return false;
            }
        }

        true
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &hit in &self.steps {
            f.write_str(if hit { "x" } else { "." })?;
        }
        Ok(())
    }
}

/// Error returned when parsing a pattern string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternParseError {
    #[error("invalid step character '{0}' (use x/1 for hits, ./0/- for rests)")]
    InvalidStep(char),
    #[error("pattern must have exactly 16 steps, got {0}")]
    WrongLength(usize),
}

impl FromStr for Pattern {
    type Err = PatternParseError;

    /// Parse `x`/`1` as hits and `.`/`0`/`-` as rests; whitespace is ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut steps = [false; STEPS_PER_PATTERN];
        let mut count = 0;

        for c in s.chars().filter(|c| !c.is_whitespace()) {
            let hit = match c {
                'x' | 'X' | '1' => true,
                '.' | '0' | '-' => false,
                other => return Err(PatternParseError::InvalidStep(other)),
            };
            if count < STEPS_PER_PATTERN {
                steps[count] = hit;
            }
            count += 1;
        }

        if count != STEPS_PER_PATTERN {
            return Err(PatternParseError::WrongLength(count));
        }
        Ok(Self { steps })
    }
}
