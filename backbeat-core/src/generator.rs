//! Seeded pattern generator
//!
//! Every pattern is a pure function of `(seed, pattern_index)`. Candidates
//! are drawn from a sine-based hash and accepted only if they satisfy the
//! circular run-length limits; after [`MAX_ATTEMPTS`] rejected candidates the
//! generator falls back to [`Pattern::alternating`].
//!
//! ## Float model
//!
//! All arithmetic is IEEE-754 `f64` and `sin` is the platform libm's
//! `f64::sin`. The hash argument is evaluated as
//! `((seed * 13) + (attempt_seed * 7919)) + (step * 11)` and the fractional
//! part is `x - x.floor()`. A step is a hit when that fraction is `> 0.5`.
//! Changing the order of these operations changes the generated patterns.

use crate::error::{Result, TrainerError};
use crate::types::{Pattern, STEPS_PER_PATTERN};

/// Candidates tried before falling back to the alternating pattern
pub const MAX_ATTEMPTS: u32 = 10;

/// Offset between attempts; a large prime keeps retries of index `n` away
/// from the first attempts of neighbouring indices
pub const ATTEMPT_SEED_MULTIPLIER: f64 = 31337.0;

/// Pseudo-random value in [0, 1) for one step of one attempt
fn seeded_random(seed: f64, attempt_seed: f64, step: usize) -> f64 {
    let x = (seed * 13.0 + attempt_seed * 7919.0 + step as f64 * 11.0).sin() * 10000.0;
    x - x.floor()
}

/// Generate the pattern for `(seed, pattern_index)`.
///
/// Always terminates and always returns a pattern that passes
/// [`Pattern::is_valid`].
pub fn generate_pattern(seed: f64, pattern_index: u32) -> Pattern {
    for attempt in 0..MAX_ATTEMPTS {
        let attempt_seed = f64::from(pattern_index) + f64::from(attempt) * ATTEMPT_SEED_MULTIPLIER;

        let mut steps = [false; STEPS_PER_PATTERN];
        for (i, step) in steps.iter_mut().enumerate() {
            *step = seeded_random(seed, attempt_seed, i) > 0.5;
        }

        let candidate = Pattern::from_steps(steps);
        if candidate.is_valid() {
            return candidate;
        }
    }

    log::debug!(
        "no valid pattern for seed {} index {} after {} attempts, using alternation",
        seed,
        pattern_index,
        MAX_ATTEMPTS
    );
    Pattern::alternating()
}

/// Reduce any finite value into [0, 1)
fn normalize_seed(seed: f64) -> f64 {
    if !seed.is_finite() {
        return 0.0;
    }
    let reduced = seed.rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs
    if reduced >= 1.0 {
        0.0
    } else {
        reduced
    }
}

/// Cached entry for the current index
#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    pattern_index: u32,
    seed_bits: u64,
    pattern: Pattern,
}

/// Owns the seed and the current pattern index, and memoizes the current
/// pattern.
#[derive(Debug, Clone)]
pub struct PatternGenerator {
    seed: f64,
    current_index: u32,
    cache: Option<CacheEntry>,
    /// Number of cache misses served by `current_pattern`
    generations: u64,
}

impl PatternGenerator {
    /// Create a generator with a random seed
    pub fn new() -> Self {
        Self::with_seed(rand::random::<f64>())
    }

    /// Create a generator with a fixed seed (reduced into [0, 1))
    pub fn with_seed(seed: f64) -> Self {
        Self {
            seed: normalize_seed(seed),
            current_index: 0,
            cache: None,
            generations: 0,
        }
    }

    /// Pure lookup for any seed and index, bypassing the cache
    pub fn get_pattern(seed: f64, pattern_index: u32) -> Pattern {
        generate_pattern(seed, pattern_index)
    }

    pub fn seed(&self) -> f64 {
        self.seed
    }

    pub fn pattern_index(&self) -> u32 {
        self.current_index
    }

    pub fn generation_count(&self) -> u64 {
        self.generations
    }

    /// The pattern for the current index, recomputed only when the seed or
    /// the index changed since the last call
    pub fn current_pattern(&mut self) -> Pattern {
        let seed_bits = self.seed.to_bits();
        if let Some(entry) = self.cache {
            if entry.pattern_index == self.current_index && entry.seed_bits == seed_bits {
                return entry.pattern;
            }
        }

        let pattern = generate_pattern(self.seed, self.current_index);
        self.generations += 1;
        self.cache = Some(CacheEntry {
            pattern_index: self.current_index,
            seed_bits,
            pattern,
        });
        pattern
    }

    /// Preview of the pattern that follows the current one (not cached)
    pub fn next_pattern(&self) -> Pattern {
        generate_pattern(self.seed, self.current_index.wrapping_add(1))
    }

    /// Move to the next pattern. Wraps to 0 after `u32::MAX`.
    pub fn advance_pattern(&mut self) {
        self.current_index = self.current_index.wrapping_add(1);
    }

    pub fn set_pattern_index(&mut self, pattern_index: u32) {
        self.current_index = pattern_index;
    }

    /// Replace the seed with a fresh random draw in [0, 1)
    pub fn reseed(&mut self) {
        self.seed = normalize_seed(rand::random::<f64>());
        log::debug!("pattern seed replaced with {}", self.seed);
    }

    /// Replace the seed with an explicit value (reduced into [0, 1))
    pub fn set_seed(&mut self, seed: f64) -> Result<()> {
        if !seed.is_finite() {
            return Err(TrainerError::InvalidSeed(seed));
        }
        self.seed = normalize_seed(seed);
        Ok(())
    }
}

impl Default for PatternGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_golden_vector() {
        // Accepted on the second attempt; guards the float model above
        let pattern = generate_pattern(0.42, 0);
        assert_eq!(pattern.to_string(), "xxx...x.x..x.x..");
    }

    #[test]
    fn test_first_attempt_patterns() {
        assert_eq!(generate_pattern(0.42, 1).to_string(), "x.xx...x..x...x.");
        assert_eq!(generate_pattern(0.42, 2).to_string(), "xx.x.x...x.x.x..");
    }

    #[test]
    fn test_fallback_when_attempts_exhausted() {
        // All ten candidates for this index break a run-length limit
        assert_eq!(generate_pattern(0.42, 83), Pattern::alternating());
    }

    #[test]
    fn test_generation_is_pure() {
        for index in [0, 1, 7, 1000, u32::MAX] {
            assert_eq!(generate_pattern(0.1234, index), generate_pattern(0.1234, index));
        }
    }

    #[test]
    fn test_all_generated_patterns_are_valid() {
        for seed in [0.0, 0.1, 0.42, 0.5, 0.77, 0.999] {
            for index in 0..500 {
                let pattern = generate_pattern(seed, index);
                assert!(pattern.is_valid(), "seed {} index {}: {}", seed, index, pattern);
                assert!(pattern.max_run(true) <= 3);
                assert!(pattern.max_run(false) <= 4);
            }
        }
    }

    #[test]
    fn test_cache_hits_do_not_regenerate() {
        let mut generator = PatternGenerator::with_seed(0.42);
        let first = generator.current_pattern();
        let second = generator.current_pattern();
        assert_eq!(first, second);
        assert_eq!(generator.generation_count(), 1);
    }

    #[test]
    fn test_advance_invalidates_cache() {
        let mut generator = PatternGenerator::with_seed(0.42);
        let before = generator.current_pattern();
        generator.advance_pattern();
        assert_eq!(generator.pattern_index(), 1);
        let after = generator.current_pattern();
        assert_eq!(generator.generation_count(), 2);
        assert_ne!(before, after);
        assert_eq!(after, generate_pattern(0.42, 1));
    }

    #[test]
    fn test_seed_change_invalidates_cache() {
        let mut generator = PatternGenerator::with_seed(0.42);
        generator.current_pattern();
        generator.set_seed(0.5).unwrap();
        generator.current_pattern();
        assert_eq!(generator.generation_count(), 2);
    }

    #[test]
    fn test_next_pattern_previews_without_side_effects() {
        let mut generator = PatternGenerator::with_seed(0.42);
        let preview = generator.next_pattern();
        assert_eq!(generator.pattern_index(), 0);
        assert_eq!(generator.generation_count(), 0);
        generator.advance_pattern();
        assert_eq!(generator.current_pattern(), preview);
    }

    #[test]
    fn test_index_wraps() {
        let mut generator = PatternGenerator::with_seed(0.3);
        generator.set_pattern_index(u32::MAX);
        assert_eq!(generator.next_pattern(), generate_pattern(0.3, 0));
        generator.advance_pattern();
        assert_eq!(generator.pattern_index(), 0);
    }

    #[test]
    fn test_seed_normalization() {
        assert_eq!(PatternGenerator::with_seed(1.25).seed(), 0.25);
        assert_eq!(PatternGenerator::with_seed(-0.75).seed(), 0.25);
        assert_eq!(PatternGenerator::with_seed(f64::NAN).seed(), 0.0);
        assert!(PatternGenerator::with_seed(0.0).set_seed(f64::NAN).is_err());
    }

    #[test]
    fn test_reseed_stays_in_unit_interval() {
        let mut generator = PatternGenerator::with_seed(0.42);
        for _ in 0..100 {
            generator.reseed();
            assert!((0.0..1.0).contains(&generator.seed()));
        }
    }
}
