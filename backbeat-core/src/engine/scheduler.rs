//! Lookahead scheduling engine
//!
//! The engine is polled once per host frame, but how many sixteenth notes it
//! commits per poll depends only on the audio clock: every poll schedules
//! all steps whose time falls before `now + lookahead`. A throttled host that
//! polls rarely gets several steps per poll instead of losing beats.
//!
//! Step times are derived from an anchor (`anchor_time`, `anchor_step`) and
//! the current interval rather than summed tick by tick, so long runs carry
//! no accumulated rounding error. Tempo changes and foreground resyncs move
//! the anchor; committed sounds are never rewritten.

use crate::config::{validate_tempo, TrainerConfig};
use crate::engine::clock::{AudioClock, TickHandle, TickSource};
use crate::error::Result;
use crate::generator::PatternGenerator;
use crate::types::{ScheduledSound, SoundKind, STEPS_PER_PATTERN};

/// Sixteenth notes per bar
pub const BAR_STEPS: u64 = STEPS_PER_PATTERN as u64;

/// Sixteenth notes per pattern cycle (a pattern is played for two bars)
pub const CYCLE_STEPS: u64 = 2 * BAR_STEPS;

/// Sixteenth notes per quarter-note click
pub const STEPS_PER_BEAT: u64 = 4;

/// Whether the loop should keep running after a listener callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Continue,
    /// Stop playback once the current step has advanced
    Stop,
}

impl Flow {
    fn and(self, other: Flow) -> Flow {
        if self == Flow::Stop || other == Flow::Stop {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }
}

/// Receives boundary callbacks synchronously from inside the loop.
///
/// Handlers must not block. Returning [`Flow::Stop`] stops playback from
/// within the callback.
pub trait PlaybackListener {
    /// A two-bar cycle finished. The next step reads
    /// `patterns.current_pattern()`, so advancing here takes effect at once.
    fn on_pattern_complete(&mut self, patterns: &mut PatternGenerator) -> Flow {
        let _ = patterns;
        Flow::Continue
    }

    /// A bar finished. `bar_index` alternates 0,1; `bar_number` counts bars
    /// since the count-in ended.
    fn on_bar_complete(&mut self, bar_index: u8, bar_number: u64) -> Flow {
        let _ = (bar_index, bar_number);
        Flow::Continue
    }
}

/// Listener that ignores every callback
impl PlaybackListener for () {}

/// What a single scheduling pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Sixteenth-note steps advanced
    pub steps: u64,
    /// Sounds handed to the audio clock
    pub sounds: u64,
}

pub struct SchedulingEngine<C: AudioClock, T: TickSource> {
    clock: C,
    ticks: T,

    tempo_bpm: f64,
    lookahead_secs: f64,
    count_in_steps: u64,

    /// Time of the next unscheduled step
    playhead_time: f64,
    /// Steps emitted since `start`
    beat_counter: u64,
    anchor_time: f64,
    anchor_step: u64,

    running: bool,
    muted: bool,
    pending_tick: Option<TickHandle>,
}

impl<C: AudioClock, T: TickSource> SchedulingEngine<C, T> {
    pub fn new(config: &TrainerConfig, clock: C, ticks: T) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            clock,
            ticks,
            tempo_bpm: config.tempo_bpm,
            lookahead_secs: config.lookahead_secs,
            count_in_steps: config.count_in_steps,
            playhead_time: 0.0,
            beat_counter: 0,
            anchor_time: 0.0,
            anchor_step: 0,
            running: false,
            muted: false,
            pending_tick: None,
        })
    }

    /// Begin playback with a fresh count-in. No-op while running.
    ///
    /// Runs the first scheduling pass immediately and arms the next tick.
    pub fn start(
        &mut self,
        patterns: &mut PatternGenerator,
        listener: &mut dyn PlaybackListener,
    ) -> PassReport {
        if self.running {
            return PassReport::default();
        }

        if let Err(e) = self.clock.resume() {
            log::warn!("{}; starting anyway", e);
        }

        self.running = true;
        self.beat_counter = 0;
        self.playhead_time = self.clock.current_time();
        self.reanchor();
        log::debug!(
            "playback started at {:.3}s, {:.1} BPM",
            self.playhead_time,
            self.tempo_bpm
        );

        self.run_pass(patterns, listener)
    }

    /// Stop playback and cancel the pending tick. No-op while stopped.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        if let Some(handle) = self.pending_tick.take() {
            self.ticks.cancel_tick(handle);
        }
        log::debug!("playback stopped after {} steps", self.beat_counter);
    }

    /// Frame callback. Handles that are not the currently armed one (for
    /// example a frame that was already queued when `stop` ran) are ignored.
    pub fn on_tick(
        &mut self,
        handle: TickHandle,
        patterns: &mut PatternGenerator,
        listener: &mut dyn PlaybackListener,
    ) -> PassReport {
        if self.pending_tick != Some(handle) {
            log::trace!("ignoring stale tick {:?}", handle);
            return PassReport::default();
        }
        self.pending_tick = None;
        self.run_pass(patterns, listener)
    }

    /// Change tempo. Applies from the next unscheduled step on.
    pub fn set_tempo(&mut self, bpm: f64) -> Result<()> {
        validate_tempo(bpm)?;
        // Steps up to the playhead are already committed at the old spacing
        self.reanchor();
        self.tempo_bpm = bpm;
        log::debug!("tempo set to {:.1} BPM", bpm);
        Ok(())
    }

    /// Host visibility change. While backgrounded the loop keeps time and
    /// fires callbacks but emits no sounds. Returning to the foreground moves
    /// a stale playhead up to the clock so no backlog of sounds fires at once.
    pub fn set_backgrounded(&mut self, backgrounded: bool) {
        let was_muted = self.muted;
        self.muted = backgrounded;

        if was_muted && !backgrounded {
            let now = self.clock.current_time();
            if self.playhead_time < now {
                log::debug!(
                    "foregrounded: skipping {:.3}s of silent playhead",
                    now - self.playhead_time
                );
                self.playhead_time = now;
                self.reanchor();
            }
        } else if !was_muted && backgrounded {
            log::debug!("backgrounded: muting output");
        }
    }

    pub fn tempo(&self) -> f64 {
        self.tempo_bpm
    }

    pub fn seconds_per_sixteenth(&self) -> f64 {
        60.0 / self.tempo_bpm / STEPS_PER_BEAT as f64
    }

    pub fn lookahead(&self) -> f64 {
        self.lookahead_secs
    }

    pub fn count_in_steps(&self) -> u64 {
        self.count_in_steps
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn beat_counter(&self) -> u64 {
        self.beat_counter
    }

    pub fn playhead_time(&self) -> f64 {
        self.playhead_time
    }

    /// Whether the current step is still inside the count-in bar
    pub fn in_count_in(&self) -> bool {
        self.beat_counter < self.count_in_steps
    }

    pub fn pending_tick(&self) -> Option<TickHandle> {
        self.pending_tick
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn ticks(&self) -> &T {
        &self.ticks
    }

    pub fn ticks_mut(&mut self) -> &mut T {
        &mut self.ticks
    }

    fn reanchor(&mut self) {
        self.anchor_time = self.playhead_time;
        self.anchor_step = self.beat_counter;
    }

    /// Schedule what is due, then re-arm only if still running
    fn run_pass(
        &mut self,
        patterns: &mut PatternGenerator,
        listener: &mut dyn PlaybackListener,
    ) -> PassReport {
        if !self.running {
            return PassReport::default();
        }

        let report = self.schedule_due(patterns, listener);

        if self.running {
            self.pending_tick = Some(self.ticks.request_tick());
        }
        report
    }

    fn schedule_due(
        &mut self,
        patterns: &mut PatternGenerator,
        listener: &mut dyn PlaybackListener,
    ) -> PassReport {
        let mut report = PassReport::default();
        let horizon = self.clock.current_time() + self.lookahead_secs;

        while self.running && self.playhead_time < horizon {
            let flow = self.process_step(patterns, listener, &mut report);
            self.advance();
            report.steps += 1;

            if flow == Flow::Stop {
                self.stop();
            }
        }

        report
    }

    fn process_step(
        &mut self,
        patterns: &mut PatternGenerator,
        listener: &mut dyn PlaybackListener,
        report: &mut PassReport,
    ) -> Flow {
        let step = self.beat_counter;
        let step_in_bar = (step % BAR_STEPS) as usize;
        let is_count_in = self.in_count_in();

        if step_in_bar as u64 % STEPS_PER_BEAT == 0 {
            self.emit(
                SoundKind::Click {
                    downbeat: step_in_bar == 0,
                },
                report,
            );
        }

        if !is_count_in && patterns.current_pattern().is_hit(step_in_bar) {
            self.emit(SoundKind::RhythmHit, report);
        }

        if is_count_in {
            return Flow::Continue;
        }

        let elapsed = step - self.count_in_steps;
        let mut flow = Flow::Continue;

        if elapsed % CYCLE_STEPS == CYCLE_STEPS - 1 {
            flow = flow.and(listener.on_pattern_complete(patterns));
        }

        if elapsed % BAR_STEPS == BAR_STEPS - 1 {
            let bar_number = elapsed / BAR_STEPS;
            flow = flow.and(listener.on_bar_complete((bar_number % 2) as u8, bar_number));
        }

        flow
    }

    /// Muted sounds are never created at all
    fn emit(&mut self, kind: SoundKind, report: &mut PassReport) {
        if self.muted {
            return;
        }
        let sound = ScheduledSound::new(kind, self.playhead_time, self.beat_counter);
        log::trace!(
            "step {} {} at {:.4}s",
            sound.step,
            sound.kind.name(),
            sound.time
        );
        self.clock.schedule(&sound);
        report.sounds += 1;
    }

    fn advance(&mut self) {
        self.beat_counter += 1;
        let since_anchor = (self.beat_counter - self.anchor_step) as f64;
        self.playhead_time = self.anchor_time + since_anchor * self.seconds_per_sixteenth();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clock::{ManualClock, ManualTicks};
    use approx::assert_relative_eq;

    type TestEngine = SchedulingEngine<ManualClock, ManualTicks>;

    fn engine(bpm: f64) -> TestEngine {
        SchedulingEngine::new(
            &TrainerConfig::default().with_tempo(bpm),
            ManualClock::new(),
            ManualTicks::new(),
        )
        .unwrap()
    }

    /// Advance the clock `frames` times by `dt`, delivering armed ticks
    fn run_frames(
        engine: &mut TestEngine,
        patterns: &mut PatternGenerator,
        listener: &mut dyn PlaybackListener,
        frames: usize,
        dt: f64,
    ) {
        for _ in 0..frames {
            engine.clock_mut().advance(dt);
            if let Some(handle) = engine.ticks_mut().fire() {
                engine.on_tick(handle, patterns, listener);
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        patterns_completed: u32,
        bars: Vec<(u8, u64)>,
        stop_after_patterns: Option<u32>,
    }

    impl PlaybackListener for Recorder {
        fn on_pattern_complete(&mut self, patterns: &mut PatternGenerator) -> Flow {
            self.patterns_completed += 1;
            patterns.advance_pattern();
            match self.stop_after_patterns {
                Some(n) if self.patterns_completed >= n => Flow::Stop,
                _ => Flow::Continue,
            }
        }

        fn on_bar_complete(&mut self, bar_index: u8, bar_number: u64) -> Flow {
            self.bars.push((bar_index, bar_number));
            Flow::Continue
        }
    }

    #[test]
    fn test_start_schedules_first_window() {
        let mut engine = engine(120.0);
        let mut patterns = PatternGenerator::with_seed(0.42);

        let report = engine.start(&mut patterns, &mut ());

        // 120 BPM: steps every 0.125s, so only step 0 is inside 0.1s
        assert_eq!(report, PassReport { steps: 1, sounds: 1 });
        assert_eq!(
            engine.clock().scheduled()[0].kind,
            SoundKind::Click { downbeat: true }
        );
        assert!(engine.is_running());
        assert!(engine.ticks().armed().is_some());
        assert_eq!(engine.clock().resume_calls(), 1);
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut engine = engine(240.0);
        let mut patterns = PatternGenerator::with_seed(0.42);
        engine.start(&mut patterns, &mut ());
        let counter = engine.beat_counter();

        let report = engine.start(&mut patterns, &mut ());
        assert_eq!(report, PassReport::default());
        assert_eq!(engine.beat_counter(), counter);
        assert_eq!(engine.clock().resume_calls(), 1);
    }

    #[test]
    fn test_count_in_has_clicks_only() {
        let mut engine = engine(120.0);
        let mut patterns = PatternGenerator::with_seed(0.42);
        engine.start(&mut patterns, &mut ());
        // One bar at 120 BPM is 2s; stay just short of step 16's window
        run_frames(&mut engine, &mut patterns, &mut (), 100, 0.0185);
        assert_eq!(engine.beat_counter(), 16);

        let sounds = engine.clock().scheduled();
        assert!(sounds.iter().all(|s| s.kind.is_click()));
        let steps: Vec<u64> = sounds.iter().map(|s| s.step).collect();
        assert_eq!(steps, vec![0, 4, 8, 12]);
    }

    #[test]
    fn test_catches_up_after_long_gap() {
        let mut engine = engine(120.0);
        let mut patterns = PatternGenerator::with_seed(0.42);
        engine.start(&mut patterns, &mut ());

        let handle = engine.ticks_mut().fire().unwrap();
        engine.clock_mut().advance(1.0);
        let report = engine.on_tick(handle, &mut patterns, &mut ());

        // Steps at 0.125..=1.0 are due before 1.1
        assert_eq!(report.steps, 8);
        assert_eq!(engine.beat_counter(), 9);
        assert_relative_eq!(engine.playhead_time(), 1.125);
    }

    #[test]
    fn test_tempo_change_applies_to_next_interval() {
        let mut engine = engine(120.0);
        let mut patterns = PatternGenerator::with_seed(0.42);
        engine.start(&mut patterns, &mut ());
        assert_relative_eq!(engine.playhead_time(), 0.125);

        engine.set_tempo(60.0).unwrap();
        // The committed playhead does not move
        assert_relative_eq!(engine.playhead_time(), 0.125);

        let handle = engine.ticks_mut().fire().unwrap();
        engine.clock_mut().advance(0.2);
        engine.on_tick(handle, &mut patterns, &mut ());
        // Step 1 at 0.125, then 0.25s spacing
        assert_relative_eq!(engine.playhead_time(), 0.375);
    }

    #[test]
    fn test_rejects_invalid_tempo() {
        let mut engine = engine(120.0);
        assert!(engine.set_tempo(0.0).is_err());
        assert!(engine.set_tempo(-10.0).is_err());
        assert!(engine.set_tempo(f64::NAN).is_err());
        assert_eq!(engine.tempo(), 120.0);
    }

    #[test]
    fn test_rejects_runaway_tempo() {
        use crate::config::MAX_TEMPO_BPM;
        use crate::error::TrainerError;

        let mut engine = engine(120.0);
        assert_eq!(
            engine.set_tempo(1.0e12),
            Err(TrainerError::InvalidTempo(1.0e12))
        );
        assert_eq!(engine.tempo(), 120.0);

        engine.set_tempo(MAX_TEMPO_BPM).unwrap();
        let mut patterns = PatternGenerator::with_seed(0.42);
        let report = engine.start(&mut patterns, &mut ());

        // Fastest tempo: sixteenths every 15 ms, 7 of them inside 0.1s
        assert_eq!(report.steps, 7);
    }

    #[test]
    fn test_stop_cancels_tick_and_ignores_stale_handle() {
        let mut engine = engine(120.0);
        let mut patterns = PatternGenerator::with_seed(0.42);
        engine.start(&mut patterns, &mut ());
        let stale = engine.ticks().armed().unwrap();

        engine.stop();
        assert!(!engine.is_running());
        assert_eq!(engine.ticks().armed(), None);
        assert_eq!(engine.ticks().cancelled(), 1);

        engine.clock_mut().advance(5.0);
        let report = engine.on_tick(stale, &mut patterns, &mut ());
        assert_eq!(report, PassReport::default());

        // Second stop is a no-op
        engine.stop();
        assert_eq!(engine.ticks().cancelled(), 1);
    }

    #[test]
    fn test_restart_resets_counter_and_playhead() {
        let mut engine = engine(120.0);
        let mut patterns = PatternGenerator::with_seed(0.42);
        engine.start(&mut patterns, &mut ());
        run_frames(&mut engine, &mut patterns, &mut (), 60, 1.0 / 60.0);
        assert!(engine.beat_counter() > 1);

        engine.stop();
        engine.clock_mut().advance(3.0);
        let now = engine.clock().current_time();
        engine.clock_mut().take_scheduled();
        engine.start(&mut patterns, &mut ());

        assert_eq!(engine.beat_counter(), 1);
        let first = engine.clock().scheduled()[0];
        assert_eq!(first.step, 0);
        assert_relative_eq!(first.time, now);
    }

    #[test]
    fn test_listener_can_stop_playback() {
        let mut engine = engine(240.0);
        let mut patterns = PatternGenerator::with_seed(0.42);
        let mut recorder = Recorder {
            stop_after_patterns: Some(1),
            ..Recorder::default()
        };

        engine.start(&mut patterns, &mut recorder);
        run_frames(&mut engine, &mut patterns, &mut recorder, 600, 1.0 / 60.0);

        assert!(!engine.is_running());
        assert_eq!(engine.ticks().armed(), None);
        assert_eq!(recorder.patterns_completed, 1);
        // Count-in plus one full cycle
        assert_eq!(engine.beat_counter(), 16 + 32);
        // The bar callback of the same step still fired
        assert_eq!(recorder.bars, vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_muted_engine_keeps_time_silently() {
        let mut engine = engine(120.0);
        let mut patterns = PatternGenerator::with_seed(0.42);
        let mut recorder = Recorder::default();
        engine.start(&mut patterns, &mut recorder);
        engine.set_backgrounded(true);
        engine.clock_mut().take_scheduled();

        run_frames(&mut engine, &mut patterns, &mut recorder, 600, 1.0 / 60.0);

        assert!(engine.clock().scheduled().is_empty());
        assert!(engine.beat_counter() > 64);
        assert!(recorder.patterns_completed >= 1);
        assert!(!recorder.bars.is_empty());
    }

    #[test]
    fn test_foreground_resyncs_stale_playhead() {
        let mut engine = engine(120.0);
        let mut patterns = PatternGenerator::with_seed(0.42);
        engine.start(&mut patterns, &mut ());
        engine.set_backgrounded(true);

        // Host stops delivering frames while hidden
        engine.clock_mut().advance(30.0);
        engine.set_backgrounded(false);
        assert_relative_eq!(engine.playhead_time(), 30.0);

        let counter = engine.beat_counter();
        let handle = engine.ticks_mut().fire().unwrap();
        let report = engine.on_tick(handle, &mut patterns, &mut ());
        // Only the steps inside the lookahead window, not 30s of backlog
        assert_eq!(report.steps, 1);
        assert_eq!(engine.beat_counter(), counter + 1);
    }

    #[test]
    fn test_foreground_never_moves_playhead_backwards() {
        let mut engine = engine(120.0);
        let mut patterns = PatternGenerator::with_seed(0.42);
        engine.start(&mut patterns, &mut ());
        engine.set_backgrounded(true);
        let ahead = engine.playhead_time();

        engine.set_backgrounded(false);
        assert_relative_eq!(engine.playhead_time(), ahead);
    }

    #[test]
    fn test_resume_failure_is_not_fatal() {
        let mut engine = SchedulingEngine::new(
            &TrainerConfig::default(),
            ManualClock::new().failing_resume(),
            ManualTicks::new(),
        )
        .unwrap();
        let mut patterns = PatternGenerator::with_seed(0.42);

        let report = engine.start(&mut patterns, &mut ());
        assert!(engine.is_running());
        assert_eq!(report.steps, 1);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = SchedulingEngine::new(
            &TrainerConfig::default().with_tempo(0.0),
            ManualClock::new(),
            ManualTicks::new(),
        );
        assert!(result.is_err());
    }
}
