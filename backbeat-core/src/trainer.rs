//! Orchestrator tying the pattern generator to the scheduling engine
//!
//! The [`Trainer`] owns one of each. Pattern changes happen synchronously
//! inside the scheduling loop, so the step right after a cycle boundary
//! already reads the new pattern. Boundary events are also queued as
//! [`Notification`]s for the host to drain after each pass.

use std::collections::VecDeque;

use crate::config::TrainerConfig;
use crate::engine::{AudioClock, Flow, PassReport, PlaybackListener, SchedulingEngine};
use crate::engine::{TickHandle, TickSource};
use crate::error::Result;
use crate::generator::PatternGenerator;
use crate::types::{Notification, Pattern};

/// Queue bound; older notifications are dropped if the host never drains
const MAX_QUEUED_NOTIFICATIONS: usize = 256;

/// Point-in-time view for status displays
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrainerSnapshot {
    pub running: bool,
    pub muted: bool,
    pub tempo_bpm: f64,
    pub beat_counter: u64,
    pub in_count_in: bool,
    pub seed: f64,
    pub pattern_index: u32,
    pub current_pattern: Pattern,
    pub next_pattern: Pattern,
}

/// Listener used during a pass: advances the generator and queues events
struct QueueingListener<'a> {
    queue: &'a mut VecDeque<Notification>,
}

impl QueueingListener<'_> {
    fn push(&mut self, notification: Notification) {
        if self.queue.len() >= MAX_QUEUED_NOTIFICATIONS {
            self.queue.pop_front();
        }
        self.queue.push_back(notification);
    }
}

impl PlaybackListener for QueueingListener<'_> {
    fn on_pattern_complete(&mut self, patterns: &mut PatternGenerator) -> Flow {
        patterns.advance_pattern();
        self.push(Notification::PatternComplete {
            pattern_index: patterns.pattern_index(),
        });
        Flow::Continue
    }

    fn on_bar_complete(&mut self, bar_index: u8, bar_number: u64) -> Flow {
        self.push(Notification::BarComplete {
            bar_index,
            bar_number,
        });
        Flow::Continue
    }
}

pub struct Trainer<C: AudioClock, T: TickSource> {
    engine: SchedulingEngine<C, T>,
    patterns: PatternGenerator,
    notifications: VecDeque<Notification>,
}

impl<C: AudioClock, T: TickSource> Trainer<C, T> {
    pub fn new(config: TrainerConfig, clock: C, ticks: T) -> Result<Self> {
        let engine = SchedulingEngine::new(&config, clock, ticks)?;
        let patterns = match config.seed {
            Some(seed) => PatternGenerator::with_seed(seed),
            None => PatternGenerator::new(),
        };
        Ok(Self::from_parts(engine, patterns))
    }

    pub fn from_parts(engine: SchedulingEngine<C, T>, patterns: PatternGenerator) -> Self {
        Self {
            engine,
            patterns,
            notifications: VecDeque::new(),
        }
    }

    pub fn start(&mut self) -> PassReport {
        let mut listener = QueueingListener {
            queue: &mut self.notifications,
        };
        self.engine.start(&mut self.patterns, &mut listener)
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    /// Deliver a frame callback from the tick source
    pub fn tick(&mut self, handle: TickHandle) -> PassReport {
        let mut listener = QueueingListener {
            queue: &mut self.notifications,
        };
        self.engine.on_tick(handle, &mut self.patterns, &mut listener)
    }

    pub fn set_tempo(&mut self, bpm: f64) -> Result<()> {
        self.engine.set_tempo(bpm)
    }

    pub fn tempo(&self) -> f64 {
        self.engine.tempo()
    }

    pub fn set_backgrounded(&mut self, backgrounded: bool) {
        self.engine.set_backgrounded(backgrounded);
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    pub fn current_pattern(&mut self) -> Pattern {
        self.patterns.current_pattern()
    }

    pub fn next_pattern(&self) -> Pattern {
        self.patterns.next_pattern()
    }

    pub fn pattern_index(&self) -> u32 {
        self.patterns.pattern_index()
    }

    /// Draw a new random seed; the current pattern changes immediately
    pub fn reseed(&mut self) {
        self.patterns.reseed();
    }

    pub fn set_seed(&mut self, seed: f64) -> Result<()> {
        self.patterns.set_seed(seed)
    }

    /// Notifications queued since the last drain, oldest first
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    pub fn snapshot(&mut self) -> TrainerSnapshot {
        TrainerSnapshot {
            running: self.engine.is_running(),
            muted: self.engine.is_muted(),
            tempo_bpm: self.engine.tempo(),
            beat_counter: self.engine.beat_counter(),
            in_count_in: self.engine.in_count_in(),
            seed: self.patterns.seed(),
            pattern_index: self.patterns.pattern_index(),
            current_pattern: self.patterns.current_pattern(),
            next_pattern: self.patterns.next_pattern(),
        }
    }

    pub fn engine(&self) -> &SchedulingEngine<C, T> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SchedulingEngine<C, T> {
        &mut self.engine
    }

    pub fn patterns(&self) -> &PatternGenerator {
        &self.patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ManualClock, ManualTicks};

    fn trainer() -> Trainer<ManualClock, ManualTicks> {
        Trainer::new(
            TrainerConfig::default().with_tempo(240.0).with_seed(0.42),
            ManualClock::new(),
            ManualTicks::new(),
        )
        .unwrap()
    }

    fn run(trainer: &mut Trainer<ManualClock, ManualTicks>, frames: usize) {
        for _ in 0..frames {
            trainer.engine_mut().clock_mut().advance(1.0 / 60.0);
            if let Some(handle) = trainer.engine_mut().ticks_mut().fire() {
                trainer.tick(handle);
            }
        }
    }

    #[test]
    fn test_pattern_complete_advances_generator() {
        let mut trainer = trainer();
        trainer.start();
        // 240 BPM: 16 + 32 steps take 3s
        run(&mut trainer, 200);

        assert_eq!(trainer.pattern_index(), 1);
        let notifications = trainer.drain_notifications();
        assert!(notifications.contains(&Notification::PatternComplete { pattern_index: 1 }));
        assert!(trainer.drain_notifications().is_empty());
    }

    #[test]
    fn test_new_pattern_is_heard_from_next_step() {
        let mut trainer = trainer();
        trainer.start();
        run(&mut trainer, 240);

        let first = PatternGenerator::get_pattern(0.42, 0);
        let second = PatternGenerator::get_pattern(0.42, 1);
        let hits: Vec<u64> = trainer
            .engine()
            .clock()
            .scheduled()
            .iter()
            .filter(|s| !s.kind.is_click())
            .map(|s| s.step)
            .collect();

        for step in 16..48u64 {
            assert_eq!(hits.contains(&step), first.is_hit((step % 16) as usize));
        }
        for step in 48..64u64 {
            assert_eq!(hits.contains(&step), second.is_hit((step % 16) as usize));
        }
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut trainer = trainer();
        let snapshot = trainer.snapshot();
        assert!(!snapshot.running);
        assert_eq!(snapshot.tempo_bpm, 240.0);
        assert_eq!(snapshot.seed, 0.42);
        assert_eq!(snapshot.current_pattern.to_string(), "xxx...x.x..x.x..");
        assert_eq!(snapshot.next_pattern, PatternGenerator::get_pattern(0.42, 1));

        trainer.start();
        let snapshot = trainer.snapshot();
        assert!(snapshot.running);
        assert!(snapshot.in_count_in);
    }

    #[test]
    fn test_notification_queue_is_bounded() {
        let mut trainer = trainer();
        trainer.start();
        trainer.set_backgrounded(true);
        // Far more bars than the queue holds, never drained
        run(&mut trainer, 60 * 60 * 10);
        assert_eq!(trainer.drain_notifications().len(), MAX_QUEUED_NOTIFICATIONS);
    }
}
