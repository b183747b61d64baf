//! Collaborator interfaces for the scheduling engine
//!
//! The engine never talks to an audio API or a timer directly. It reads time
//! from an [`AudioClock`], hands audible events back to it, and asks a
//! [`TickSource`] to call it again roughly once per display frame.

use crate::error::ClockError;
use crate::types::ScheduledSound;

/// A monotonic audio clock that can also play sounds at absolute times
pub trait AudioClock {
    /// Current clock reading in seconds; never decreases
    fn current_time(&self) -> f64;

    /// Wake a suspended clock. Best effort: the engine logs failures and
    /// carries on.
    fn resume(&mut self) -> Result<(), ClockError> {
        Ok(())
    }

    /// Commit a sound at `sound.time`
    fn schedule(&mut self, sound: &ScheduledSound);
}

impl<C: AudioClock + ?Sized> AudioClock for Box<C> {
    fn current_time(&self) -> f64 {
        (**self).current_time()
    }

    fn resume(&mut self) -> Result<(), ClockError> {
        (**self).resume()
    }

    fn schedule(&mut self, sound: &ScheduledSound) {
        (**self).schedule(sound)
    }
}

/// Identifies one pending tick request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(pub u64);

/// Host-driven frame callback source (`requestAnimationFrame` and friends).
///
/// The source only records requests; the host calls the engine's `on_tick`
/// with the handle when the frame arrives.
pub trait TickSource {
    fn request_tick(&mut self) -> TickHandle;
    fn cancel_tick(&mut self, handle: TickHandle);
}

impl<T: TickSource + ?Sized> TickSource for Box<T> {
    fn request_tick(&mut self) -> TickHandle {
        (**self).request_tick()
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        (**self).cancel_tick(handle)
    }
}

/// Hand-driven clock for tests and simulations.
///
/// Time only moves when the caller says so. Every scheduled sound is kept
/// so tests can inspect exactly what would have played.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: f64,
    scheduled: Vec<ScheduledSound>,
    resume_calls: usize,
    fail_resume: bool,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now: f64) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }

    /// Make every `resume` call fail
    pub fn failing_resume(mut self) -> Self {
        self.fail_resume = true;
        self
    }

    /// Move the clock forward; negative deltas are ignored
    pub fn advance(&mut self, secs: f64) {
        if secs > 0.0 {
            self.now += secs;
        }
    }

    /// Jump to an absolute time, never backwards
    pub fn set_time(&mut self, now: f64) {
        self.now = self.now.max(now);
    }

    pub fn scheduled(&self) -> &[ScheduledSound] {
        &self.scheduled
    }

    pub fn take_scheduled(&mut self) -> Vec<ScheduledSound> {
        std::mem::take(&mut self.scheduled)
    }

    pub fn resume_calls(&self) -> usize {
        self.resume_calls
    }
}

impl AudioClock for ManualClock {
    fn current_time(&self) -> f64 {
        self.now
    }

    fn resume(&mut self) -> Result<(), ClockError> {
        self.resume_calls += 1;
        if self.fail_resume {
            Err(ClockError::new("manual clock configured to fail"))
        } else {
            Ok(())
        }
    }

    fn schedule(&mut self, sound: &ScheduledSound) {
        self.scheduled.push(*sound);
    }
}

/// Tick source that just remembers the armed request.
///
/// Hosts with their own frame loop (and tests) poll [`ManualTicks::armed`]
/// and forward the handle to the engine.
#[derive(Debug, Clone, Default)]
pub struct ManualTicks {
    next_id: u64,
    armed: Option<TickHandle>,
    cancelled: usize,
}

impl ManualTicks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn armed(&self) -> Option<TickHandle> {
        self.armed
    }

    /// Take the armed handle, as a frame callback firing would
    pub fn fire(&mut self) -> Option<TickHandle> {
        self.armed.take()
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled
    }
}

impl TickSource for ManualTicks {
    fn request_tick(&mut self) -> TickHandle {
        self.next_id += 1;
        let handle = TickHandle(self.next_id);
        self.armed = Some(handle);
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        if self.armed == Some(handle) {
            self.armed = None;
            self.cancelled += 1;
        }
    }
}
