//! Frame ticks and the device-less clock
//!
//! [`FrameTicker`] stands in for a display's frame callback: a fixed
//! ~60 Hz timer channel plus a record of which request is armed.
//! [`SilentClock`] measures wall time and swallows sounds, for running
//! without an output device.

use backbeat_core::ScheduledSound;
use backbeat_core::engine::{AudioClock, TickHandle, TickSource};
use crossbeam_channel::{Receiver, tick};
use std::time::{Duration, Instant};

/// Display-like refresh interval
pub const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

pub struct FrameTicker {
    frames: Receiver<Instant>,
    next_id: u64,
    armed: Option<TickHandle>,
}

impl FrameTicker {
    pub fn new() -> Self {
        Self::with_interval(FRAME_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            frames: tick(interval),
            next_id: 0,
            armed: None,
        }
    }

    /// Timer channel to wait on; one message per frame
    pub fn frames(&self) -> Receiver<Instant> {
        self.frames.clone()
    }

    pub fn armed(&self) -> Option<TickHandle> {
        self.armed
    }

    /// Consume the armed request when a frame arrives
    pub fn take_armed(&mut self) -> Option<TickHandle> {
        self.armed.take()
    }
}

impl Default for FrameTicker {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for FrameTicker {
    fn request_tick(&mut self) -> TickHandle {
        self.next_id += 1;
        let handle = TickHandle(self.next_id);
        self.armed = Some(handle);
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        if self.armed == Some(handle) {
            self.armed = None;
        }
    }
}

/// Wall-clock time source that plays nothing
#[derive(Debug)]
pub struct SilentClock {
    origin: Instant,
    discarded: u64,
}

impl SilentClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            discarded: 0,
        }
    }

    /// How many sounds would have played
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

impl Default for SilentClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for SilentClock {
    fn current_time(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn schedule(&mut self, sound: &ScheduledSound) {
        log::trace!("silent {} at {:.3}s", sound.kind.name(), sound.time);
        self.discarded += 1;
    }
}
