pub mod clock;
pub mod scheduler;

pub use clock::{AudioClock, ManualClock, ManualTicks, TickHandle, TickSource};
pub use scheduler::{
    Flow, PassReport, PlaybackListener, SchedulingEngine, BAR_STEPS, CYCLE_STEPS, STEPS_PER_BEAT,
};
