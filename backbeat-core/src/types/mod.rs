// backbeat-core/src/types/mod.rs

pub mod pattern;
pub mod scheduled_event;

pub use pattern::{
    Pattern, PatternParseError, MAX_CONSECUTIVE_HITS, MAX_CONSECUTIVE_RESTS, STEPS_PER_PATTERN,
};
pub use scheduled_event::{Notification, ScheduledSound, SoundKind};
