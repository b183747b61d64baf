//! Events produced by the scheduling loop
//!
//! Audible events ([`ScheduledSound`]) go to the audio clock with an absolute
//! timestamp. Boundary events ([`Notification`]) go to the orchestrator.

/// Which sample the audio collaborator should play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SoundKind {
    /// Quarter-note metronome click; `downbeat` is set on step 0 of the bar
    Click { downbeat: bool },
    /// A hit from the current rhythm pattern
    RhythmHit,
}

impl SoundKind {
    pub fn name(&self) -> &'static str {
        match self {
            SoundKind::Click { downbeat: true } => "downbeat",
            SoundKind::Click { downbeat: false } => "click",
            SoundKind::RhythmHit => "rhythm",
        }
    }

    pub fn is_click(&self) -> bool {
        matches!(self, SoundKind::Click { .. })
    }
}

/// A sound committed at an absolute audio-clock time
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduledSound {
    pub kind: SoundKind,
    /// Audio-clock time in seconds
    pub time: f64,
    /// Sixteenth-note step counter at emission (0 = first count-in step)
    pub step: u64,
}

impl ScheduledSound {
    pub fn new(kind: SoundKind, time: f64, step: u64) -> Self {
        Self { kind, time, step }
    }
}

/// Boundary notifications emitted from inside the scheduling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum Notification {
    /// A two-bar cycle finished; `pattern_index` is the index now playing
    PatternComplete { pattern_index: u32 },
    /// A bar finished; `bar_index` alternates 0,1 within the cycle
    BarComplete { bar_index: u8, bar_number: u64 },
}
