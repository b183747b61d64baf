use thiserror::Error;

/// Validation errors surfaced by the trainer's public operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainerError {
    #[error("tempo must be a finite BPM value in (0, 1000] (got {0})")]
    InvalidTempo(f64),
    #[error("lookahead must be a positive, finite number of seconds (got {0})")]
    InvalidLookahead(f64),
    #[error("seed must be a finite number (got {0})")]
    InvalidSeed(f64),
}

/// Failure reported by an audio clock collaborator.
///
/// The engine only logs these; playback continues optimistically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("audio clock could not resume: {message}")]
pub struct ClockError {
    pub message: String,
}

impl ClockError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrainerError>;
