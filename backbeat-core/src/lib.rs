//! # Backbeat Core
//!
//! WASM-compatible core of the Backbeat rhythm trainer: a lookahead
//! metronome scheduler and a seeded generator of syncopation patterns.
//! No audio or timer APIs are used directly; hosts plug them in through the
//! [`engine::AudioClock`] and [`engine::TickSource`] traits.
//!
//! ## Features
//!
//! - **serde**: Serialize configs, patterns, snapshots and notifications
//! - **wasm**: Browser bindings over Web Audio and `requestAnimationFrame`
//!
//! ## Example
//!
//! ```
//! use backbeat_core::engine::{ManualClock, ManualTicks};
//! use backbeat_core::{Trainer, TrainerConfig};
//!
//! let config = TrainerConfig::default().with_tempo(100.0).with_seed(0.42);
//! let mut trainer = Trainer::new(config, ManualClock::new(), ManualTicks::new()).unwrap();
//! trainer.start();
//!
//! // Host frame loop
//! trainer.engine_mut().clock_mut().advance(1.0 / 60.0);
//! if let Some(handle) = trainer.engine_mut().ticks_mut().fire() {
//!     trainer.tick(handle);
//! }
//! assert_eq!(trainer.current_pattern().to_string(), "xxx...x.x..x.x..");
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod trainer;
pub mod types;
pub mod wasm;

// Re-export commonly used types
pub use config::TrainerConfig;
pub use error::{ClockError, TrainerError};
pub use generator::{generate_pattern, PatternGenerator};
pub use trainer::{Trainer, TrainerSnapshot};
pub use types::{Notification, Pattern, ScheduledSound, SoundKind};
