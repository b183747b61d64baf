pub mod audio;
pub mod clock;
pub mod drum_synth;
pub mod playback_engine;
