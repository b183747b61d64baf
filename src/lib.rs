//! # Backbeat
//!
//! Native host for the backbeat rhythm trainer. The timing engine and the
//! pattern generator live in `backbeat-core`; this crate supplies the parts
//! a terminal user needs around them.
//!
//! ## Modules
//!
//! - `audio`: cpal output clock, synthesized sounds, the frame ticker and
//!   the session thread that drives a `Trainer`.
//! - `commands`: REPL command registry and handlers.
//! - `repl`: the interactive console.
//! - `args`, `settings`: command-line flags and JSON config loading.
//! - `display`: pattern grids and status rendering.
//! - `logging`: colored stderr logger behind the `log` facade.

pub mod args;
pub mod audio;
pub mod commands;
pub mod display;
pub mod logging;
pub mod repl;
pub mod settings;
