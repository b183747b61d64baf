//! Transport commands (start, stop, tempo, mute, reseed)

use crate::commands::{CommandContext, CommandResult};
use colored::*;

/// Handle `start` command
pub fn cmd_start(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    match ctx.engine.start() {
        Ok(()) => CommandResult::Message(
            "▶ Counting in one bar...".bright_green().to_string(),
        ),
        Err(e) => CommandResult::Error(format!("Failed to start: {}", e)),
    }
}

/// Handle `stop` command
pub fn cmd_stop(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    match ctx.engine.stop() {
        Ok(()) => CommandResult::Message("⏹ Stopped".to_string()),
        Err(e) => CommandResult::Error(format!("Failed to stop: {}", e)),
    }
}

/// Handle `tempo [bpm]` command
pub fn cmd_tempo(args: &str, ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return match ctx.engine.snapshot() {
            Ok(snapshot) => {
                CommandResult::Message(format!("Current tempo: {:.1} BPM", snapshot.tempo_bpm))
            }
            Err(e) => CommandResult::Error(e.to_string()),
        };
    }

    let Ok(bpm) = args.parse::<f64>() else {
        return CommandResult::Error(format!("Invalid tempo '{}'. Usage: tempo <bpm>", args));
    };

    match ctx.engine.set_tempo(bpm) {
        Ok(()) => CommandResult::Message(
            format!("🎵 Tempo set to {:.1} BPM", bpm)
                .bright_green()
                .to_string(),
        ),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

/// Handle `mute`: behave as if the app went to the background
pub fn cmd_mute(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    match ctx.engine.set_backgrounded(true) {
        Ok(()) => CommandResult::Message("🔇 Muted (timing continues)".to_string()),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

/// Handle `unmute`: back to the foreground, resynced to the clock
pub fn cmd_unmute(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    match ctx.engine.set_backgrounded(false) {
        Ok(()) => CommandResult::Message("🔊 Unmuted".to_string()),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

/// Handle `reseed [seed]` command
pub fn cmd_reseed(args: &str, ctx: &mut CommandContext) -> CommandResult {
    let seed = if args.is_empty() {
        None
    } else {
        match args.parse::<f64>() {
            Ok(seed) => Some(seed),
            Err(_) => {
                return CommandResult::Error(format!("Invalid seed '{}'. Usage: reseed [seed]", args));
            }
        }
    };

    if let Err(e) = ctx.engine.reseed(seed) {
        return CommandResult::Error(e.to_string());
    }

    match ctx.engine.snapshot() {
        Ok(snapshot) => CommandResult::Message(format!("🎲 Seed is now {}", snapshot.seed)),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}
