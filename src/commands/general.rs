//! General REPL commands (pattern, status, follow, help, quit)

use crate::commands::{CommandContext, CommandResult};
use crate::display::{colored_grid, status_lines};
use colored::*;
use std::sync::atomic::Ordering;

/// Handle `help` command
pub fn cmd_help(_args: &str, _ctx: &mut CommandContext) -> CommandResult {
    print_help();
    CommandResult::Success
}

/// Handle `quit` or `exit` command
pub fn cmd_quit(_args: &str, _ctx: &mut CommandContext) -> CommandResult {
    CommandResult::Exit
}

/// Handle `pattern` command: current and upcoming grids
pub fn cmd_pattern(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    match ctx.engine.snapshot() {
        Ok(snapshot) => CommandResult::Message(format!(
            "#{:<4} {}\nnext  {}",
            snapshot.pattern_index,
            colored_grid(&snapshot.current_pattern),
            colored_grid(&snapshot.next_pattern).dimmed()
        )),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

/// Handle `status` command
pub fn cmd_status(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    match ctx.engine.snapshot() {
        Ok(snapshot) => CommandResult::Message(status_lines(&snapshot).join("\n")),
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

/// Handle `follow [on|off]` command; no argument toggles
pub fn cmd_follow(args: &str, ctx: &mut CommandContext) -> CommandResult {
    let enable = match args {
        "" => !ctx.is_following(),
        "on" => true,
        "off" => false,
        other => {
            return CommandResult::Error(format!("Unknown option '{}'. Usage: follow [on|off]", other));
        }
    };
    ctx.follow.store(enable, Ordering::Relaxed);
    CommandResult::Message(format!("Follow {}", if enable { "on" } else { "off" }))
}

/// Print help information
fn print_help() {
    println!("{}", "🥁 Backbeat Help".bold());
    println!("{}", "================".bold());
    println!();
    println!("{}", "Transport:".green());
    println!("  {}          - Count in one bar, then play the drill", "start".cyan());
    println!("  {}           - Stop playback", "stop".cyan());
    println!("  {}    - Show or change the tempo", "tempo [bpm]".cyan());
    println!("  {}           - Silence output, keep time (like a hidden tab)", "mute".cyan());
    println!("  {}         - Resume output at the current time", "unmute".cyan());
    println!();
    println!("{}", "Patterns:".green());
    println!("  {}        - Show the current and next pattern", "pattern".cyan());
    println!("  {}  - New random seed, or a fixed one", "reseed [seed]".cyan());
    println!("  {} - Print each bar and pattern change", "follow [on|off]".cyan());
    println!();
    println!("{}", "Other:".green());
    println!("  {}         - Show trainer state", "status".cyan());
    println!("  {}           - Show this help", "help".cyan());
    println!("  {}    - Leave", "quit / exit".cyan());
    println!();
    println!(
        "Patterns read left to right in sixteenths; {} is a hit, {} a rest.",
        "x".bright_green(),
        ".".dimmed()
    );
}
