//! Command registry for REPL commands
//!
//! Provides a clean, extensible pattern for handling REPL commands.

pub mod general;
pub mod transport;

use crate::audio::playback_engine::PlaybackEngine;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Result of executing a command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Command executed successfully, continue REPL
    Success,
    /// Command executed, show this message
    Message(String),
    /// Exit the REPL
    Exit,
    /// Unknown command
    NotACommand,
    /// Error occurred
    Error(String),
}

/// Context passed to command handlers
pub struct CommandContext {
    pub engine: Arc<PlaybackEngine>,
    /// Print boundary events as they happen
    pub follow: Arc<AtomicBool>,
}

impl CommandContext {
    pub fn new(engine: Arc<PlaybackEngine>) -> Self {
        Self {
            engine,
            follow: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_following(&self) -> bool {
        self.follow.load(Ordering::Relaxed)
    }
}

/// A command handler function
pub type CommandHandler = fn(&str, &mut CommandContext) -> CommandResult;

/// Registry of available commands
pub struct CommandRegistry {
    /// Sorted by prefix length descending for longest-match-first lookup
    commands: Vec<(String, CommandHandler)>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Register a command with its prefix
    pub fn register(&mut self, prefix: &str, handler: CommandHandler) {
        self.commands.push((prefix.to_string(), handler));
        self.commands.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    /// Execute a command, returning NotACommand if no match found
    pub fn execute(&self, input: &str, ctx: &mut CommandContext) -> CommandResult {
        for (prefix, handler) in &self.commands {
            if input == prefix || input.starts_with(&format!("{} ", prefix)) {
                let args = input[prefix.len()..].trim();
                return handler(args, ctx);
            }
        }
        CommandResult::NotACommand
    }

    /// Get all registered command prefixes
    pub fn list_commands(&self) -> Vec<&str> {
        self.commands.iter().map(|(p, _)| p.as_str()).collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a fully populated command registry with all built-in commands
pub fn create_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();

    // Transport
    registry.register("start", transport::cmd_start);
    registry.register("stop", transport::cmd_stop);
    registry.register("tempo", transport::cmd_tempo);
    registry.register("mute", transport::cmd_mute);
    registry.register("unmute", transport::cmd_unmute);
    registry.register("reseed", transport::cmd_reseed);

    // General
    registry.register("pattern", general::cmd_pattern);
    registry.register("status", general::cmd_status);
    registry.register("follow", general::cmd_follow);
    registry.register("help", general::cmd_help);
    registry.register("quit", general::cmd_quit);
    registry.register("exit", general::cmd_quit);

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::playback_engine::Backend;
    use backbeat_core::TrainerConfig;

    pub(crate) fn silent_context() -> CommandContext {
        let config = TrainerConfig::default().with_seed(0.42);
        let engine = PlaybackEngine::spawn(config, Backend::Silent).unwrap();
        CommandContext::new(Arc::new(engine))
    }

    #[test]
    fn test_unknown_input() {
        let registry = create_registry();
        let mut ctx = silent_context();
        assert_eq!(registry.execute("play", &mut ctx), CommandResult::NotACommand);
        // Prefix must end at a word boundary
        assert_eq!(registry.execute("stopped", &mut ctx), CommandResult::NotACommand);
    }

    #[test]
    fn test_every_command_is_registered() {
        let registry = create_registry();
        let commands = registry.list_commands();
        for name in [
            "start", "stop", "tempo", "mute", "unmute", "reseed", "pattern", "status", "follow",
            "help", "quit", "exit",
        ] {
            assert!(commands.contains(&name), "missing {}", name);
        }
    }

    #[test]
    fn test_quit_and_exit() {
        let registry = create_registry();
        let mut ctx = silent_context();
        assert_eq!(registry.execute("quit", &mut ctx), CommandResult::Exit);
        assert_eq!(registry.execute("exit", &mut ctx), CommandResult::Exit);
    }
}
