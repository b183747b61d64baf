//! Interactive trainer console

use crate::audio::playback_engine::{PlaybackEngine, SessionEvent};
use crate::commands::{CommandContext, CommandResult, create_registry};
use crate::display::colored_grid;
use anyhow::Result;
use backbeat_core::Notification;
use colored::*;
use crossbeam_channel::Receiver;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Interactive REPL driving one playback session
pub struct Repl {
    editor: DefaultEditor,
    engine: Arc<PlaybackEngine>,
}

impl Repl {
    pub fn new(engine: PlaybackEngine) -> Result<Self> {
        let editor = DefaultEditor::new()?;
        Ok(Repl {
            editor,
            engine: Arc::new(engine),
        })
    }

    /// Start the REPL loop
    pub fn run(&mut self) -> Result<()> {
        println!(
            "{} {}",
            "🥁".bright_yellow(),
            "Backbeat rhythm trainer".bright_cyan().bold()
        );
        println!(
            "Type '{}' to count in, '{}' for more information, '{}' or {} to exit.\n",
            "start".bright_green(),
            "help".bright_green(),
            "quit".bright_red(),
            "Ctrl+C".bright_red()
        );

        let registry = create_registry();
        let mut ctx = CommandContext::new(self.engine.clone());
        spawn_follower(self.engine.events(), ctx.follow.clone());

        loop {
            let prompt = format!("{} ", "backbeat>".bright_magenta().bold());
            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    self.editor.add_history_entry(line.to_owned())?;

                    match registry.execute(line, &mut ctx) {
                        CommandResult::Success => {}
                        CommandResult::Message(msg) => {
                            println!("{}", msg);
                        }
                        CommandResult::Exit => {
                            println!("{} 🥁", "Goodbye!".bright_cyan());
                            break;
                        }
                        CommandResult::Error(e) => {
                            println!("{} {}", "Error:".bright_red().bold(), e.red());
                        }
                        CommandResult::NotACommand => {
                            println!(
                                "{} '{}'. Type '{}' for commands.",
                                "Unknown command".bright_red().bold(),
                                line,
                                "help".bright_green()
                            );
                        }
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    println!("{} 🥁", "Goodbye!".bright_cyan());
                    break;
                }
                Err(err) => {
                    println!(
                        "{} {}",
                        "Error reading input:".bright_red().bold(),
                        err.to_string().red()
                    );
                }
            }
        }

        self.engine.stop()?;
        Ok(())
    }
}

/// Print boundary events while `follow` is on; exits with the session
fn spawn_follower(events: Receiver<SessionEvent>, follow: Arc<AtomicBool>) {
    thread::spawn(move || {
        for event in events.iter() {
            if follow.load(Ordering::Relaxed) {
                println!("{}", describe_event(&event));
            }
        }
    });
}

pub fn describe_event(event: &SessionEvent) -> String {
    match event.notification {
        Notification::PatternComplete { pattern_index } => format!(
            "{} #{} {}",
            "↻ pattern".bright_cyan(),
            pattern_index,
            colored_grid(&event.current)
        ),
        Notification::BarComplete {
            bar_index,
            bar_number,
        } => format!(
            "{} {} ({} of 2)",
            "| bar".dimmed(),
            bar_number + 1,
            bar_index + 1
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backbeat_core::Pattern;

    #[test]
    fn test_describe_event() {
        let pattern = Pattern::alternating();
        let bar = SessionEvent {
            notification: Notification::BarComplete {
                bar_index: 1,
                bar_number: 5,
            },
            current: pattern,
            next: pattern,
        };
        let text = describe_event(&bar);
        assert!(text.contains("6"));
        assert!(text.contains("(2 of 2)"));

        let change = SessionEvent {
            notification: Notification::PatternComplete { pattern_index: 7 },
            current: pattern,
            next: pattern,
        };
        assert!(describe_event(&change).contains("#7"));
    }
}
