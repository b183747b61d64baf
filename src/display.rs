//! Terminal rendering of patterns and status

use backbeat_core::{Pattern, TrainerSnapshot};
use colored::*;

/// Step grid grouped by beat, e.g. `x..x x... ..x. x...`
pub fn pattern_grid(pattern: &Pattern) -> String {
    grid(pattern, false)
}

/// Same grid with hits highlighted and downbeats marked
pub fn colored_grid(pattern: &Pattern) -> String {
    grid(pattern, true)
}

fn grid(pattern: &Pattern, colorize: bool) -> String {
    let mut out = String::new();
    for (step, hit) in pattern.steps().iter().enumerate() {
        if step > 0 && step % 4 == 0 {
            out.push(' ');
        }
        let cell = if *hit { "x" } else { "." };
        if !colorize {
            out.push_str(cell);
        } else if *hit && step % 4 == 0 {
            out.push_str(&cell.bright_yellow().bold().to_string());
        } else if *hit {
            out.push_str(&cell.bright_green().to_string());
        } else {
            out.push_str(&cell.dimmed().to_string());
        }
    }
    out
}

pub fn status_lines(snapshot: &TrainerSnapshot) -> Vec<String> {
    let state = match (snapshot.running, snapshot.in_count_in) {
        (false, _) => "stopped".red().to_string(),
        (true, true) => "counting in".yellow().to_string(),
        (true, false) => "playing".bright_green().to_string(),
    };
    let mute = if snapshot.muted { " (muted)" } else { "" };

    vec![
        format!("State:   {}{}", state, mute),
        format!("Tempo:   {:.1} BPM", snapshot.tempo_bpm),
        format!("Step:    {}", snapshot.beat_counter),
        format!("Seed:    {}", snapshot.seed),
        format!("Pattern: #{}", snapshot.pattern_index),
        format!("  now    {}", colored_grid(&snapshot.current_pattern)),
        format!("  next   {}", colored_grid(&snapshot.next_pattern)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_groups_beats() {
        let pattern: Pattern = "xxx...x.x..x.x..".parse().unwrap();
        assert_eq!(pattern_grid(&pattern), "xxx. ..x. x..x .x..");
        assert_eq!(pattern_grid(&Pattern::alternating()), ".x.x .x.x .x.x .x.x");
    }

    #[test]
    fn test_status_mentions_tempo_and_index() {
        let pattern = Pattern::alternating();
        let snapshot = TrainerSnapshot {
            running: false,
            muted: true,
            tempo_bpm: 96.0,
            beat_counter: 0,
            in_count_in: true,
            seed: 0.5,
            pattern_index: 3,
            current_pattern: pattern,
            next_pattern: pattern,
        };
        let lines = status_lines(&snapshot);
        assert!(lines[0].contains("(muted)"));
        assert!(lines[1].contains("96.0 BPM"));
        assert!(lines[4].contains("#3"));
    }
}
