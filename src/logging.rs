//! Colored stderr logger for the native host
//!
//! Level comes from `BACKBEAT_LOG` (`error`, `warn`, `info`, `debug`,
//! `trace`, `off`); anything else falls back to `warn`.

use colored::*;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::str::FromStr;

pub const LOG_ENV: &str = "BACKBEAT_LOG";

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "ERROR".bright_red().bold(),
            Level::Warn => " WARN".yellow(),
            Level::Info => " INFO".green(),
            Level::Debug => "DEBUG".cyan(),
            Level::Trace => "TRACE".dimmed(),
        };
        eprintln!("{} {} {}", level, record.target().dimmed(), record.args());
    }

    fn flush(&self) {}
}

pub fn level_from(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|v| LevelFilter::from_str(v.trim()).ok())
        .unwrap_or(LevelFilter::Warn)
}

/// Install the logger; a second call is a no-op
pub fn init() {
    let level = level_from(std::env::var(LOG_ENV).ok().as_deref());
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_env_value() {
        assert_eq!(level_from(None), LevelFilter::Warn);
        assert_eq!(level_from(Some("debug")), LevelFilter::Debug);
        assert_eq!(level_from(Some(" TRACE ")), LevelFilter::Trace);
        assert_eq!(level_from(Some("off")), LevelFilter::Off);
        assert_eq!(level_from(Some("loud")), LevelFilter::Warn);
    }
}
