//! Command-line argument parsing for the backbeat binary.
//!
//! Flags override values loaded from `--config`.

use std::env;
use std::path::PathBuf;

/// Parsed command-line arguments.
#[derive(Debug, Default, PartialEq)]
pub struct CliArgs {
    /// Initial tempo in BPM
    pub bpm: Option<f64>,
    /// Fixed pattern seed
    pub seed: Option<f64>,
    /// JSON file holding a `TrainerConfig`
    pub config_path: Option<PathBuf>,
    /// Run without an audio device (wall-clock timing, no sound)
    pub silent: bool,
    /// Whether help was requested
    pub show_help: bool,
}

impl CliArgs {
    /// Parse arguments from the process command line.
    pub fn parse() -> Self {
        Self::parse_from(env::args().skip(1))
    }

    /// Parse from an explicit argument list (without the program name).
    pub fn parse_from<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Self::default();
        let mut iter = args.into_iter();

        while let Some(arg) = iter.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => {
                    (flag.to_string(), Some(value.to_string()))
                }
                _ => (arg.clone(), None),
            };

            match flag.as_str() {
                "--help" | "-h" => parsed.show_help = true,
                "--silent" => parsed.silent = true,
                "--bpm" | "--seed" | "--config" => {
                    let Some(value) = inline.or_else(|| iter.next()) else {
                        eprintln!("{} requires a value", flag);
                        parsed.show_help = true;
                        continue;
                    };
                    parsed.apply_value(&flag, &value);
                }
                _ => {
                    eprintln!("Unknown argument: {}", arg);
                    parsed.show_help = true;
                }
            }
        }

        parsed
    }

    fn apply_value(&mut self, flag: &str, value: &str) {
        match flag {
            "--config" => self.config_path = Some(PathBuf::from(value)),
            _ => match value.parse::<f64>() {
                Ok(number) if flag == "--bpm" => self.bpm = Some(number),
                Ok(number) => self.seed = Some(number),
                Err(_) => {
                    eprintln!("{} expects a number, got '{}'", flag, value);
                    self.show_help = true;
                }
            },
        }
    }

    /// Print help text to stderr.
    pub fn print_help() {
        eprintln!(
            "Usage:\n  backbeat [--bpm <n>] [--seed <f>] [--config <file.json>] [--silent]\n\n\
             Flags:\n\
             \x20 --bpm <n>            Initial tempo in beats per minute (default 120)\n\
             \x20 --seed <f>           Fixed pattern seed, reduced into [0, 1)\n\
             \x20 --config <file>      Load settings from a JSON TrainerConfig\n\
             \x20 --silent             Run without an audio device\n\
             \x20 -h, --help           Show this help\n\n\
             Environment:\n\
             \x20 BACKBEAT_LOG         Log level: error, warn (default), info, debug, trace\n"
        );
    }
}
