//! Startup configuration: JSON file plus command-line overrides

use crate::args::CliArgs;
use anyhow::{Context, Result};
use backbeat_core::TrainerConfig;
use std::fs;
use std::path::Path;

/// Read a `TrainerConfig` from JSON; missing fields take their defaults
pub fn load_config_file(path: &Path) -> Result<TrainerConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: TrainerConfig = serde_json::from_str(&text)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(config)
}

/// Combine the optional config file with flag overrides and validate
pub fn resolve(args: &CliArgs) -> Result<TrainerConfig> {
    let mut config = match &args.config_path {
        Some(path) => load_config_file(path)?,
        None => TrainerConfig::default(),
    };

    if let Some(bpm) = args.bpm {
        config = config.with_tempo(bpm);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    config.validate()?;
    log::debug!("Resolved config: {:?}", config);
    Ok(config)
}
