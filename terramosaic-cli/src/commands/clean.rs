//! Scratch directory cleanup command.

use terramosaic::config::{AssemblerConfig, ConfigFile};
use terramosaic::workdir::WorkDir;

use crate::error::CliError;

/// Wipe the scratch directory holding intermediate artifacts.
pub fn run() -> Result<(), CliError> {
    let config_file = ConfigFile::load().unwrap_or_default();
    let config = AssemblerConfig::from_config_file(&config_file);

    println!("Cleaning working directory: {}", config.working_dir.display());

    // create() wipes an existing root.
    WorkDir::create(&config.working_dir).map_err(|e| CliError::Workdir(e.to_string()))?;

    println!("Done.");
    Ok(())
}
