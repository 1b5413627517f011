//! The `config` command: inspect and edit the settings file.
//!
//! Keys are addressed as `section.key` (`catalog.url`,
//! `mosaic.grid_resolution`, ...). Unset keys fall back to built-in
//! defaults at assembly time, so `list` distinguishes the two.

use clap::Subcommand;
use terramosaic::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one setting's current value
    Get {
        /// Setting key, e.g. catalog.collection
        key: String,
    },

    /// Write a setting and save the file
    Set {
        /// Setting key, e.g. catalog.collection
        key: String,

        /// New value
        value: String,
    },

    /// Dump every known setting and the file location
    List,
}

pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => {
            let key = parse_key(&key)?;
            let settings = ConfigFile::load().unwrap_or_default();
            match key.get(&settings) {
                value if value.is_empty() => {
                    println!("{} is unset; the built-in default applies", key.name())
                }
                value => println!("{}", value),
            }
            Ok(())
        }
        ConfigCommands::Set { key, value } => {
            let key = parse_key(&key)?;
            let mut settings = ConfigFile::load().unwrap_or_default();
            key.set(&mut settings, &value)
                .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
            settings.save()?;
            println!("{} = {}", key.name(), value);
            Ok(())
        }
        ConfigCommands::List => list(),
    }
}

fn parse_key(raw: &str) -> Result<ConfigKey, CliError> {
    raw.parse().map_err(|_| {
        CliError::InvalidArgument(format!(
            "no such setting '{}'; run 'terramosaic config list' for the key names",
            raw
        ))
    })
}

/// Dump the settings in the file's own INI shape, annotated with the
/// file path so users know what `set` will touch.
fn list() -> Result<(), CliError> {
    let settings = ConfigFile::load().unwrap_or_default();
    println!("; {}", config_file_path().display());

    let mut section = "";
    for key in ConfigKey::all() {
        if key.section() != section {
            section = key.section();
            println!();
            println!("[{}]", section);
        }
        match key.get(&settings) {
            value if value.is_empty() => println!("; {} =", key.key_name()),
            value => println!("{} = {}", key.key_name(), value),
        }
    }
    Ok(())
}
